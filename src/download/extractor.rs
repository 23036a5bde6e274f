//! Archive extraction seam.
//!
//! Extraction is synchronous and CPU/IO bound; callers run it on
//! `spawn_blocking`.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Unpacks downloaded exercise archives
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into the existing directory `destination`
    fn extract(&self, archive: &[u8], destination: &Path) -> Result<()>;
}

/// Extracts gzip-compressed tar archives
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract(&self, archive: &[u8], destination: &Path) -> Result<()> {
        let decoder = GzDecoder::new(Cursor::new(archive));
        let mut archive = tar::Archive::new(decoder);
        let mut unpacked = 0usize;

        for entry in archive.entries().context("Failed to read archive entries")? {
            let mut entry = entry.context("Failed to read archive entry")?;
            let entry_path = entry.path()?.into_owned();

            // unpack_in refuses entries that would escape the destination
            if entry
                .unpack_in(destination)
                .with_context(|| format!("Failed to unpack {}", entry_path.display()))?
            {
                unpacked += 1;
            } else {
                warn!("Skipped archive entry outside destination: {}", entry_path.display());
            }
        }

        debug!("Unpacked {} entries into {}", unpacked, destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;

    fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = tar_gz(&[
            ("pom.xml", "<project/>"),
            ("src/main/java/Hello.java", "class Hello {}"),
        ]);

        TarGzExtractor.extract(&archive, dir.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("src/main/java/Hello.java")).unwrap(),
            "class Hello {}"
        );
        assert!(dir.path().join("pom.xml").is_file());
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TarGzExtractor.extract(b"definitely not gzip", dir.path()).is_err());
    }
}
