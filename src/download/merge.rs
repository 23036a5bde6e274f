//! Merging an extracted exercise tree into an existing local directory.
//!
//! Incoming files overwrite local ones except inside the protected region,
//! where an existing local file always wins. Local-only files are never
//! removed. Running the same merge twice leaves the same tree.

use super::protected::ProtectedPaths;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What a merge did to the target tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Files that did not exist locally
    pub added: usize,
    /// Local files replaced with different incoming content
    pub updated: usize,
    /// Local files whose content already matched
    pub unchanged: usize,
    /// Protected local files kept despite an incoming version
    pub preserved: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.preserved += other.preserved;
    }
}

/// Merge every file under `incoming` into `target`
pub fn merge_tree(incoming: &Path, target: &Path, protected: &ProtectedPaths) -> io::Result<MergeStats> {
    let mut stats = MergeStats::default();
    fs::create_dir_all(target)?;

    let walker = WalkDir::new(incoming)
        .min_depth(1)
        .sort_by_file_name()
        .follow_links(false);

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(incoming)
            .map_err(io::Error::other)?;
        let destination = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if destination.is_file() {
                if protected.is_protected(relative) {
                    debug!("Keeping protected file {} over incoming directory", relative.display());
                    continue;
                }
                fs::remove_file(&destination)?;
            }
            fs::create_dir_all(&destination)?;
            continue;
        }

        if !file_type.is_file() {
            warn!("Skipping non-regular archive entry {}", relative.display());
            continue;
        }

        if destination.is_dir() {
            warn!(
                "Local directory {} shadows an incoming file; leaving it in place",
                relative.display()
            );
            continue;
        }

        if destination.exists() {
            if protected.is_protected(relative) {
                debug!("Preserving protected file {}", relative.display());
                stats.preserved += 1;
                continue;
            }
            if fs::read(&destination)? == fs::read(entry.path())? {
                stats.unchanged += 1;
                continue;
            }
            fs::copy(entry.path(), &destination)?;
            stats.updated += 1;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination)?;
            stats.added += 1;
        }
    }

    Ok(stats)
}
