//! Selective merge download of exercise content.
//!
//! ```text
//! service archive ──► staging dir ──► merge_tree ──► <target>/<exercise>/
//!                     (extractor)     (protected paths kept)
//! ```

pub mod downloader;
pub mod extractor;
pub mod merge;
pub mod protected;

pub use downloader::{DownloadReport, SelectiveMergeDownload};
pub use extractor::{ArchiveExtractor, TarGzExtractor};
pub use merge::{MergeStats, merge_tree};
pub use protected::{ExerciseLayout, ProtectedPaths, parse_declaration};
