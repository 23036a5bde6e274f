//! Exercise update detection backed by a persisted checksum cache.

pub mod cache;
pub mod detector;

pub use cache::{CacheContents, Checksums, UpdateCache};
pub use detector::{ExerciseUpdateDetector, changed_exercises};
