use crate::domain::CourseId;
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, Weak};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Exercise name → last-seen checksum
pub type Checksums = BTreeMap<String, String>;

/// Course id → checksums of that course, as stored on disk
pub type CacheContents = BTreeMap<String, Checksums>;

/// Writer locks keyed by canonical cache path, shared by every handle to a file
static WRITE_LOCKS: LazyLock<std::sync::Mutex<HashMap<PathBuf, Weak<Mutex<()>>>>> =
    LazyLock::new(Default::default);

/// Persisted per-course, per-exercise checksum mapping.
///
/// One JSON file; an empty file is an empty cache. The handle is cheap to
/// clone and holds no open file. Every read-modify-write of the same file is
/// serialized, whichever handle performs it.
#[derive(Debug, Clone)]
pub struct UpdateCache {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl PartialEq for UpdateCache {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for UpdateCache {}

impl UpdateCache {
    /// Open an existing cache file
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        ensure_exists(&path)?;
        let canonical = fs::canonicalize(&path)
            .map_err(|e| CoreError::io("failed to resolve update cache", &path, e))?;
        Ok(Self {
            path,
            write_lock: write_lock_for(canonical),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole cache
    pub async fn load(&self) -> CoreResult<CacheContents> {
        let content = async_fs::read(&self.path)
            .await
            .map_err(|e| CoreError::io("failed to read update cache", &self.path, e))?;

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(CacheContents::new());
        }

        serde_json::from_slice(&content).map_err(|e| {
            CoreError::filesystem(format!(
                "update cache {} is malformed: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Cached checksums of one course, empty if the course was never seen
    pub async fn checksums_for(&self, course_id: CourseId) -> CoreResult<Checksums> {
        let mut contents = self.load().await?;
        Ok(contents.remove(&course_key(course_id)).unwrap_or_default())
    }

    /// Apply `update` to the stored mapping of one course and persist it.
    ///
    /// Load, update and save happen under the file's writer lock, so
    /// concurrent updates of any course never lose each other's writes.
    pub async fn update_course<F, R>(&self, course_id: CourseId, update: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Checksums) -> R,
    {
        let _guard = self.write_lock.lock().await;

        let mut contents = self.load().await?;
        let output = update(contents.entry(course_key(course_id)).or_default());
        self.save(&contents).await?;
        Ok(output)
    }

    /// Replace the stored mapping of one course
    pub async fn store_course(&self, course_id: CourseId, checksums: Checksums) -> CoreResult<()> {
        self.update_course(course_id, |stored| *stored = checksums).await
    }

    /// Merge `checksums` into the stored mapping of one course
    pub async fn record(&self, course_id: CourseId, checksums: Checksums) -> CoreResult<()> {
        self.update_course(course_id, |stored| stored.extend(checksums)).await
    }

    async fn save(&self, contents: &CacheContents) -> CoreResult<()> {
        let serialized = serde_json::to_vec_pretty(contents)
            .map_err(|e| CoreError::filesystem(format!("failed to serialize update cache: {}", e)))?;

        // Write next to the target and rename so readers never see half a file
        let temp_path = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = write_synced(&temp_path, &serialized).await {
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(e);
        }

        async_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CoreError::io("failed to replace update cache", &self.path, e))?;

        debug!(
            "Update cache saved: {} bytes to {}",
            serialized.len(),
            self.path.display()
        );
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let mut file = async_fs::File::create(path)
        .await
        .map_err(|e| CoreError::io("failed to create", path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| CoreError::io("failed to write", path, e))?;
    file.sync_all()
        .await
        .map_err(|e| CoreError::io("failed to sync", path, e))
}

fn write_lock_for(canonical: PathBuf) -> Arc<Mutex<()>> {
    let mut locks = WRITE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(lock) = locks.get(&canonical).and_then(Weak::upgrade) {
        return lock;
    }
    locks.retain(|_, lock| lock.strong_count() > 0);

    let lock = Arc::new(Mutex::new(()));
    locks.insert(canonical, Arc::downgrade(&lock));
    lock
}

fn course_key(course_id: CourseId) -> String {
    course_id.to_string()
}

/// Fail with [`CoreError::Filesystem`] unless `path` is an existing file
pub fn ensure_exists(path: &Path) -> CoreResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CoreError::filesystem(format!(
            "cache file {} does not exist",
            path.display()
        )))
    }
}

/// Move the cache from `current` to `new`.
///
/// `new` must already exist. When `current` exists its content is copied
/// over `new` and `current` is deleted afterwards. Not atomic: an interruption
/// between the copy and the delete leaves two valid files behind.
pub fn hand_off(current: Option<&Path>, new: &Path) -> CoreResult<()> {
    ensure_exists(new)?;

    match current {
        Some(old) if same_file(old, new) => {
            debug!("Update cache {} is already active", new.display());
            Ok(())
        }
        Some(old) if old.is_file() => {
            fs::copy(old, new).map_err(|e| CoreError::io("failed to copy cache to", new, e))?;
            fs::remove_file(old)
                .map_err(|e| CoreError::io("failed to delete old cache", old, e))?;
            info!(
                "Update cache moved from {} to {}",
                old.display(),
                new.display()
            );
            Ok(())
        }
        _ => {
            info!("Adopting update cache {}", new.display());
            Ok(())
        }
    }
}

/// Whether both paths name the same existing file, however they are spelled
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "").unwrap();

        let cache = UpdateCache::open(&path).unwrap();
        assert!(cache.load().await.unwrap().is_empty());
        assert!(cache.checksums_for(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_course_keeps_other_courses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"1": {"A": "h1"}, "2": {"X": "old"}}"#).unwrap();

        let cache = UpdateCache::open(&path).unwrap();
        cache
            .store_course(2, Checksums::from([("Y".to_string(), "new".to_string())]))
            .await
            .unwrap();

        let contents = cache.load().await.unwrap();
        assert_eq!(contents["1"]["A"], "h1");
        assert_eq!(contents["2"].len(), 1);
        assert_eq!(contents["2"]["Y"], "new");

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_record_merges_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"5": {"A": "h1", "B": "h2"}}"#).unwrap();

        let cache = UpdateCache::open(&path).unwrap();
        cache
            .record(5, Checksums::from([("B".to_string(), "h3".to_string())]))
            .await
            .unwrap();

        let checksums = cache.checksums_for(5).await.unwrap();
        assert_eq!(checksums["A"], "h1");
        assert_eq!(checksums["B"], "h3");
    }

    #[tokio::test]
    async fn test_malformed_cache_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let cache = UpdateCache::open(&path).unwrap();
        assert!(matches!(
            cache.load().await,
            Err(CoreError::Filesystem { .. })
        ));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = UpdateCache::open(dir.path().join("missing.json"));
        assert!(matches!(result, Err(CoreError::Filesystem { .. })));
    }

    #[test]
    fn test_hand_off_copies_then_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        fs::write(&old, r#"{"1": {"A": "h1"}}"#).unwrap();
        fs::write(&new, "").unwrap();

        hand_off(Some(&old), &new).unwrap();

        assert!(!old.exists());
        assert_eq!(fs::read_to_string(&new).unwrap(), r#"{"1": {"A": "h1"}}"#);
    }

    #[test]
    fn test_hand_off_to_other_spelling_of_same_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let old = dir.path().join("cache.json");
        let alias = dir.path().join("sub").join("..").join("cache.json");
        fs::write(&old, r#"{"1": {"A": "h1"}}"#).unwrap();

        hand_off(Some(&old), &alias).unwrap();

        assert_eq!(fs::read_to_string(&old).unwrap(), r#"{"1": {"A": "h1"}}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_updates_through_separate_handles_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "").unwrap();

        let tasks: Vec<_> = (0..32u64)
            .map(|course_id| {
                // A fresh handle per task still shares the writer lock
                let cache = UpdateCache::open(&path).unwrap();
                tokio::spawn(async move {
                    cache
                        .record(course_id, Checksums::from([("A".to_string(), format!("h{}", course_id))]))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let contents = UpdateCache::open(&path).unwrap().load().await.unwrap();
        assert_eq!(contents.len(), 32);
        assert_eq!(contents["17"]["A"], "h17");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_hand_off_to_missing_target_leaves_source() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.json");
        fs::write(&old, r#"{"1": {"A": "h1"}}"#).unwrap();

        let result = hand_off(Some(&old), &dir.path().join("missing.json"));

        assert!(matches!(result, Err(CoreError::Filesystem { .. })));
        assert_eq!(fs::read_to_string(&old).unwrap(), r#"{"1": {"A": "h1"}}"#);
    }
}
