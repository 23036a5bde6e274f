use super::extractor::ArchiveExtractor;
use super::merge::{MergeStats, merge_tree};
use super::protected::{ExerciseLayout, ProtectedPaths};
use crate::domain::{Course, CourseId, Exercise};
use crate::env;
use crate::error::{CoreError, CoreResult};
use crate::service::ExerciseService;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Human-readable summary of a course download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub course_id: CourseId,
    pub course_name: String,
    pub target: PathBuf,
    pub downloaded: Vec<Exercise>,
    pub skipped_locked: Vec<String>,
    pub stats: MergeStats,
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Downloaded {} exercise(s) of course '{}' to {} ({} added, {} updated, {} unchanged, {} protected files kept)",
            self.downloaded.len(),
            self.course_name,
            self.target.display(),
            self.stats.added,
            self.stats.updated,
            self.stats.unchanged,
            self.stats.preserved
        )?;
        if !self.skipped_locked.is_empty() {
            write!(f, "; skipped locked: {}", self.skipped_locked.join(", "))?;
        }
        Ok(())
    }
}

/// Fetches exercise archives and merges them into a local course directory
#[derive(Clone)]
pub struct SelectiveMergeDownload {
    service: Arc<dyn ExerciseService>,
    extractor: Arc<dyn ArchiveExtractor>,
    layout: ExerciseLayout,
}

impl SelectiveMergeDownload {
    pub fn new(
        service: Arc<dyn ExerciseService>,
        extractor: Arc<dyn ArchiveExtractor>,
        layout: ExerciseLayout,
    ) -> Self {
        Self {
            service,
            extractor,
            layout,
        }
    }

    /// Download every unlocked exercise of a course into `target/<exercise>`
    pub async fn download_course(&self, target: &Path, course_id: CourseId) -> CoreResult<DownloadReport> {
        let course = self
            .service
            .get_course(course_id)
            .await
            .map_err(CoreError::Transport)?;

        self.download_exercises(target, &course).await
    }

    /// Download the unlocked exercises of an already fetched course
    pub async fn download_exercises(&self, target: &Path, course: &Course) -> CoreResult<DownloadReport> {
        let course_id = course.require_id()?;
        let mut report = DownloadReport {
            course_id,
            course_name: course.name.clone(),
            target: target.to_path_buf(),
            downloaded: Vec::new(),
            skipped_locked: Vec::new(),
            stats: MergeStats::default(),
        };

        for exercise in &course.exercises {
            if exercise.locked {
                debug!("Skipping locked exercise {}", exercise.name);
                report.skipped_locked.push(exercise.name.clone());
                continue;
            }
            let stats = self.download_exercise(target, exercise).await?;
            report.stats.absorb(stats);
            report.downloaded.push(exercise.clone());
        }

        info!("{}", report);
        Ok(report)
    }

    /// Fetch one exercise archive and merge it into `target/<exercise>`
    pub async fn download_exercise(&self, target: &Path, exercise: &Exercise) -> CoreResult<MergeStats> {
        validate_exercise_name(&exercise.name)?;

        let archive = self
            .service
            .download_exercise(exercise)
            .await
            .map_err(CoreError::Transport)?;
        debug!(
            "Fetched {} bytes for exercise {}",
            archive.len(),
            exercise.name
        );

        let extractor = Arc::clone(&self.extractor);
        let layout = self.layout.clone();
        let target = target.to_path_buf();
        let name = exercise.name.clone();

        tokio::task::spawn_blocking(move || {
            merge_archive(extractor.as_ref(), &archive, &target, &name, &layout)
        })
        .await
        .map_err(|e| CoreError::filesystem(format!("merge of {} aborted: {}", exercise.name, e)))?
    }
}

/// Extract `archive` next to `target/<name>` and merge it in
fn merge_archive(
    extractor: &dyn ArchiveExtractor,
    archive: &[u8],
    target: &Path,
    name: &str,
    layout: &ExerciseLayout,
) -> CoreResult<MergeStats> {
    let fail = |what: &str, detail: String| {
        CoreError::filesystem(format!("exercise '{}': {}: {}", name, what, detail))
    };

    fs::create_dir_all(target).map_err(|e| fail("cannot create target directory", e.to_string()))?;

    let staging = StagingDir::create(target).map_err(|e| fail("cannot create staging directory", e.to_string()))?;
    extractor
        .extract(archive, staging.path())
        .map_err(|e| fail("extraction failed", format!("{:#}", e)))?;

    let exercise_dir = env::exercise_dir_path(target, name);
    let protected = ProtectedPaths::for_exercise(layout, &[&exercise_dir, staging.path()]);
    let stats = merge_tree(staging.path(), &exercise_dir, &protected)
        .map_err(|e| fail("merge failed", e.to_string()))?;

    if !exercise_dir.is_dir() {
        return Err(fail(
            "exercise directory missing after extraction",
            exercise_dir.display().to_string(),
        ));
    }

    debug!("Merged exercise {}: {:?}", name, stats);
    Ok(stats)
}

fn validate_exercise_name(name: &str) -> CoreResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(CoreError::Data(format!(
            "exercise name '{}' is not a plain directory name",
            name
        ))),
    }
}

/// Temporary extraction directory removed on drop
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(parent: &Path) -> std::io::Result<Self> {
        let path = parent.join(format!("{}{}", env::exercise::STAGING_PREFIX, Uuid::new_v4()));
        fs::create_dir(&path)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!("Failed to remove staging directory {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingExtractor;

    impl ArchiveExtractor for FailingExtractor {
        fn extract(&self, _archive: &[u8], destination: &Path) -> anyhow::Result<()> {
            fs::write(destination.join("half.txt"), "partial")?;
            anyhow::bail!("truncated archive")
        }
    }

    #[test]
    fn test_exercise_names_must_be_plain() {
        assert!(validate_exercise_name("viikko1-Tehtava1").is_ok());
        assert!(validate_exercise_name("../escape").is_err());
        assert!(validate_exercise_name("a/b").is_err());
        assert!(validate_exercise_name("").is_err());
    }

    #[test]
    fn test_failed_extraction_names_exercise_and_cleans_staging() {
        let target = tempfile::tempdir().unwrap();

        let err = merge_archive(
            &FailingExtractor,
            b"",
            target.path(),
            "viikko2-Tehtava3",
            &ExerciseLayout::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::Filesystem { .. }));
        assert!(err.to_string().contains("viikko2-Tehtava3"));
        assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_report_display() {
        let report = DownloadReport {
            course_id: 3,
            course_name: "ohpe".to_string(),
            target: PathBuf::from("/work/ohpe"),
            downloaded: vec![Exercise::new("A", "h1")],
            skipped_locked: vec!["B".to_string()],
            stats: MergeStats {
                added: 4,
                ..Default::default()
            },
        };

        let text = report.to_string();
        assert!(text.starts_with("Downloaded 1 exercise(s) of course 'ohpe' to /work/ohpe"));
        assert!(text.contains("4 added"));
        assert!(text.ends_with("skipped locked: B"));
    }
}
