use super::Command;
use crate::domain::CourseId;
use crate::download::{DownloadReport, SelectiveMergeDownload};
use crate::error::{CoreError, CoreResult, require_non_empty, require_path};
use crate::updates::{Checksums, UpdateCache};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Download a course into a local directory, merging over existing content
pub struct DownloadExercises {
    target: PathBuf,
    course_id: String,
    downloader: SelectiveMergeDownload,
    cache: Option<UpdateCache>,
}

impl DownloadExercises {
    pub fn new(
        target: impl Into<PathBuf>,
        course_id: impl Into<String>,
        downloader: SelectiveMergeDownload,
        cache: Option<UpdateCache>,
    ) -> Self {
        Self {
            target: target.into(),
            course_id: course_id.into(),
            downloader,
            cache,
        }
    }

    fn parsed_course_id(&self) -> CoreResult<CourseId> {
        self.course_id.trim().parse().map_err(|_| {
            CoreError::Validation(format!("course id '{}' is not a number", self.course_id))
        })
    }
}

#[async_trait]
impl Command for DownloadExercises {
    type Output = DownloadReport;

    fn name(&self) -> &'static str {
        "download_exercises"
    }

    fn validate(&self) -> CoreResult<()> {
        require_path("path", &self.target)?;
        require_non_empty(&[("course_id", self.course_id.as_str())])?;
        self.parsed_course_id().map(|_| ())
    }

    async fn execute(self) -> CoreResult<DownloadReport> {
        let course_id = self.parsed_course_id()?;
        let report = self.downloader.download_course(&self.target, course_id).await?;

        // Freshly downloaded exercises must not show up as updates later
        if let Some(cache) = &self.cache {
            let downloaded: Checksums = report
                .downloaded
                .iter()
                .map(|e| (e.name.clone(), e.checksum.clone()))
                .collect();
            debug!(
                "Recording {} downloaded checksums in {}",
                downloaded.len(),
                cache.path().display()
            );
            cache.record(course_id, downloaded).await?;
        }

        Ok(report)
    }
}
