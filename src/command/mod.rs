//! Schedulable units of business logic.
//!
//! Every operation of the dispatcher is one concrete [`Command`] with typed
//! arguments and its own output type. A command validates its arguments
//! synchronously in [`Command::validate`]; [`Command::execute`] then runs on
//! the worker pool and talks to the collaborators.

use crate::error::{CoreError, CoreResult};
use crate::locator::ProjectRootFinder;
use crate::session::SharedSession;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod auth;
pub mod download;
pub mod exercise;
pub mod feedback;
pub mod listing;
pub mod updates;

pub use auth::{Authenticate, Logout, SelectServer};
pub use download::DownloadExercises;
pub use exercise::{Paste, RunTests, Submit};
pub use feedback::SendFeedback;
pub use listing::{GetCourse, GetCourseByName, ListCourses, ListExercises};
pub use updates::{GetExerciseUpdates, GetUnreadReviews};

/// One unit of work the dispatcher can schedule
#[async_trait]
pub trait Command: Send + 'static {
    type Output: Send + 'static;

    /// Operation name used for logging and crash reports
    fn name(&self) -> &'static str;

    /// Check arguments before anything is scheduled
    fn validate(&self) -> CoreResult<()> {
        Ok(())
    }

    async fn execute(self) -> CoreResult<Self::Output>;
}

/// Resolve `path` to its exercise root or fail with [`CoreError::NotFound`]
pub(crate) fn locate_exercise(finder: &ProjectRootFinder, path: &Path) -> CoreResult<PathBuf> {
    let root = finder.find_root(path).ok_or_else(|| {
        CoreError::NotFound(format!("no exercise found at {}", path.display()))
    })?;
    debug!("Resolved {} to exercise root {}", path.display(), root.display());
    Ok(root)
}

/// Name of the logged-in user or [`CoreError::Validation`]
pub(crate) async fn require_login(session: &SharedSession) -> CoreResult<String> {
    session
        .read()
        .await
        .username
        .clone()
        .ok_or_else(|| CoreError::Validation("no user is logged in".to_string()))
}
