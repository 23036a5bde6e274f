//! Collaborator seams consumed by the core.
//!
//! The remote service and the test-execution sandbox live outside this crate;
//! the core only talks to them through these traits. Implementations report
//! failures as [`anyhow::Error`]; the commands turn service failures into
//! [`CoreError::Transport`](crate::error::CoreError::Transport) and test-run
//! failures into [`CoreError::Execution`](crate::error::CoreError::Execution).

use crate::diagnostics::CrashReport;
use crate::domain::{Course, CourseId, Exercise, HttpResult, Review, RunResult, SubmissionResult};
use crate::error::{CoreError, CoreResult};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Request/response operations offered by the exercise-management service
#[async_trait]
pub trait ExerciseService: Send + Sync {
    /// Verify credentials; `false` means the server rejected them
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool>;

    /// Drop any server-side session state for the current user
    async fn logout(&self) -> Result<()>;

    /// Point subsequent requests at another server
    async fn select_server(&self, address: &str) -> Result<bool>;

    async fn list_courses(&self) -> Result<Vec<Course>>;

    async fn get_course(&self, course_id: CourseId) -> Result<Course>;

    /// Full course, exercises included, from its details URL
    async fn get_course_details(&self, details_url: &Url) -> Result<Course>;

    /// Raw archive bytes of one exercise
    async fn download_exercise(&self, exercise: &Exercise) -> Result<Vec<u8>>;

    async fn submit(&self, exercise_root: &Path) -> Result<SubmissionResult>;

    async fn paste(&self, exercise_root: &Path) -> Result<Url>;

    async fn send_feedback(&self, answers: &HashMap<String, String>, url: &str)
    -> Result<HttpResult>;

    async fn list_reviews(&self, course: &Course) -> Result<Vec<Review>>;

    async fn send_crash_report(&self, report: &CrashReport) -> Result<()>;
}

/// Compiles and runs the tests of one exercise
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Whether this runner knows how to build the exercise at `root`
    fn supports(&self, root: &Path) -> bool;

    async fn run_tests(&self, root: &Path) -> Result<RunResult>;

    fn runner_name(&self) -> &'static str;
}

/// Ordered set of test runners; the first one that supports an exercise wins
#[derive(Clone, Default)]
pub struct TestRunnerRegistry {
    runners: Vec<Arc<dyn TestRunner>>,
}

impl TestRunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    pub fn register(&mut self, runner: Arc<dyn TestRunner>) {
        self.runners.push(runner);
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Pick the runner for `root`, or [`CoreError::NoExecutor`]
    pub fn runner_for(&self, root: &Path) -> CoreResult<Arc<dyn TestRunner>> {
        let runner = self
            .runners
            .iter()
            .find(|runner| runner.supports(root))
            .cloned()
            .ok_or_else(|| CoreError::NoExecutor(PathBuf::from(root)))?;

        debug!(
            "Selected test runner '{}' for {}",
            runner.runner_name(),
            root.display()
        );
        Ok(runner)
    }
}
