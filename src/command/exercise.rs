use super::{Command, locate_exercise};
use crate::domain::{RunResult, SubmissionResult};
use crate::error::{CoreError, CoreResult, require_path};
use crate::locator::ProjectRootFinder;
use crate::service::{ExerciseService, TestRunnerRegistry};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Send the exercise enclosing `path` to the server for evaluation
pub struct Submit {
    path: PathBuf,
    finder: ProjectRootFinder,
    service: Arc<dyn ExerciseService>,
}

impl Submit {
    pub fn new(path: impl Into<PathBuf>, finder: ProjectRootFinder, service: Arc<dyn ExerciseService>) -> Self {
        Self {
            path: path.into(),
            finder,
            service,
        }
    }
}

#[async_trait]
impl Command for Submit {
    type Output = SubmissionResult;

    fn name(&self) -> &'static str {
        "submit"
    }

    fn validate(&self) -> CoreResult<()> {
        require_path("path", &self.path)
    }

    async fn execute(self) -> CoreResult<SubmissionResult> {
        let root = locate_exercise(&self.finder, &self.path)?;
        let result = self.service.submit(&root).await.map_err(CoreError::Transport)?;
        info!("Submitted {}", root.display());
        Ok(result)
    }
}

/// Run the local tests of the exercise enclosing `path`
pub struct RunTests {
    path: PathBuf,
    finder: ProjectRootFinder,
    runners: TestRunnerRegistry,
}

impl RunTests {
    pub fn new(path: impl Into<PathBuf>, finder: ProjectRootFinder, runners: TestRunnerRegistry) -> Self {
        Self {
            path: path.into(),
            finder,
            runners,
        }
    }
}

#[async_trait]
impl Command for RunTests {
    type Output = RunResult;

    fn name(&self) -> &'static str {
        "test"
    }

    fn validate(&self) -> CoreResult<()> {
        require_path("path", &self.path)
    }

    async fn execute(self) -> CoreResult<RunResult> {
        let root = locate_exercise(&self.finder, &self.path)?;
        let runner = self.runners.runner_for(&root)?;

        let result = runner.run_tests(&root).await.map_err(CoreError::Execution)?;
        info!(
            "Tests of {} finished with {:?}",
            root.display(),
            result.status
        );
        Ok(result)
    }
}

/// Upload the exercise enclosing `path` as a paste; resolves to its location
pub struct Paste {
    path: PathBuf,
    finder: ProjectRootFinder,
    service: Arc<dyn ExerciseService>,
}

impl Paste {
    pub fn new(path: impl Into<PathBuf>, finder: ProjectRootFinder, service: Arc<dyn ExerciseService>) -> Self {
        Self {
            path: path.into(),
            finder,
            service,
        }
    }
}

#[async_trait]
impl Command for Paste {
    type Output = Url;

    fn name(&self) -> &'static str {
        "paste"
    }

    fn validate(&self) -> CoreResult<()> {
        require_path("path", &self.path)
    }

    async fn execute(self) -> CoreResult<Url> {
        let root = locate_exercise(&self.finder, &self.path)?;
        let url = self.service.paste(&root).await.map_err(CoreError::Transport)?;
        info!("Created paste of {} at {}", root.display(), url);
        Ok(url)
    }
}
