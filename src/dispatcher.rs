//! # Dispatcher facade
//!
//! [`TmcCore`] is the only entry point for client applications. It owns the
//! worker pool, the client session, the single update-cache reference and the
//! collaborators, and turns every operation into one scheduled [`Command`].
//!
//! ```text
//!  caller ──► TmcCore::op(args)
//!               │  validate (sync, ValidationError/DataError)
//!               ▼
//!          Command ──instrument──► WorkerPool::spawn ──► PendingResult<T>
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tmc_core::{Collaborators, CoreConfig, ExerciseService, TmcCore};
//!
//! # async fn demo(service: Arc<dyn ExerciseService>) -> Result<(), tmc_core::CoreError> {
//! let core = TmcCore::new(CoreConfig::default(), Collaborators::new(service))?;
//!
//! let logged_in = core.login("student", "secret")?.await?;
//! if logged_in {
//!     let report = core.download_exercises("/home/student/ohpe", "3")?.await?;
//!     println!("{}", report);
//! }
//! # Ok(())
//! # }
//! ```

use crate::command::auth::Credentials;
use crate::command::{
    Authenticate, Command, DownloadExercises, GetCourse, GetCourseByName, GetExerciseUpdates,
    GetUnreadReviews, ListCourses, ListExercises, Logout, Paste, RunTests, SelectServer, SendFeedback, Submit,
};
use crate::config::CoreConfig;
use crate::diagnostics::{DiagnosticsSink, ServiceSink, instrument};
use crate::domain::{Course, Exercise, HttpResult, Review, RunResult, SubmissionResult};
use crate::download::{ArchiveExtractor, DownloadReport, SelectiveMergeDownload, TarGzExtractor};
use crate::error::{CoreError, CoreResult};
use crate::locator::{BuildFileDetector, ProjectRootFinder, RootDetector};
use crate::pool::{PendingResult, WorkerPool};
use crate::service::{ExerciseService, TestRunner, TestRunnerRegistry};
use crate::session::{ClientSession, SharedSession, shared};
use crate::updates::{ExerciseUpdateDetector, UpdateCache, cache};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// External collaborators injected into a core
pub struct Collaborators {
    service: Arc<dyn ExerciseService>,
    test_runners: TestRunnerRegistry,
    extractor: Arc<dyn ArchiveExtractor>,
    root_finder: Option<ProjectRootFinder>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl Collaborators {
    /// Service only; tar.gz extraction, build-file root detection, no test runners
    pub fn new(service: Arc<dyn ExerciseService>) -> Self {
        Self {
            service,
            test_runners: TestRunnerRegistry::new(),
            extractor: Arc::new(TarGzExtractor),
            root_finder: None,
            diagnostics: None,
        }
    }

    pub fn with_test_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.test_runners.register(runner);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_root_detector(mut self, detector: impl RootDetector + 'static) -> Self {
        self.root_finder = Some(ProjectRootFinder::new(detector));
        self
    }

    /// Sink used when diagnostics are enabled; defaults to the service
    pub fn with_diagnostics_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

/// Standalone business logic for any exercise client application
pub struct TmcCore {
    pool: WorkerPool,
    service: Arc<dyn ExerciseService>,
    test_runners: TestRunnerRegistry,
    finder: ProjectRootFinder,
    downloader: SelectiveMergeDownload,
    session: SharedSession,
    cache: RwLock<Option<UpdateCache>>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl TmcCore {
    /// Build a core with its own worker pool sized from `config`
    pub fn new(config: CoreConfig, collaborators: Collaborators) -> CoreResult<Self> {
        let pool = WorkerPool::new(config.effective_worker_threads())?;
        Self::with_pool(config, collaborators, pool)
    }

    /// Build a core on an injected pool
    pub fn with_pool(config: CoreConfig, collaborators: Collaborators, pool: WorkerPool) -> CoreResult<Self> {
        let cache = config.cache_file.as_deref().map(UpdateCache::open).transpose()?;

        let diagnostics = if config.send_diagnostics {
            Some(collaborators.diagnostics.unwrap_or_else(|| {
                Arc::new(ServiceSink::new(
                    Arc::clone(&collaborators.service),
                    pool.handle().clone(),
                )) as Arc<dyn DiagnosticsSink>
            }))
        } else {
            None
        };

        let finder = collaborators
            .root_finder
            .unwrap_or_else(|| ProjectRootFinder::new(BuildFileDetector::new(config.root_markers.clone())));

        let downloader = SelectiveMergeDownload::new(
            Arc::clone(&collaborators.service),
            collaborators.extractor,
            config.exercise_layout(),
        );

        info!(
            "Core ready (cache: {:?}, diagnostics: {})",
            config.cache_file,
            diagnostics.is_some()
        );

        Ok(Self {
            pool,
            service: collaborators.service,
            test_runners: collaborators.test_runners,
            finder,
            downloader,
            session: shared(ClientSession {
                server_address: config.server_address,
                username: None,
            }),
            cache: RwLock::new(cache),
            diagnostics,
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Snapshot of the client session
    pub async fn session(&self) -> ClientSession {
        self.session.read().await.clone()
    }

    /// Path of the active update cache, if any
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.current_cache().map(|c| c.path().to_path_buf())
    }

    /// Move the update cache to `new_cache`, which must already exist.
    ///
    /// The old file's content is copied over `new_cache` and the old file is
    /// deleted. Callers must not run update detection concurrently.
    pub fn set_cache_file(&self, new_cache: impl AsRef<Path>) -> CoreResult<()> {
        let new_cache = new_cache.as_ref();
        let mut active = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        cache::hand_off(active.as_ref().map(UpdateCache::path), new_cache)?;
        *active = Some(UpdateCache::open(new_cache)?);
        Ok(())
    }

    /// Authenticate and remember the user; resolves to whether the server accepted
    pub fn login(&self, username: &str, password: &str) -> CoreResult<PendingResult<bool>> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.schedule(Authenticate::new(
            credentials,
            Arc::clone(&self.service),
            Arc::clone(&self.session),
        ))
    }

    /// Always clears the user; resolves to whether someone was logged in
    pub fn logout(&self) -> CoreResult<PendingResult<bool>> {
        self.schedule(Logout::new(
            Arc::clone(&self.service),
            Arc::clone(&self.session),
        ))
    }

    pub fn select_server(&self, address: &str) -> CoreResult<PendingResult<bool>> {
        self.schedule(SelectServer::new(
            address,
            Arc::clone(&self.service),
            Arc::clone(&self.session),
        ))
    }

    pub fn list_courses(&self) -> CoreResult<PendingResult<Vec<Course>>> {
        self.schedule(ListCourses::new(Arc::clone(&self.service)))
    }

    /// Full course behind `details_url`; the handle fails with
    /// [`CoreError::Validation`] when nobody is logged in
    pub fn get_course(&self, details_url: &str) -> CoreResult<PendingResult<Course>> {
        self.schedule(GetCourse::new(
            details_url,
            Arc::clone(&self.service),
            Arc::clone(&self.session),
        ))
    }

    pub fn get_course_by_name(&self, name: &str) -> CoreResult<PendingResult<Course>> {
        self.schedule(GetCourseByName::new(
            name,
            Arc::clone(&self.service),
            Arc::clone(&self.session),
        ))
    }

    /// Exercises of the course `path` lies in
    pub fn list_exercises(&self, path: impl Into<PathBuf>) -> CoreResult<PendingResult<Vec<Exercise>>> {
        self.schedule(ListExercises::new(path, Arc::clone(&self.service)))
    }

    /// Download a course into `path`, keeping student files intact
    pub fn download_exercises(
        &self,
        path: impl Into<PathBuf>,
        course_id: &str,
    ) -> CoreResult<PendingResult<DownloadReport>> {
        self.schedule(DownloadExercises::new(
            path,
            course_id,
            self.downloader.clone(),
            self.current_cache(),
        ))
    }

    pub fn submit(&self, path: impl Into<PathBuf>) -> CoreResult<PendingResult<SubmissionResult>> {
        self.schedule(Submit::new(
            path,
            self.finder.clone(),
            Arc::clone(&self.service),
        ))
    }

    pub fn test(&self, path: impl Into<PathBuf>) -> CoreResult<PendingResult<RunResult>> {
        self.schedule(RunTests::new(
            path,
            self.finder.clone(),
            self.test_runners.clone(),
        ))
    }

    pub fn paste(&self, path: impl Into<PathBuf>) -> CoreResult<PendingResult<url::Url>> {
        self.schedule(Paste::new(
            path,
            self.finder.clone(),
            Arc::clone(&self.service),
        ))
    }

    pub fn get_new_reviews(&self, course: Course) -> CoreResult<PendingResult<Vec<Review>>> {
        self.schedule(GetUnreadReviews::new(course, Arc::clone(&self.service)))
    }

    /// New and updated exercises of `course`, checked against the active cache
    pub fn get_new_and_updated_exercises(&self, course: Course) -> CoreResult<PendingResult<Vec<Exercise>>> {
        let cache = self
            .current_cache()
            .ok_or_else(|| CoreError::filesystem("no update cache file configured"))?;
        self.schedule(GetExerciseUpdates::new(
            course,
            ExerciseUpdateDetector::new(cache),
        ))
    }

    /// Like [`get_new_and_updated_exercises`](Self::get_new_and_updated_exercises)
    /// but against another, already existing cache file
    pub fn get_new_and_updated_exercises_with_cache(
        &self,
        course: Course,
        cache_file: impl AsRef<Path>,
    ) -> CoreResult<PendingResult<Vec<Exercise>>> {
        let cache = UpdateCache::open(cache_file.as_ref())?;
        self.schedule(GetExerciseUpdates::new(
            course,
            ExerciseUpdateDetector::new(cache),
        ))
    }

    pub fn send_feedback(
        &self,
        answers: HashMap<String, String>,
        url: &str,
    ) -> CoreResult<PendingResult<HttpResult>> {
        self.schedule(SendFeedback::new(answers, url, Arc::clone(&self.service)))
    }

    /// Run an arbitrary unit of work on the core's pool
    pub fn submit_task<F, T>(&self, unit: F) -> PendingResult<T>
    where
        F: Future<Output = CoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.pool
            .spawn("task", instrument("task", unit, self.diagnostics.clone()))
    }

    fn schedule<C: Command>(&self, command: C) -> CoreResult<PendingResult<C::Output>> {
        let name = command.name();
        command.validate()?;

        debug!("Dispatching {}", name);
        Ok(self
            .pool
            .spawn(name, instrument(name, command.execute(), self.diagnostics.clone())))
    }

    fn current_cache(&self) -> Option<UpdateCache> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
