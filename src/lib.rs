//! # TMC Core
//!
//! Client-side orchestration core for an exercise-management service. It logs
//! users in, lists courses and exercises, submits solutions, runs tests,
//! downloads exercise content and detects which exercises changed since the
//! last sync. Network transport and the test sandbox are collaborators the
//! embedding application provides.
//!
//! ## Architecture Overview
//!
//! - **[`dispatcher`]**: the [`TmcCore`] facade; validates, schedules and hands out handles
//! - **[`command`]**: one typed unit of work per operation
//! - **[`pool`]**: tokio-backed worker pool and cancellable [`PendingResult`] handles
//! - **[`diagnostics`]**: best-effort crash reporting around any unit of work
//! - **[`updates`]**: checksum cache and new/updated exercise detection
//! - **[`download`]**: archive extraction and protected-path aware merging
//! - **[`locator`]**: pluggable exercise root detection
//!
//! ## Features
//!
//! ### 🔄 Update Detection
//! - Per-course, per-exercise checksums persisted in a single JSON cache file
//! - Cache written only after a detection pass, so no update is silently lost
//! - Copy-then-delete cache relocation
//!
//! ### 📦 Merge Downloads
//! - Incoming instructor files refresh the local copy
//! - Student sources and declared files are never overwritten
//! - Local-only files are never deleted; repeated merges converge
//!
//! ### ⚙️ Dispatch
//! - Synchronous argument validation before anything is scheduled
//! - Failures, panics and cancellation resolve the handle, never the pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tmc_core::{Collaborators, CoreConfig, ExerciseService, TmcCore};
//!
//! # async fn run(service: Arc<dyn ExerciseService>) -> Result<(), tmc_core::CoreError> {
//! tmc_core::logging::init_tracing("tmc_core=info");
//!
//! let config = CoreConfig {
//!     cache_file: Some("/home/student/.tmc/exercise-checksums.json".into()),
//!     ..Default::default()
//! };
//! let core = TmcCore::new(config, Collaborators::new(service))?;
//!
//! for course in core.list_courses()?.await? {
//!     let updates = core.get_new_and_updated_exercises(course)?.await?;
//!     println!("{} exercises changed", updates.len());
//! }
//! # Ok(())
//! # }
//! ```

/// Schedulable units of work, one per dispatcher operation.
pub mod command;

/// Configuration loading and discovery.
pub mod config;

/// Best-effort crash reporting wrapper.
pub mod diagnostics;

/// The [`TmcCore`] facade.
pub mod dispatcher;

/// Courses, exercises, reviews and opaque result payloads.
pub mod domain;

/// Selective merge download of exercise archives.
pub mod download;

/// Environment constants and path utilities.
pub mod env;

/// Error taxonomy.
pub mod error;

/// Exercise root location.
pub mod locator;

/// Tracing subscriber setup.
pub mod logging;

/// Worker pool and pending-result handles.
pub mod pool;

/// Collaborator traits for the remote service and test execution.
pub mod service;

/// In-memory client session.
pub mod session;

/// Exercise update detection.
pub mod updates;

pub use config::{ConfigDiscovery, CoreConfig};
pub use diagnostics::{CrashReport, DiagnosticsSink, TracingSink, instrument};
pub use dispatcher::{Collaborators, TmcCore};
pub use domain::{Course, CourseId, Exercise, HttpResult, Review, RunResult, RunStatus, SubmissionResult, Theme};
pub use download::{ArchiveExtractor, DownloadReport, TarGzExtractor};
pub use error::{CoreError, CoreResult};
pub use locator::{BuildFileDetector, ProjectRootFinder, RootDetector};
pub use pool::{PendingResult, WorkerPool};
pub use service::{ExerciseService, TestRunner, TestRunnerRegistry};
