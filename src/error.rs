//! Error taxonomy shared by every command and the dispatcher.

use std::path::{Path, PathBuf};

/// Convenience alias used across the crate
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the core, either synchronously before scheduling or
/// through a [`PendingResult`](crate::pool::PendingResult).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required parameter was missing or empty
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No exercise or course root could be found at the given path
    #[error("Not found: {0}")]
    NotFound(String),

    /// No registered test runner recognizes the exercise
    #[error("No test runner available for {}", .0.display())]
    NoExecutor(PathBuf),

    /// A domain object lacks an identifier or is malformed
    #[error("Invalid data: {0}")]
    Data(String),

    /// Opaque failure reported by the service collaborator
    #[error("Service request failed: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// Opaque failure reported by the test-execution collaborator
    #[error("Test run failed: {0:#}")]
    Execution(#[source] anyhow::Error),

    /// Cache file or exercise tree could not be read or written
    #[error("Filesystem error: {message}")]
    Filesystem {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The unit of work was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// The unit of work panicked on its worker
    #[error("Operation panicked: {0}")]
    TaskPanicked(String),
}

impl CoreError {
    /// Filesystem error without an underlying I/O cause
    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::Filesystem {
            message: message.into(),
            source: None,
        }
    }

    /// Filesystem error naming the path that failed
    pub fn io(context: &str, path: &Path, source: std::io::Error) -> Self {
        Self::Filesystem {
            message: format!("{} {}", context, path.display()),
            source: Some(source),
        }
    }

    /// Stable name of the variant, used for crash reports and logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation",
            Self::NotFound(_) => "NotFound",
            Self::NoExecutor(_) => "NoExecutor",
            Self::Data(_) => "Data",
            Self::Transport(_) => "Transport",
            Self::Execution(_) => "Execution",
            Self::Filesystem { .. } => "Filesystem",
            Self::Cancelled => "Cancelled",
            Self::TaskPanicked(_) => "TaskPanicked",
        }
    }
}

/// Fail with [`CoreError::Validation`] if any parameter is empty.
///
/// `params` pairs a parameter name with its value so the message can say
/// which one was missing.
pub fn require_non_empty(params: &[(&str, &str)]) -> CoreResult<()> {
    for (name, value) in params {
        if value.is_empty() {
            return Err(CoreError::Validation(format!(
                "parameter '{}' must not be empty",
                name
            )));
        }
    }
    Ok(())
}

/// Fail with [`CoreError::Validation`] if `path` is empty
pub fn require_path(name: &str, path: &Path) -> CoreResult<()> {
    if path.as_os_str().is_empty() {
        return Err(CoreError::Validation(format!(
            "parameter '{}' must not be empty",
            name
        )));
    }
    Ok(())
}
