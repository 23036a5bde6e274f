//! Best-effort crash reporting around units of work.
//!
//! [`instrument`] wraps an operation; when the operation fails or panics and a
//! sink is present, a [`CrashReport`] is handed to the sink and the original
//! error or panic is passed on unchanged. Sinks must not block: anything slow
//! is spawned.

use crate::error::{CoreError, CoreResult};
use crate::pool::panic_message;
use crate::service::ExerciseService;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Description of one failed unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReport {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub operation: String,
    pub error_kind: String,
    pub message: String,
    pub details: String,
}

impl CrashReport {
    pub fn new(operation: &str, err: &CoreError) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            operation: operation.to_string(),
            error_kind: err.kind().to_string(),
            message: err.to_string(),
            details: format!("{:?}", err),
        }
    }
}

/// Destination for crash reports
pub trait DiagnosticsSink: Send + Sync {
    /// Accept a report without blocking the caller
    fn report(&self, report: CrashReport);
}

/// Logs crash reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, report: CrashReport) {
        error!(
            report_id = %report.id,
            operation = %report.operation,
            kind = %report.error_kind,
            "Operation failed: {}",
            report.message
        );
    }
}

/// Forwards crash reports to the service on a spawned task
pub struct ServiceSink {
    service: Arc<dyn ExerciseService>,
    runtime: tokio::runtime::Handle,
}

impl ServiceSink {
    pub fn new(service: Arc<dyn ExerciseService>, runtime: tokio::runtime::Handle) -> Self {
        Self { service, runtime }
    }
}

impl DiagnosticsSink for ServiceSink {
    fn report(&self, report: CrashReport) {
        let service = Arc::clone(&self.service);
        self.runtime.spawn(async move {
            if let Err(e) = service.send_crash_report(&report).await {
                warn!("Failed to deliver crash report {}: {:#}", report.id, e);
            }
        });
    }
}

/// Wrap `operation` so its failure is reported to `sink` before being returned.
///
/// A panic is reported as [`CoreError::TaskPanicked`] and then resumed, so the
/// pool still resolves the handle. With no sink the wrapper is transparent.
pub fn instrument<F, T>(
    name: &'static str,
    operation: F,
    sink: Option<Arc<dyn DiagnosticsSink>>,
) -> impl Future<Output = CoreResult<T>> + Send
where
    F: Future<Output = CoreResult<T>> + Send,
    T: Send,
{
    async move {
        let Some(sink) = sink else {
            return operation.await;
        };

        match AssertUnwindSafe(operation).catch_unwind().await {
            Ok(result) => {
                if let Err(err) = &result {
                    sink.report(CrashReport::new(name, err));
                }
                result
            }
            Err(payload) => {
                let err = CoreError::TaskPanicked(panic_message(payload.as_ref()));
                sink.report(CrashReport::new(name, &err));
                panic::resume_unwind(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<CrashReport>>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn report(&self, report: CrashReport) {
            self.reports.lock().unwrap().push(report);
        }
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_returned_unchanged() {
        let sink = Arc::new(RecordingSink::default());
        let wrapped = instrument(
            "submit",
            async { Err::<(), _>(CoreError::NotFound("no exercise at /tmp".to_string())) },
            Some(sink.clone() as Arc<dyn DiagnosticsSink>),
        );

        let err = wrapped.await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(ref msg) if msg == "no exercise at /tmp"));

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].operation, "submit");
        assert_eq!(reports[0].error_kind, "NotFound");
    }

    #[tokio::test]
    async fn test_success_is_not_reported() {
        let sink = Arc::new(RecordingSink::default());
        let value = instrument(
            "list_courses",
            async { Ok::<_, CoreError>(7) },
            Some(sink.clone() as Arc<dyn DiagnosticsSink>),
        )
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_reported_once_and_resolves_as_panicked() {
        let sink = Arc::new(RecordingSink::default());
        let wrapped = instrument(
            "test",
            async {
                let runner: Option<u8> = None;
                let _ = runner.expect("runner vanished");
                Ok::<(), CoreError>(())
            },
            Some(sink.clone() as Arc<dyn DiagnosticsSink>),
        );

        let result = WorkerPool::current().spawn("test", wrapped).await;
        assert!(matches!(result, Err(CoreError::TaskPanicked(ref msg)) if msg == "runner vanished"));

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error_kind, "TaskPanicked");
        assert!(reports[0].message.contains("runner vanished"));
    }

    #[tokio::test]
    async fn test_without_sink_is_transparent() {
        let err = instrument(
            "logout",
            async { Err::<(), _>(CoreError::Cancelled) },
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
    }
}
