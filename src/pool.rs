//! Worker pool and pending-result handles.
//!
//! The pool is a tokio runtime, either owned by the core or borrowed from the
//! embedding application. Every scheduled unit of work becomes a tokio task;
//! its [`PendingResult`] resolves once the unit finishes, fails, panics or is
//! cancelled.

use crate::error::{CoreError, CoreResult};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

/// Shared pool executing scheduled commands
#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    // Keeps an owned runtime alive for as long as any clone of the pool exists
    _owned: Option<Arc<OwnedRuntime>>,
}

struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        // Shutting down in the background is allowed from inside async contexts
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl WorkerPool {
    /// Build an owned multi-thread pool with `worker_threads` workers
    pub fn new(worker_threads: usize) -> CoreResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("tmc-core-worker")
            .enable_all()
            .build()
            .map_err(|e| CoreError::Filesystem {
                message: "failed to start worker pool".to_string(),
                source: Some(e),
            })?;

        debug!("Started worker pool with {} threads", worker_threads.max(1));

        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Borrow an existing runtime, e.g. the single-threaded one of a test
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _owned: None,
        }
    }

    /// Borrow the runtime the caller is running on.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::from_handle(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Schedule one unit of work; never blocks the calling thread
    pub fn spawn<F, T>(&self, operation: &'static str, unit: F) -> PendingResult<T>
    where
        F: Future<Output = CoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        debug!("Scheduling {}", operation);
        PendingResult {
            operation,
            inner: self.handle.spawn(unit),
        }
    }
}

/// Handle to the eventual result of a scheduled unit of work
#[must_use = "a pending result does nothing unless awaited or cancelled"]
pub struct PendingResult<T> {
    operation: &'static str,
    inner: JoinHandle<CoreResult<T>>,
}

impl<T> PendingResult<T> {
    /// Name of the operation this handle belongs to
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Request cancellation.
    ///
    /// Best effort: side effects already performed by the unit stay in place.
    pub fn cancel(&self) {
        debug!("Cancelling {}", self.operation);
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T> Future for PendingResult<T> {
    type Output = CoreResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(join_error(e))))
    }
}

fn join_error(err: JoinError) -> CoreError {
    if err.is_cancelled() {
        return CoreError::Cancelled;
    }
    let message = match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(e) => e.to_string(),
    };
    CoreError::TaskPanicked(message)
}

/// Text of a panic payload raised with a string message
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
