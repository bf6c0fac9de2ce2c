//! # Executor: the host scheduling capability.
//!
//! Retry calls and detached tasks never touch the runtime directly; they go through an
//! [`Executor`], which knows how to **spawn** a background future and how to **sleep**.
//! [`TokioExecutor`] is the default. Custom executors can pin work to a dedicated
//! runtime, or wrap sleeps for instrumentation in tests.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::{runtime::Handle, task::JoinHandle};

/// Host capability used to run detached work and timers.
pub trait Executor: Send + Sync + 'static {
    /// Starts `fut` in the background and returns its join handle.
    ///
    /// Must not block the caller.
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()>;

    /// Completes after `delay`.
    ///
    /// Cancellation is layered on top by the caller; implementations only need to
    /// be drop-safe.
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// [`Executor`] backed by a tokio runtime.
///
/// Without an explicit handle, work is spawned on the runtime of the calling task.
#[derive(Clone, Debug, Default)]
pub struct TokioExecutor {
    handle: Option<Handle>,
}

impl TokioExecutor {
    /// Spawns on whichever runtime is current at spawn time.
    #[must_use]
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Spawns on the given runtime.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        match &self.handle {
            Some(handle) => handle.spawn(fut),
            None => tokio::spawn(fut),
        }
    }

    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
