//! # LogWriter: events as structured log records
//!
//! A subscriber that forwards every [`Event`] to [`tracing`], with the event metadata
//! as structured fields. Install any `tracing` subscriber to see the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  attempt starting task="fetch" attempt=1
//! WARN  attempt failed task="fetch" attempt=1 elapsed_ms=3 reason="boom"
//! INFO  backoff scheduled task="fetch" attempt=1 delay_ms=200
//! ERROR retry exhausted task="fetch" attempt=3 reason="boom"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event-to-`tracing` subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::AttemptStarting => {
                tracing::debug!(task, attempt = e.attempt, "attempt starting");
            }
            EventKind::AttemptSucceeded => {
                tracing::debug!(task, attempt = e.attempt, elapsed_ms = e.elapsed_ms, "attempt succeeded");
            }
            EventKind::AttemptFailed => {
                tracing::warn!(task, attempt = e.attempt, elapsed_ms = e.elapsed_ms, reason, "attempt failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(task, attempt = e.attempt, timeout_ms = e.timeout_ms, "attempt timed out");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(task, attempt = e.attempt, delay_ms = e.delay_ms, reason, "backoff scheduled");
            }
            EventKind::RetryExhausted => {
                tracing::error!(task, attempts = e.attempt, reason, "retry exhausted");
            }
            EventKind::RetryFatal => {
                tracing::error!(task, attempt = e.attempt, reason, "non-retryable failure");
            }
            EventKind::RetryCancelled => {
                tracing::info!(task, attempts = e.attempt, "retry cancelled");
            }
            EventKind::DetachedSpawned => {
                tracing::debug!(task, "detached task spawned");
            }
            EventKind::DetachedCompleted => {
                tracing::debug!(task, elapsed_ms = e.elapsed_ms, "detached task completed");
            }
            EventKind::DetachedFailed => {
                tracing::error!(task, elapsed_ms = e.elapsed_ms, reason, "detached task failed");
            }
            EventKind::DetachedPanicked => {
                tracing::error!(task, reason, "detached task panicked");
            }
            EventKind::DetachedCancelled => {
                tracing::info!(task, "detached task cancelled");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("all detached tasks stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(reason, "shutdown grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = task, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
