//! # Lifecycle events emitted by retry calls, detached tasks and the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Attempt events**: one attempt inside a retry call (starting, succeeded, failed, timeout, backoff)
//! - **Retry terminal events**: how a retry call ended (exhausted, fatal, cancelled)
//! - **Detached events**: lifecycle of fire-and-forget tasks
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries optional metadata such as task name, attempt number,
//! delays and elapsed time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::AttemptFailed)
//!     .with_task("fetch")
//!     .with_reason("boom")
//!     .with_attempt(2)
//!     .with_elapsed(Duration::from_millis(12));
//!
//! assert_eq!(ev.kind, EventKind::AttemptFailed);
//! assert_eq!(ev.task.as_deref(), Some("fetch"));
//! assert_eq!(ev.elapsed_ms, Some(12));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Attempt events ===
    /// An attempt is about to run.
    ///
    /// Sets: `task`, `attempt` (1-based).
    AttemptStarting,

    /// The attempt returned a value; the retry call ends successfully.
    ///
    /// Sets: `task`, `attempt`, `elapsed_ms`.
    AttemptSucceeded,

    /// The attempt failed (error or timeout).
    ///
    /// Sets: `task`, `attempt`, `elapsed_ms`, `reason`.
    AttemptFailed,

    /// The attempt exceeded its timeout. Always followed by `AttemptFailed`.
    ///
    /// Sets: `task`, `attempt`, `timeout_ms`.
    TimeoutHit,

    /// The next attempt is scheduled after a delay.
    ///
    /// Sets: `task`, `attempt` (the failed one), `delay_ms`, `reason`.
    BackoffScheduled,

    // === Retry terminal events ===
    /// Every permitted attempt failed.
    ///
    /// Sets: `task`, `attempt` (total), `reason`.
    RetryExhausted,

    /// An attempt failed with a non-retryable error.
    ///
    /// Sets: `task`, `attempt`, `reason`.
    RetryFatal,

    /// The retry call was cancelled during an attempt or a delay.
    ///
    /// Sets: `task`, `attempt` (attempts started so far).
    RetryCancelled,

    // === Detached task events ===
    /// A detached task was handed to the executor.
    ///
    /// Sets: `task`.
    DetachedSpawned,

    /// A detached task finished successfully.
    ///
    /// Sets: `task`, `elapsed_ms`.
    DetachedCompleted,

    /// A detached task returned an error.
    ///
    /// Sets: `task`, `elapsed_ms`, `reason`.
    DetachedFailed,

    /// A detached task panicked; the panic was caught.
    ///
    /// Sets: `task`, `reason` (panic message).
    DetachedPanicked,

    /// A detached task was cancelled before completing.
    ///
    /// Sets: `task`.
    DetachedCancelled,

    // === Runtime events ===
    /// Supervisor shutdown started.
    ShutdownRequested,

    /// All detached tasks stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some detached tasks are still running.
    ///
    /// Sets: `reason` (count of stuck tasks).
    GraceExceeded,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberOverflow,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the retry call or detached task, if applicable.
    pub task: Option<Arc<str>>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Attempt timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Time spent in the attempt or detached task, in milliseconds.
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the backoff delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Attaches the attempt timeout (stored as milliseconds, saturating).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches elapsed time (stored as milliseconds, saturating).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(millis(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events that report on subscribers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::AttemptStarting);
        let b = Event::new(EventKind::AttemptStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
