//! # retryvisor
//!
//! **Retryvisor** runs async operations under two small supervision disciplines:
//!
//! - **retry**: re-run an operation up to a fixed number of attempts, waiting a
//!   (possibly growing, possibly jittered) delay between attempts, until it succeeds,
//!   gives up, or is cancelled;
//! - **detached**: start an operation in the background and return at once; if it
//!   fails (or panics), hand the failure to an observer callback instead of the caller.
//!
//! Both work standalone ([`retry`], [`supervise_detached`]) or through a [`Supervisor`],
//! which adds lifecycle events, subscribers, a concurrency limit for detached tasks and
//! graceful shutdown.
//!
//! ## Architecture
//! ```text
//!   caller ── sup.retry(name).run(op) ───────────┐   (awaits the outcome)
//!   caller ── sup.supervise_detached(name, op) ──┤   (returns a DetachedHandle)
//!                                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Executor (spawn + sleep)                                       │
//! │  - Bus (broadcast events)                                         │
//! │  - TaskTracker (detached tasks, for shutdown)                     │
//! │  - Semaphore (optional detached concurrency limit)                │
//! │  - CancellationToken (root; every call gets a child)              │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼
//!                  Bus ──► listener ──► SubscriberSet
//!                                   ┌─────────┼─────────┐
//!                                   ▼         ▼         ▼
//!                               LogWriter   sub2      subN
//! ```
//!
//! ## Retry outcomes
//! ```text
//! Ok(T)                          first successful attempt
//! Err(RetryError::Exhausted)     every attempt failed; carries count + last failure
//! Err(RetryError::Fatal)         predicate rejected the error (Retry::run_if)
//! Err(RetryError::Cancelled)     token fired during an attempt or a delay
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use retryvisor::{RetryPolicy, TaskError, retry};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let calls = AtomicU32::new(0);
//!     let policy = RetryPolicy::fixed(3, Duration::from_millis(5));
//!
//!     let value = retry(&policy, &CancellationToken::new(), || async {
//!         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
//!             Err(TaskError::fail("not yet"))
//!         } else {
//!             Ok(42)
//!         }
//!     })
//!     .await
//!     .unwrap();
//!
//!     assert_eq!(value, 42);
//!     assert_eq!(calls.load(Ordering::SeqCst), 3);
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    DetachedHandle, ErrorObserver, Executor, Retry, Supervisor, SupervisorBuilder,
    SupervisorConfig, TokioExecutor, delay, retry, supervise_detached,
};
pub use error::{AttemptError, Cancelled, DetachedFailure, RetryError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
