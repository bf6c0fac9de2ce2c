//! Retry policies.
//!
//! This module groups the knobs that control **how many** attempts a retry call makes
//! and **how long** it waits between them.
//!
//! ## Contents
//! - [`RetryPolicy`]   attempt budget + backoff + optional per-attempt timeout
//! - [`BackoffPolicy`] delay schedule (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 3 attempts, fixed 200ms delay, no timeout.
//! - `BackoffPolicy::default()` → first=200ms, factor=1.0 (constant), max=30s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
