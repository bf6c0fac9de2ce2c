//! # Retry policy.
//!
//! [`RetryPolicy`] bundles the attempt budget, the delay schedule and an optional
//! per-attempt timeout. It is a plain `Copy` value; nothing in it is shared or mutated
//! once a retry call starts.

use std::time::Duration;

use crate::policies::backoff::BackoffPolicy;

/// How many times to run an operation and how long to wait in between.
///
/// `max_attempts` counts **all** invocations, including the first. A value of `0` is
/// treated as `1`; use [`RetryPolicy::attempts`] instead of reading the field.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use retryvisor::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.attempts(), 3);
/// assert_eq!(policy.delay(), Duration::from_millis(200));
///
/// let once = RetryPolicy::fixed(0, Duration::from_secs(1));
/// assert_eq!(once.attempts(), 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts (`>= 1`).
    pub max_attempts: u32,
    /// Delay schedule between failed attempts.
    pub backoff: BackoffPolicy,
    /// Optional per-attempt timeout (`None` = attempts may run forever).
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    /// 3 attempts, fixed 200ms delay, no timeout.
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(200))
    }
}

impl RetryPolicy {
    /// `max_attempts` attempts separated by a constant `delay`.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffPolicy::fixed(delay),
            timeout: None,
        }
    }

    /// Single attempt, never retried.
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Effective attempt budget (never below 1).
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Base delay after the first failure.
    #[inline]
    pub fn delay(&self) -> Duration {
        self.backoff.first
    }

    /// Effective per-attempt timeout; a zero duration means no timeout.
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|d| !d.is_zero())
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
