//! # Delay schedule between retry attempts.
//!
//! [`BackoffPolicy`] answers one question: how long to wait after the `n`-th
//! failed attempt before starting the next one. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay after the first failure;
//! - [`BackoffPolicy::factor`] the multiplicative growth per further failure;
//! - [`BackoffPolicy::max`] the cap applied before jitter.
//!
//! The default is a **fixed** 200ms delay (`factor = 1.0`, no jitter).
//!
//! The base delay for failure `n` (1-based) is `first × factor^(n-1)`, clamped to `max`.
//! Jitter is applied on top of the clamped base and never feeds back into later
//! calculations, so jittered delays cannot shrink the schedule over time.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_after(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay_after(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay between consecutive failed attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub first: Duration,
    /// Upper bound for the base delay (jitter is applied after clamping).
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant delay).
    pub factor: f64,
    /// Randomization applied to every computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Fixed 200ms delay, capped at 30s, no jitter.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(200))
    }
}

impl BackoffPolicy {
    /// Constant delay between attempts.
    ///
    /// The cap is at least 30s so that a large fixed `delay` is still honored.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay.max(Duration::from_secs(30)),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Exponential delay starting at `first`, doubling per failure, capped at `max`.
    pub fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with a different jitter policy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the delay to wait after failed attempt number `failed` (1-based).
    ///
    /// `failed = 0` is treated like `1`.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let base = self.base_after(failed);

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }

    /// Base (un-jittered) delay after failed attempt `failed`.
    fn base_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
