//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] centralizes the settings of a [`Supervisor`](crate::Supervisor):
//! shutdown grace, detached-task concurrency, event bus capacity and the default
//! [`RetryPolicy`] handed out by [`Supervisor::retry`](crate::Supervisor::retry).
//!
//! ## Sentinel values
//! - `max_detached = 0` → unlimited (no semaphore created)
//! - `timeout = 0s` → no per-attempt timeout

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Configuration for the supervisor runtime.
///
/// All fields are public; prefer the accessors over reading sentinel values directly.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time [`Supervisor::shutdown`](crate::Supervisor::shutdown) waits for
    /// detached tasks after cancelling them.
    pub grace: Duration,

    /// Maximum number of detached tasks running at once (`0` = unlimited).
    ///
    /// Tasks over the limit are still spawned immediately; they wait for a slot
    /// inside the executor, never in the caller.
    pub max_detached: usize,

    /// Capacity of the event bus ring buffer (minimum 1).
    pub bus_capacity: usize,

    /// Default policy for [`Supervisor::retry`](crate::Supervisor::retry).
    pub retry: RetryPolicy,

    /// Default per-attempt timeout (`0s` = none). Applied when `retry.timeout` is `None`.
    pub timeout: Duration,
}

impl SupervisorConfig {
    /// Detached-task concurrency limit; `None` = unlimited.
    #[inline]
    pub fn detached_limit(&self) -> Option<usize> {
        if self.max_detached == 0 {
            None
        } else {
            Some(self.max_detached)
        }
    }

    /// Default per-attempt timeout; `None` = no timeout.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// The retry policy with the config-wide timeout filled in.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry.timeout {
            Some(_) => self.retry,
            None => self.retry.with_timeout(self.default_timeout()),
        }
    }
}

impl Default for SupervisorConfig {
    /// - `grace = 60s`
    /// - `max_detached = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `retry = RetryPolicy::default()` (3 attempts, 200ms apart)
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            max_detached: 0,
            bus_capacity: 1024,
            retry: RetryPolicy::default(),
            timeout: Duration::ZERO,
        }
    }
}
