//! Error types used by retry calls, detached tasks and the supervisor runtime.
//!
//! - [`AttemptError`]: one failed attempt (the operation's own error, or a timeout).
//! - [`RetryError`]: the terminal failure of a retry call.
//! - [`DetachedFailure`]: what a detached task hands to its observer.
//! - [`RuntimeError`]: failures of the supervisor itself (shutdown).
//! - [`Cancelled`]: a cancellable wait was interrupted.
//! - [`TaskError`]: a ready-made operation error with a retryable/fatal split.
//!
//! All of them provide `as_label()` returning a short stable snake_case label for logs.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Detached tasks did not finish within the shutdown grace period.
    #[error("shutdown timeout {grace:?} exceeded; {stuck} detached task(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of detached tasks still running when the grace period ran out.
        stuck: usize,
    },

    /// OS signal listeners could not be installed.
    #[error("failed to install shutdown signal handler: {0}")]
    SignalHandler(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use retryvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::SignalHandler(_) => "runtime_signal_handler",
        }
    }
}

/// A cancellable wait was interrupted by its cancellation token.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cancelled")]
pub struct Cancelled;

/// # Failure of a single attempt.
///
/// Recorded internally by the retry loop; it only reaches the caller wrapped in the
/// terminal [`RetryError`].
#[derive(Error, Debug)]
pub enum AttemptError<E> {
    /// The operation returned an error.
    #[error("attempt failed: {0}")]
    Failed(#[source] E),

    /// The attempt exceeded the per-attempt timeout and was dropped.
    #[error("attempt timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl<E> AttemptError<E> {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AttemptError::Failed(_) => "attempt_failed",
            AttemptError::Timeout { .. } => "attempt_timeout",
        }
    }

    /// The operation's own error, if the attempt did not time out.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            AttemptError::Failed(e) => Some(e),
            AttemptError::Timeout { .. } => None,
        }
    }

    /// Consumes the attempt error and returns the operation's own error, if any.
    pub fn into_source(self) -> Option<E> {
        match self {
            AttemptError::Failed(e) => Some(e),
            AttemptError::Timeout { .. } => None,
        }
    }
}

/// # Terminal failure of a retry call.
///
/// Exactly one terminal outcome is produced per call: the success value, or one of
/// these variants. `Exhausted` ("gave up") and `Cancelled` ("abandoned by the caller")
/// are deliberately distinct.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    #[error("retry exhausted after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made (equals the policy's attempt budget).
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last: AttemptError<E>,
    },

    /// An attempt failed with an error classified as non-retryable.
    #[error("non-retryable failure on attempt {attempt}: {error}")]
    Fatal {
        /// Attempt number (1-based) that produced the error.
        attempt: u32,
        /// The failure that stopped the call.
        #[source]
        error: AttemptError<E>,
    },

    /// The cancellation token fired during an attempt or during the delay.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Number of attempts started before cancellation.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use retryvisor::RetryError;
    ///
    /// let err: RetryError<std::io::Error> = RetryError::Cancelled { attempts: 1 };
    /// assert_eq!(err.as_label(), "retry_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Exhausted { .. } => "retry_exhausted",
            RetryError::Fatal { .. } => "retry_fatal",
            RetryError::Cancelled { .. } => "retry_cancelled",
        }
    }

    /// Number of attempts started before the call ended.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts } => {
                *attempts
            }
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    /// True if every permitted attempt failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// True if the call was abandoned through its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// True if an error was classified as non-retryable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::Fatal { .. })
    }

    /// The failure of the last attempt, if the call did not end by cancellation.
    pub fn last_attempt(&self) -> Option<&AttemptError<E>> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Fatal { error, .. } => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Consumes the error and returns the operation's last own error, if any.
    ///
    /// Returns `None` on cancellation and when the last attempt timed out.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => last.into_source(),
            RetryError::Fatal { error, .. } => error.into_source(),
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// # Failure of a detached task.
///
/// Never returned to the code that spawned the task; only handed to its observer.
#[derive(Error, Debug)]
pub enum DetachedFailure<E> {
    /// The operation returned an error.
    #[error("detached task {task:?} failed: {error}")]
    Failed {
        /// Name of the detached task.
        task: Arc<str>,
        /// The operation's error.
        #[source]
        error: E,
    },

    /// The operation panicked; the panic was caught.
    #[error("detached task {task:?} panicked: {message}")]
    Panicked {
        /// Name of the detached task.
        task: Arc<str>,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl<E> DetachedFailure<E> {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DetachedFailure::Failed { .. } => "detached_failed",
            DetachedFailure::Panicked { .. } => "detached_panicked",
        }
    }

    /// Name of the task that failed.
    pub fn task(&self) -> &str {
        match self {
            DetachedFailure::Failed { task, .. } | DetachedFailure::Panicked { task, .. } => task,
        }
    }

    /// The operation's error, unless the task panicked.
    pub fn into_error(self) -> Option<E> {
        match self {
            DetachedFailure::Failed { error, .. } => Some(error),
            DetachedFailure::Panicked { .. } => None,
        }
    }
}

/// # Ready-made error for operations.
///
/// Splits failures into retryable ([`TaskError::Fail`]) and fatal ([`TaskError::Fatal`]).
/// Pass [`TaskError::is_retryable`] to [`Retry::run_if`](crate::Retry::run_if) so that fatal
/// errors stop the retry loop on the first occurrence.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Failure that may go away on retry.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Programming or configuration defect; retrying cannot help.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Retryable failure with the given message.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Non-retryable failure with the given message.
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
        }
    }

    /// Indicates whether retrying could help.
    ///
    /// # Example
    /// ```
    /// use retryvisor::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}
