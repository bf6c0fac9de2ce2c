//! # Run a single attempt of a retried operation.
//!
//! - **Execute ONE attempt** of the operation
//! - **Apply timeout** if configured (wraps execution in `tokio::time::timeout`)
//! - **Race cancellation**: a cancelled token drops the attempt immediately
//! - **Publish events** for observability (starting/succeeded/failed/timeout)
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   AttemptStarting → op() → Ok(v)  → AttemptSucceeded
//!
//! Failure:
//!   AttemptStarting → op() → Err(e) → AttemptFailed
//!
//! Timeout:
//!   AttemptStarting → timeout exceeded → TimeoutHit → AttemptFailed
//!
//! Cancellation:
//!   AttemptStarting → token cancelled → (no terminal attempt event)
//! ```

use std::{fmt::Display, sync::Arc, time::Duration};

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    error::AttemptError,
    events::{Bus, Event, EventKind},
};

/// Result of one attempt.
pub(crate) enum AttemptOutcome<T, E> {
    Succeeded(T),
    Failed(AttemptError<E>),
    Cancelled,
}

/// Borrowed per-call context shared by every attempt of one retry call.
pub(crate) struct AttemptCtx<'a> {
    pub name: &'a Arc<str>,
    pub token: &'a CancellationToken,
    pub timeout: Option<Duration>,
    pub bus: Option<&'a Bus>,
}

impl AttemptCtx<'_> {
    /// Publishes the event built by `make`; the event is not built when there is no bus.
    pub fn emit(&self, make: impl FnOnce() -> Event) {
        if let Some(bus) = self.bus {
            bus.publish(make().with_task(Arc::clone(self.name)));
        }
    }
}

/// Executes attempt number `attempt` of `fut`.
///
/// Cancellation wins ties with completion (`biased` select), so a call whose token is
/// already cancelled never observes a late success.
pub(crate) async fn run_once<T, E, Fut>(
    fut: Fut,
    ctx: &AttemptCtx<'_>,
    attempt: u32,
) -> AttemptOutcome<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    ctx.emit(|| Event::new(EventKind::AttemptStarting).with_attempt(attempt));
    let started = time::Instant::now();

    let bounded = async {
        match ctx.timeout {
            Some(dur) => match time::timeout(dur, fut).await {
                Ok(res) => res.map_err(AttemptError::Failed),
                Err(_elapsed) => {
                    ctx.emit(|| {
                        Event::new(EventKind::TimeoutHit)
                            .with_attempt(attempt)
                            .with_timeout(dur)
                    });
                    Err(AttemptError::Timeout { timeout: dur })
                }
            },
            None => fut.await.map_err(AttemptError::Failed),
        }
    };

    let res = select! {
        biased;
        _ = ctx.token.cancelled() => return AttemptOutcome::Cancelled,
        res = bounded => res,
    };

    let elapsed = started.elapsed();
    match res {
        Ok(value) => {
            ctx.emit(|| {
                Event::new(EventKind::AttemptSucceeded)
                    .with_attempt(attempt)
                    .with_elapsed(elapsed)
            });
            AttemptOutcome::Succeeded(value)
        }
        Err(err) => {
            ctx.emit(|| {
                Event::new(EventKind::AttemptFailed)
                    .with_attempt(attempt)
                    .with_elapsed(elapsed)
                    .with_reason(failure_reason(&err))
            });
            AttemptOutcome::Failed(err)
        }
    }
}

/// The operation's own message, or the timeout description.
pub(crate) fn failure_reason<E: Display>(err: &AttemptError<E>) -> String {
    match err {
        AttemptError::Failed(e) => e.to_string(),
        AttemptError::Timeout { timeout } => format!("timed out after {timeout:?}"),
    }
}
