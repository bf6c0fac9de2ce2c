//! # Retry: bounded re-execution of an operation.
//!
//! A [`Retry`] describes one kind of retried call: its name (for events), its
//! [`RetryPolicy`], the cancellation token it honors and the executor it sleeps on.
//! [`Retry::run`] drives the loop:
//!
//! ```text
//! Pending
//!   └─► Attempting ──► run_once(op(), timeout)
//!          │
//!          ├─ Ok(v)                      ─► Succeeded(v)            (terminal)
//!          ├─ token cancelled            ─► Cancelled               (terminal)
//!          └─ Err(e) ─► AttemptFailed
//!                ├─ not retryable        ─► Fatal                   (terminal)
//!                ├─ attempt == max       ─► Exhausted               (terminal)
//!                └─ else:
//!                     ├─ publish BackoffScheduled
//!                     ├─ sleep(backoff.delay_after(attempt)) (cancellable)
//!                     │     └─ cancelled ─► Cancelled           (terminal)
//!                     └─ Attempting (attempt + 1)
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially**; attempt `n+1` starts only after attempt `n` failed
//!   and the delay elapsed.
//! - A success returns immediately: no further attempts, no delay.
//! - `max_attempts = 1` never sleeps.
//! - Timeouts are always retryable; other errors go through the predicate given to
//!   [`Retry::run_if`] ([`Retry::run`] retries every error).

use std::{fmt::Display, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        delay::sleep_cancellable,
        executor::{Executor, TokioExecutor},
        runner::{AttemptCtx, AttemptOutcome, failure_reason, run_once},
    },
    error::{AttemptError, RetryError},
    events::{Bus, Event, EventKind},
    policies::RetryPolicy,
};

/// Configured retry call.
///
/// Cheap to clone; one `Retry` can drive any number of independent calls.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use retryvisor::{Retry, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let calls = AtomicU32::new(0);
/// let value = Retry::new("flaky")
///     .with_policy(RetryPolicy::fixed(3, Duration::from_millis(1)))
///     .run(|| async {
///         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err("not yet")
///         } else {
///             Ok(42)
///         }
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(value, 42);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
#[derive(Clone)]
pub struct Retry {
    name: Arc<str>,
    policy: RetryPolicy,
    token: CancellationToken,
    executor: Arc<dyn Executor>,
    bus: Option<Bus>,
}

impl Retry {
    /// Standalone retry call: default policy, a fresh (never cancelled) token,
    /// tokio executor, no event publishing.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            policy: RetryPolicy::default(),
            token: CancellationToken::new(),
            executor: Arc::new(TokioExecutor::new()),
            bus: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cancels the call (during an attempt or a delay) when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Publishes lifecycle events on `bus`.
    #[must_use]
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs `op` until it succeeds, the attempt budget is spent, or the token fires.
    ///
    /// Every error is treated as retryable.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(op, |_: &E| true).await
    }

    /// Like [`run`](Self::run), but an error for which `should_retry` returns `false`
    /// ends the call at once with [`RetryError::Fatal`].
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        mut op: F,
        mut should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: FnMut(&E) -> bool,
    {
        let ctx = AttemptCtx {
            name: &self.name,
            token: &self.token,
            timeout: self.policy.attempt_timeout(),
            bus: self.bus.as_ref(),
        };
        let max_attempts = self.policy.attempts();
        let mut attempt: u32 = 0;

        loop {
            if self.token.is_cancelled() {
                return Err(self.cancelled(&ctx, attempt));
            }

            attempt += 1;
            let err = match run_once(op(), &ctx, attempt).await {
                AttemptOutcome::Succeeded(value) => return Ok(value),
                AttemptOutcome::Cancelled => return Err(self.cancelled(&ctx, attempt)),
                AttemptOutcome::Failed(err) => err,
            };

            let retryable = match &err {
                AttemptError::Failed(e) => should_retry(e),
                AttemptError::Timeout { .. } => true,
            };
            if !retryable {
                ctx.emit(|| {
                    Event::new(EventKind::RetryFatal)
                        .with_attempt(attempt)
                        .with_reason(failure_reason(&err))
                });
                return Err(RetryError::Fatal {
                    attempt,
                    error: err,
                });
            }
            if attempt >= max_attempts {
                ctx.emit(|| {
                    Event::new(EventKind::RetryExhausted)
                        .with_attempt(attempt)
                        .with_reason(failure_reason(&err))
                });
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.policy.backoff.delay_after(attempt);
            ctx.emit(|| {
                Event::new(EventKind::BackoffScheduled)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(failure_reason(&err))
            });
            if sleep_cancellable(self.executor.as_ref(), delay, &self.token)
                .await
                .is_err()
            {
                return Err(self.cancelled(&ctx, attempt));
            }
        }
    }

    fn cancelled<E>(&self, ctx: &AttemptCtx<'_>, attempts: u32) -> RetryError<E> {
        ctx.emit(|| Event::new(EventKind::RetryCancelled).with_attempt(attempts));
        RetryError::Cancelled { attempts }
    }
}

/// Runs `op` under `policy`, retrying every error, until success, exhaustion or
/// cancellation of `token`.
///
/// Shorthand for a standalone [`Retry`] without events.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    Retry::new("retry")
        .with_policy(*policy)
        .with_cancellation(token.clone())
        .run(op)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    /// Tokio executor that counts sleeps.
    #[derive(Default)]
    struct CountingExecutor {
        sleeps: AtomicU32,
    }

    impl Executor for CountingExecutor {
        fn spawn(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
            tokio::spawn(fut)
        }

        fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
            self.sleeps.fetch_add(1, Ordering::SeqCst);
            Box::pin(tokio::time::sleep(delay))
        }
    }

    fn counting(policy: RetryPolicy) -> (Retry, Arc<CountingExecutor>) {
        let exec = Arc::new(CountingExecutor::default());
        let retry = Retry::new("test")
            .with_policy(policy)
            .with_executor(exec.clone());
        (retry, exec)
    }

    #[tokio::test(start_paused = true)]
    async fn fails_twice_then_returns_42_after_two_delays() {
        let (retry, exec) = counting(RetryPolicy::fixed(3, Duration::from_millis(200)));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let value = retry
            .run(|| async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(TaskError::fail("boom")),
                    _ => Ok(42),
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(exec.sleeps.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_is_exhausted_after_n_attempts() {
        for n in 1..=5u32 {
            let (retry, exec) = counting(RetryPolicy::fixed(n, Duration::from_millis(200)));
            let calls = AtomicU32::new(0);

            let err = retry
                .run(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TaskError::fail("boom"))
                })
                .await
                .expect_err("never succeeds");

            assert!(err.is_exhausted());
            assert_eq!(err.attempts(), n);
            assert_eq!(calls.load(Ordering::SeqCst), n);
            assert_eq!(exec.sleeps.load(Ordering::SeqCst), n - 1);
            assert_eq!(err.into_source(), Some(TaskError::fail("boom")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_never_sleeps() {
        let (retry, exec) = counting(RetryPolicy::default());
        let value = retry.run(|| async { Ok::<_, TaskError>("ok") }).await;
        assert_eq!(value.ok(), Some("ok"));
        assert_eq!(exec.sleeps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_never_sleeps() {
        let (retry, exec) = counting(RetryPolicy::once());
        let err = retry
            .run(|| async { Err::<(), _>(TaskError::fail("boom")) })
            .await
            .expect_err("fails");
        assert_eq!(err.attempts(), 1);
        assert_eq!(exec.sleeps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_stops_immediately() {
        let (retry, exec) = counting(RetryPolicy::fixed(5, Duration::from_millis(10)));
        let calls = AtomicU32::new(0);

        let err = retry
            .run_if(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TaskError::fatal("bad config"))
                },
                TaskError::is_retryable,
            )
            .await
            .expect_err("fatal");

        assert!(err.is_fatal());
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(exec.sleeps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempt_is_retried() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(10))
            .with_timeout(Some(Duration::from_millis(50)));
        let calls = AtomicU32::new(0);

        let value = Retry::new("slow")
            .with_policy(policy)
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok::<_, TaskError>(7)
            })
            .await
            .expect("second attempt is fast");

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_delay_skips_next_attempt() {
        let token = CancellationToken::new();
        let (retry, _exec) = counting(RetryPolicy::fixed(3, Duration::from_millis(200)));
        let retry = retry.with_cancellation(token.clone());
        let calls = AtomicU32::new(0);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::fail("boom"))
            })
            .await
            .expect_err("cancelled");

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_attempt_stops_at_once() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let err = Retry::new("hang")
            .with_cancellation(token)
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, TaskError>(())
            })
            .await
            .expect_err("cancelled");

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_makes_no_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let err = retry(&RetryPolicy::default(), &token, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        })
        .await
        .expect_err("cancelled");

        assert_eq!(err.attempts(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_attempt_lifecycle() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let calls = AtomicU32::new(0);

        let _ = Retry::new("fetch")
            .with_policy(RetryPolicy::fixed(2, Duration::from_millis(5)))
            .with_bus(bus)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::fail("boom"))
            })
            .await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.task.as_deref(), Some("fetch"));
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::AttemptStarting,
                EventKind::AttemptFailed,
                EventKind::BackoffScheduled,
                EventKind::AttemptStarting,
                EventKind::AttemptFailed,
                EventKind::RetryExhausted,
            ]
        );
    }
}
