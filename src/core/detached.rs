//! # Detached (fire-and-forget) execution.
//!
//! A detached task runs independently of the code that started it. Its outcome never
//! travels back through the caller's control flow:
//!
//! ```text
//! supervise_detached(op, &token, on_error) ──► executor.spawn(wrapper) ──► DetachedHandle (returned at once)
//!
//! wrapper:
//!   ├─► acquire permit (optional, cancellable)
//!   ├─► op (panic-guarded, cancellable)
//!   │     ├─ Ok(_)     ─► DetachedCompleted            (observer untouched)
//!   │     ├─ Err(e)    ─► DetachedFailed   ─► on_error(Failed { e })
//!   │     ├─ panic     ─► DetachedPanicked ─► on_error(Panicked { msg })
//!   │     └─ cancelled ─► DetachedCancelled            (observer untouched)
//!   └─► drop permit
//! ```
//!
//! ## Rules
//! - The caller is never blocked: spawning only hands a future to the executor.
//! - The observer is `FnOnce`, so it runs **at most once**, and only on failure.
//! - A panic in the operation or in the observer is caught; nothing reaches the
//!   executor's fault handler.
//! - A detached task is never retried.

use std::{fmt::Display, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use tokio::{select, sync::Semaphore, task::JoinHandle, time};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    core::executor::{Executor, TokioExecutor},
    error::DetachedFailure,
    events::{Bus, Event, EventKind},
    subscribers::panic_message,
};

/// Callback receiving the terminal failure of a detached task.
pub type ErrorObserver<E> = Box<dyn FnOnce(DetachedFailure<E>) + Send + 'static>;

/// Handle to a running detached task.
///
/// Dropping the handle does **not** stop the task.
#[derive(Debug)]
pub struct DetachedHandle {
    name: Arc<str>,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl DetachedHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests cancellation; the operation is dropped at its next suspension point.
    ///
    /// Cancellation is not a failure: the observer is not called.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The token that cancels this task.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the task (including its observer call) has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the task (including its observer call) has finished.
    pub async fn join(self) {
        if let Err(err) = self.join.await {
            tracing::debug!(task = %self.name, error = %err, "detached task did not run to completion");
        }
    }
}

/// Everything a detached task needs besides the operation itself.
pub(crate) struct DetachedCtx {
    pub name: Arc<str>,
    pub token: CancellationToken,
    pub executor: Arc<dyn Executor>,
    pub bus: Option<Bus>,
    pub semaphore: Option<Arc<Semaphore>>,
    pub tracker: Option<TaskTracker>,
}

impl DetachedCtx {
    /// Context for a detached task outside any supervisor, cancelled with `parent`.
    pub fn standalone(name: Arc<str>, parent: &CancellationToken) -> Self {
        Self {
            name,
            token: parent.child_token(),
            executor: Arc::new(TokioExecutor::new()),
            bus: None,
            semaphore: None,
            tracker: None,
        }
    }
}

/// Spawns `op` detached and returns its handle without waiting.
pub(crate) fn spawn_detached<T, E, Fut>(
    ctx: DetachedCtx,
    op: Fut,
    on_error: Option<ErrorObserver<E>>,
) -> DetachedHandle
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let DetachedCtx {
        name,
        token,
        executor,
        bus,
        semaphore,
        tracker,
    } = ctx;

    let emit = {
        let bus = bus.clone();
        let name = Arc::clone(&name);
        move |ev: Event| {
            if let Some(bus) = &bus {
                bus.publish(ev.with_task(Arc::clone(&name)));
            }
        }
    };
    emit(Event::new(EventKind::DetachedSpawned));

    let task_name = Arc::clone(&name);
    let task_token = token.clone();
    let wrapper = async move {
        let _permit = match semaphore {
            Some(sem) => {
                select! {
                    biased;
                    _ = task_token.cancelled() => {
                        emit(Event::new(EventKind::DetachedCancelled));
                        return;
                    }
                    permit = sem.acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_closed) => {
                            emit(Event::new(EventKind::DetachedCancelled));
                            return;
                        }
                    },
                }
            }
            None => None,
        };

        let started = time::Instant::now();
        let outcome = select! {
            biased;
            _ = task_token.cancelled() => None,
            res = AssertUnwindSafe(op).catch_unwind() => Some(res),
        };

        let failure = match outcome {
            None => {
                emit(Event::new(EventKind::DetachedCancelled));
                return;
            }
            Some(Ok(Ok(_))) => {
                emit(Event::new(EventKind::DetachedCompleted).with_elapsed(started.elapsed()));
                return;
            }
            Some(Ok(Err(error))) => {
                emit(
                    Event::new(EventKind::DetachedFailed)
                        .with_elapsed(started.elapsed())
                        .with_reason(error.to_string()),
                );
                DetachedFailure::Failed {
                    task: Arc::clone(&task_name),
                    error,
                }
            }
            Some(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                emit(Event::new(EventKind::DetachedPanicked).with_reason(message.as_str()));
                DetachedFailure::Panicked {
                    task: Arc::clone(&task_name),
                    message,
                }
            }
        };

        if let Some(observer) = on_error {
            notify(&task_name, observer, failure);
        }
    };

    let fut: BoxFuture<'static, ()> = match tracker {
        Some(tracker) => Box::pin(tracker.track_future(wrapper)),
        None => Box::pin(wrapper),
    };
    let join = executor.spawn(fut);

    DetachedHandle { name, token, join }
}

/// Hands `failure` to `observer`, containing a panicking observer.
fn notify<E>(task: &str, observer: ErrorObserver<E>, failure: DetachedFailure<E>) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || observer(failure))) {
        tracing::warn!(task, info = %panic_message(payload.as_ref()), "detached error observer panicked");
    }
}

/// Runs `op` detached from the caller on the current tokio runtime.
///
/// Returns immediately. If `op` fails (or panics), `on_error` receives the failure
/// exactly once; with no observer the failure is discarded. Success is not reported.
///
/// The task runs under a child of `token`: cancelling `token` (or the returned
/// handle) drops `op` without calling `on_error`.
///
/// # Example
/// ```rust
/// use retryvisor::{supervise_detached, DetachedFailure, TaskError};
/// use tokio::sync::oneshot;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, rx) = oneshot::channel();
/// let _handle = supervise_detached(
///     async { Err::<(), _>(TaskError::fail("smtp down")) },
///     &CancellationToken::new(),
///     Some(Box::new(move |f: DetachedFailure<TaskError>| {
///         let _ = tx.send(f.into_error());
///     })),
/// );
/// assert_eq!(rx.await.unwrap(), Some(TaskError::fail("smtp down")));
/// # }
/// ```
pub fn supervise_detached<T, E, Fut>(
    op: Fut,
    token: &CancellationToken,
    on_error: Option<ErrorObserver<E>>,
) -> DetachedHandle
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    spawn_detached(
        DetachedCtx::standalone(Arc::from("detached"), token),
        op,
        on_error,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Seen = Arc<Mutex<Vec<String>>>;

    fn recording(seen: &Seen) -> Option<ErrorObserver<TaskError>> {
        let seen = Arc::clone(seen);
        Some(Box::new(move |f: DetachedFailure<TaskError>| {
            seen.lock().unwrap().push(f.to_string());
        }))
    }

    #[tokio::test]
    async fn returns_before_operation_completes() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let handle = supervise_detached(
            async move {
                let _ = release_rx.await;
                let _ = done_tx.send(());
                Ok::<_, TaskError>(())
            },
            &CancellationToken::new(),
            None,
        );

        assert!(!handle.is_finished());
        release_tx.send(()).expect("task still waiting");
        done_rx.await.expect("task completed");
        handle.join().await;
    }

    #[tokio::test]
    async fn failure_reaches_observer_once() {
        let seen: Seen = Arc::default();
        let handle = supervise_detached(
            async { Err::<(), _>(TaskError::fail("boom")) },
            &CancellationToken::new(),
            recording(&seen),
        );
        handle.join().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("boom"), "{}", seen[0]);
    }

    #[tokio::test]
    async fn success_never_calls_observer() {
        let seen: Seen = Arc::default();
        supervise_detached(
            async { Ok::<_, TaskError>(1) },
            &CancellationToken::new(),
            recording(&seen),
        )
            .join()
            .await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_observer_discards_failure() {
        let handle = supervise_detached(
            async { Err::<(), _>(TaskError::fail("ignored")) },
            &CancellationToken::new(),
            None,
        );
        handle.join().await;
    }

    #[tokio::test]
    async fn panic_is_reported_as_failure() {
        let (tx, rx) = oneshot::channel();
        let handle = supervise_detached(
            async {
                if true {
                    panic!("kaboom");
                }
                Ok::<(), TaskError>(())
            },
            &CancellationToken::new(),
            Some(Box::new(move |f: DetachedFailure<TaskError>| {
                let _ = tx.send(f);
            })),
        );
        handle.join().await;

        match rx.await.expect("observer called") {
            DetachedFailure::Panicked { message, .. } => assert_eq!(message, "kaboom"),
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[tokio::test]
    async fn panicking_observer_is_contained() {
        let handle = supervise_detached(
            async { Err::<(), _>(TaskError::fail("boom")) },
            &CancellationToken::new(),
            Some(Box::new(|_f: DetachedFailure<TaskError>| {
                let buggy = true;
                if buggy {
                    panic!("observer bug");
                }
            })),
        );
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_calls_observer() {
        let seen: Seen = Arc::default();
        let handle = supervise_detached(
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err::<(), _>(TaskError::fail("late"))
            },
            &CancellationToken::new(),
            recording(&seen),
        );
        handle.cancel();
        handle.join().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_token_cancels_without_calling_observer() {
        let parent = CancellationToken::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen: Seen = Arc::default();

        let ctx = DetachedCtx {
            bus: Some(bus),
            ..DetachedCtx::standalone(Arc::from("scoped"), &parent)
        };
        let handle = spawn_detached(
            ctx,
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err::<(), _>(TaskError::fail("late"))
            },
            recording(&seen),
        );

        parent.cancel();
        assert!(handle.cancellation_token().is_cancelled());
        handle.join().await;

        assert!(seen.lock().unwrap().is_empty());
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, vec![EventKind::DetachedSpawned, EventKind::DetachedCancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn semaphore_limits_concurrency() {
        let sem = Arc::new(Semaphore::new(1));
        let running = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let ctx = DetachedCtx {
                    semaphore: Some(Arc::clone(&sem)),
                    ..DetachedCtx::standalone(Arc::from(format!("job-{i}")), &CancellationToken::new())
                };
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                spawn_detached::<(), TaskError, _>(
                    ctx,
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    },
                    None,
                )
            })
            .collect();

        for h in handles {
            h.join().await;
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
