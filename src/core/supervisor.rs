//! # Supervisor: retry calls, detached tasks, event delivery and graceful shutdown.
//!
//! The [`Supervisor`] owns the event bus, the subscriber fan-out, the executor, a
//! tracker of detached tasks and the root cancellation token. Every retry call and
//! detached task it creates runs under a child of that token, so one
//! [`shutdown`](Supervisor::shutdown) stops them all.
//!
//! ## High-level architecture
//! ```text
//!   sup.retry(name).run(op) ─────────────┐            (awaited by caller)
//!   sup.supervise_detached(name, op, cb) ─┤            (returns at once)
//!                                         ▼
//!                        publish(Event) ──► Bus ──► listener ──► SubscriberSet ──► subscribers
//!
//! Shutdown path:
//!   shutdown()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► runtime_token.cancel()   → aborts in-flight retries and detached tasks
//!     └─► wait detached tasks up to cfg.grace:
//!            ├─ all stopped → Bus.publish(AllStoppedWithin)
//!            └─ timeout     → Bus.publish(GraceExceeded), Err(GraceExceeded)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{DetachedFailure, RetryPolicy, Supervisor, SupervisorConfig, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         retry: RetryPolicy::fixed(3, Duration::from_millis(10)),
//!         grace: Duration::from_secs(1),
//!         ..SupervisorConfig::default()
//!     };
//!     let sup = Supervisor::builder(cfg).build();
//!
//!     let n = sup.retry("compute").run(|| async { Ok::<_, TaskError>(21 * 2) }).await?;
//!     assert_eq!(n, 42);
//!
//!     sup.supervise_detached(
//!         "audit",
//!         async { Err::<(), _>(TaskError::fail("audit sink down")) },
//!         Some(Box::new(|f: DetachedFailure<TaskError>| eprintln!("{f}"))),
//!     );
//!
//!     sup.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::{fmt::Display, sync::Arc};

use tokio::sync::{Semaphore, broadcast};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    builder::SupervisorBuilder,
    config::SupervisorConfig,
    detached::{DetachedCtx, DetachedHandle, ErrorObserver, spawn_detached},
    executor::Executor,
    retrier::Retry,
    shutdown,
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
};

/// Coordinates retry calls, detached tasks, event delivery and graceful shutdown.
///
/// # Drop
/// Dropping the last `Arc<Supervisor>` cancels its token: in-flight retry calls end
/// with [`RetryError::Cancelled`](crate::RetryError::Cancelled) and detached tasks are
/// dropped at once, with no grace period and no shutdown events. Await
/// [`shutdown`](Supervisor::shutdown) first for a graceful stop.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    executor: Arc<dyn Executor>,
    semaphore: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    runtime_token: CancellationToken,
    dropped: CancellationToken,
}

impl Supervisor {
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        executor: Arc<dyn Executor>,
        semaphore: Option<Arc<Semaphore>>,
        tracker: TaskTracker,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            executor,
            semaphore,
            tracker,
            runtime_token,
            dropped: CancellationToken::new(),
        }
    }

    /// Forwards bus events to the subscriber set until the supervisor is dropped.
    pub(super) fn spawn_listener(&self, subs: SubscriberSet) {
        if subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let dropped = self.dropped.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = rx.recv() => match res {
                        Ok(ev) => subs.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged behind the bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = dropped.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            subs.emit(&ev);
                        }
                        break;
                    }
                }
            }
            subs.shutdown().await;
        });
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Receiver for all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// A retry call pre-wired with the configured policy, this supervisor's executor
    /// and bus, and a child of the supervisor's cancellation token.
    ///
    /// Override the policy or the token on the returned [`Retry`] as needed; a
    /// replacement token should be a child of [`Supervisor::cancellation_token`] to
    /// keep shutdown effective.
    pub fn retry(&self, name: impl Into<Arc<str>>) -> Retry {
        Retry::new(name)
            .with_policy(self.cfg.retry_policy())
            .with_executor(Arc::clone(&self.executor))
            .with_bus(self.bus.clone())
            .with_cancellation(self.runtime_token.child_token())
    }

    /// Runs `op` detached; returns at once.
    ///
    /// A failure (or panic) of `op` is handed to `on_error` once, never to the caller.
    /// After shutdown started, the task is cancelled before it runs.
    pub fn supervise_detached<T, E, Fut>(
        &self,
        name: impl Into<Arc<str>>,
        op: Fut,
        on_error: Option<ErrorObserver<E>>,
    ) -> DetachedHandle
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let ctx = DetachedCtx {
            name: name.into(),
            token: self.runtime_token.child_token(),
            executor: Arc::clone(&self.executor),
            bus: Some(self.bus.clone()),
            semaphore: self.semaphore.clone(),
            tracker: Some(self.tracker.clone()),
        };
        spawn_detached(ctx, op, on_error)
    }

    /// Root token; cancelled by [`shutdown`](Self::shutdown).
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    /// Number of detached tasks still running.
    pub fn detached_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Cancels every retry call and detached task, then waits for detached tasks up
    /// to the configured grace period.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();
        self.tracker.close();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.tracker.len();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(format!("stuck={stuck}")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then runs [`shutdown`](Self::shutdown).
    pub async fn shutdown_on_signal(&self) -> Result<(), RuntimeError> {
        shutdown::wait_for_shutdown_signal().await?;
        self.shutdown().await
    }
}

impl Drop for Supervisor {
    /// Immediate cancellation of everything this supervisor started.
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.dropped.cancel();
    }
}
