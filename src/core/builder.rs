use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    config::SupervisorConfig,
    executor::{Executor, TokioExecutor},
    supervisor::Supervisor,
};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    executor: Option<Arc<dyn Executor>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            executor: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the executor used for detached tasks and retry delays
    /// (default: [`TokioExecutor`] on the current runtime).
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the supervisor and starts its event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let semaphore = self
            .cfg
            .detached_limit()
            .map(Semaphore::new)
            .map(Arc::new);
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(TokioExecutor::new()));

        let sup = Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            executor,
            semaphore,
            TaskTracker::new(),
            CancellationToken::new(),
        ));
        sup.spawn_listener(subs);
        sup
    }
}
