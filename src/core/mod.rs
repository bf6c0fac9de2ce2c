//! Runtime core: retry loop, detached execution and supervisor lifecycle.
//!
//! Internal modules:
//! - [`runner`]: executes one attempt with timeout/cancellation and event publishing;
//! - [`retrier`]: the retry loop built on top of `runner`;
//! - [`detached`]: fire-and-forget execution with failure routed to an observer;
//! - [`delay`]: cancellable sleep;
//! - [`executor`]: the scheduler capability (`spawn` + `sleep`);
//! - [`supervisor`]: owns the bus, subscribers, detached tasks and shutdown;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod delay;
mod detached;
mod executor;
mod retrier;
mod runner;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use delay::delay;
pub use detached::{DetachedHandle, ErrorObserver, supervise_detached};
pub use executor::{Executor, TokioExecutor};
pub use retrier::{Retry, retry};
pub use supervisor::Supervisor;
