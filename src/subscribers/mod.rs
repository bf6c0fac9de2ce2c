//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for reacting to runtime events; [`SubscriberSet`]
//! fans events out to all registered subscribers; [`LogWriter`] is the built-in
//! subscriber that turns events into `tracing` records.
//!
//! ```text
//!   Retry / Detached ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                  │
//!                                                  ┌───────────────┼──────────┐
//!                                                  ▼               ▼          ▼
//!                                              LogWriter        Metrics     Custom
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
