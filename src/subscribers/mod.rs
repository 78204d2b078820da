//! # Event subscribers for the supervisor.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and (feature `logging`) the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Runner/Watchdog ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                         │
//!                                                       ┌─────────────────┼──────────┐
//!                                                       ▼                 ▼          ▼
//!                                                   LogWriter          Audit      Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
