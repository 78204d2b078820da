//! Process identity store: durable `key → pid` records.
//!
//! - [`PidRecord`] the persisted record;
//! - [`PidStore`] file-per-key store with stale-record cleanup and kill-all.

mod record;
mod store;

pub use record::{decode_key, encode_key, PidRecord};
pub use store::PidStore;
