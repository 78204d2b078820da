//! # LogWriter: lifecycle events as `tracing` records
//!
//! A subscriber that renders every [`Event`] through `tracing` under the
//! `botvisor::events` target. Install any `tracing` subscriber in the host
//! process to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  botvisor::events: [started] key="user:abc" pid=4242
//! WARN  botvisor::events: [sigterm] key="user:abc" pid=4242
//! INFO  botvisor::events: [stopped] key="user:abc" pid=4242 escalation=terminated elapsed_ms=4512
//! WARN  botvisor::events: [idle-timeout] key="owner" pid=31337 idle_ms=305120
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "botvisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::WorkerStarting => {
                tracing::debug!(target: TARGET, "[starting] key={key:?}");
            }
            EventKind::WorkerStarted => {
                tracing::info!(target: TARGET, "[started] key={key:?} pid={:?}", e.pid);
            }
            EventKind::WorkerSpawnFailed => {
                tracing::error!(target: TARGET, "[spawn-failed] key={key:?} err={:?}", e.reason);
            }
            EventKind::WorkerExited => {
                tracing::warn!(
                    target: TARGET,
                    "[exited] key={key:?} pid={:?} code={:?} signal={:?}",
                    e.pid, e.exit_code, e.reason
                );
            }
            EventKind::WorkerStopped => {
                tracing::info!(
                    target: TARGET,
                    "[stopped] key={key:?} pid={:?} escalation={} elapsed_ms={:?}",
                    e.pid,
                    e.reason.as_deref().unwrap_or("unknown"),
                    e.elapsed_ms
                );
            }
            EventKind::StopRequested => {
                tracing::debug!(target: TARGET, "[stop-requested] key={key:?} pid={:?}", e.pid);
            }
            EventKind::TermSent => {
                tracing::warn!(target: TARGET, "[sigterm] key={key:?} pid={:?}", e.pid);
            }
            EventKind::KillSent => {
                tracing::warn!(target: TARGET, "[sigkill] key={key:?} pid={:?}", e.pid);
            }
            EventKind::IdleTimeout => {
                tracing::warn!(
                    target: TARGET,
                    "[idle-timeout] key={key:?} pid={:?} idle_ms={:?}",
                    e.pid, e.elapsed_ms
                );
            }
            EventKind::StaleRecordsRemoved => {
                tracing::info!(target: TARGET, "[stale-records] keys={:?}", e.reason);
            }
            EventKind::KillAllCompleted => {
                tracing::warn!(target: TARGET, "[kill-all] pids={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    target: TARGET,
                    "[subscriber-overflow] subscriber={key} reason={:?}",
                    e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(
                    target: TARGET,
                    "[subscriber-panicked] subscriber={key} info={}",
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
