//! Orphan detection: a worker must not outlive its supervisor.
//!
//! Two facts are watched:
//! - the parent observed at startup (re-parenting means it died), and
//! - the supervisor pid from `BOTVISOR_PARENT_PID`, which differs from the
//!   parent when the worker command is a wrapper that does not `exec`.

use std::time::Duration;

use nix::unistd::getppid;

use crate::os;
use crate::protocol::ENV_PARENT_PID;

/// Interval between parent checks.
pub const PARENT_POLL: Duration = Duration::from_secs(1);

/// Processes the worker must not outlive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ParentWatch {
    parent: u32,
    supervisor: Option<u32>,
}

impl ParentWatch {
    /// Current parent plus the supervisor named by `BOTVISOR_PARENT_PID`, if set.
    pub(crate) fn from_env() -> Self {
        let supervisor = std::env::var(ENV_PARENT_PID)
            .ok()
            .and_then(|raw| raw.trim().parse().ok());
        Self {
            parent: current_parent(),
            supervisor,
        }
    }

    fn is_orphaned(&self) -> bool {
        if current_parent() != self.parent {
            return true;
        }
        self.supervisor.is_some_and(|pid| !os::is_alive(pid))
    }
}

fn current_parent() -> u32 {
    u32::try_from(getppid().as_raw()).unwrap_or(0)
}

/// Completes once the startup parent is gone or the supervisor has exited.
pub(crate) async fn wait_orphaned(watch: ParentWatch, poll: Duration) {
    let mut ticker = tokio::time::interval(poll);
    loop {
        ticker.tick().await;
        if watch.is_orphaned() {
            tracing::debug!(?watch, now = current_parent(), "parent changed");
            return;
        }
    }
}
