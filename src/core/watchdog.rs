//! # Idle watchdog.
//!
//! Periodically stops workers nobody has touched for longer than
//! `idle_timeout`. Enabled only when the timeout is non-zero.
//!
//! ```text
//! every watchdog_interval:
//!   for runner in registry snapshot:
//!     alive && idle_for > idle_timeout ─► runner.stop_if_idle()
//!                                            (re-checked under the runner's lock,
//!                                             publishes IdleTimeout, then stops)
//! ```
//!
//! The loop ends when the registry's runtime token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::registry::Registry;

/// Spawns the sweep loop.
pub(crate) fn spawn(
    registry: Arc<Registry>,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_millis(10));
    tokio::spawn(async move {
        let token = registry.runtime_token().clone();
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let stopped = sweep_once(&registry, idle_timeout).await;
                    if !stopped.is_empty() {
                        tracing::debug!(?stopped, "idle sweep stopped workers");
                    }
                }
            }
        }
    })
}

/// Stops every idle runner once. Returns the keys that were stopped.
pub(crate) async fn sweep_once(registry: &Registry, idle_timeout: Duration) -> Vec<String> {
    let mut stopped = Vec::new();
    let stop_timeout = registry.context().cfg.stop_timeout;

    for runner in registry.runners().await {
        if !is_idle(runner.is_alive(), runner.idle_for(), idle_timeout) {
            continue;
        }
        if runner.stop_if_idle(idle_timeout, stop_timeout).await.is_some() {
            stopped.push(runner.key().to_string());
        }
    }
    stopped
}

#[inline]
pub(crate) fn is_idle(alive: bool, idle_for: Duration, idle_timeout: Duration) -> bool {
    alive && idle_for > idle_timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_idle() {
        let timeout = Duration::from_secs(60);
        assert!(is_idle(true, Duration::from_secs(61), timeout));
        assert!(!is_idle(true, Duration::from_secs(60), timeout));
        assert!(!is_idle(true, Duration::from_secs(5), timeout));
        assert!(!is_idle(false, Duration::from_secs(600), timeout));
    }
}
