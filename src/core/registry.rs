//! # Registry: logical key → [`Runner`].
//!
//! Runners are created lazily on first `start` and kept afterwards (their log
//! buffer outlives the process), so a key stays known once it has been used.
//!
//! ## Architecture
//! ```text
//! start(key, cfg) ──► write lock: lookup-or-create ──► Runner::start (outside the lock)
//! stop(key)       ──► read lock: lookup ─────────────► Runner::stop
//! watchdog        ──► read lock: snapshot ───────────► Runner::stop for idle runners
//! ```
//!
//! ## Rules
//! - The map lock is never held across a runner operation.
//! - Per-key serialization is the runner's job (its lifecycle lock).
//! - Unknown keys are no-ops: `stop` returns false, `touch` does nothing.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::runner::{Runner, RunnerContext};
use crate::error::SupervisorError;
use crate::protocol::WorkerConfig;

/// Map of active runners, shared by the supervisor and the idle watchdog.
pub struct Registry {
    runners: RwLock<HashMap<String, Arc<Runner>>>,
    ctx: Arc<RunnerContext>,
    runtime_token: CancellationToken,
}

impl Registry {
    pub(crate) fn new(ctx: Arc<RunnerContext>, runtime_token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            runners: RwLock::new(HashMap::new()),
            ctx,
            runtime_token,
        })
    }

    /// Starts (or restarts) the worker for `key`. Returns its pid.
    pub async fn start(&self, key: &str, config: &WorkerConfig) -> Result<u32, SupervisorError> {
        let runner = {
            let mut runners = self.runners.write().await;
            Arc::clone(
                runners
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Runner::new(key, Arc::clone(&self.ctx)))),
            )
        };
        runner.start(config).await
    }

    /// Stops the worker for `key`. Returns false if the key was never started.
    pub async fn stop(&self, key: &str) -> bool {
        let Some(runner) = self.get(key).await else {
            return false;
        };
        runner.stop(self.ctx.cfg.stop_timeout).await;
        true
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Runner>> {
        self.runners.read().await.get(key).cloned()
    }

    /// Resets the idle clock of `key`, if known.
    pub async fn touch(&self, key: &str) {
        if let Some(runner) = self.get(key).await {
            runner.touch();
        }
    }

    /// Stops every known runner concurrently.
    pub async fn stop_all(&self) -> HashMap<String, bool> {
        let keys = self.keys().await;
        let results = join_all(keys.iter().map(|key| self.stop(key))).await;
        keys.into_iter().zip(results).collect()
    }

    /// Returns the sorted list of known keys.
    pub async fn keys(&self) -> Vec<String> {
        let runners = self.runners.read().await;
        let mut keys: Vec<String> = runners.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns true if no key was ever started.
    pub async fn is_empty(&self) -> bool {
        self.runners.read().await.is_empty()
    }

    /// Snapshot of all runners, for sweeps.
    pub(crate) async fn runners(&self) -> Vec<Arc<Runner>> {
        self.runners.read().await.values().cloned().collect()
    }

    pub(crate) fn runtime_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    pub(crate) fn context(&self) -> &RunnerContext {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SupervisorConfig;
    use crate::events::Bus;
    use crate::identity::PidStore;

    fn registry(dir: &std::path::Path) -> Arc<Registry> {
        let cfg = SupervisorConfig {
            pid_dir: dir.to_path_buf(),
            ..SupervisorConfig::default()
        };
        let ctx = Arc::new(RunnerContext {
            store: Arc::new(PidStore::new(dir, "test-")),
            cfg: Arc::new(cfg),
            bus: Bus::new(16),
        });
        Registry::new(ctx, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_unknown_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());

        assert!(!reg.stop("ghost").await);
        reg.touch("ghost").await;
        assert!(reg.get("ghost").await.is_none());
        assert!(reg.is_empty().await);
        assert!(reg.stop_all().await.is_empty());
    }
}
