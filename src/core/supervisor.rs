//! # Supervisor: command interface over the registry, pid store and event bus.
//!
//! The [`Supervisor`] is what a host application talks to. It is created by
//! [`SupervisorBuilder`](crate::SupervisorBuilder), which reconciles pid
//! records left by a previous run before anything is started, and it is torn
//! down explicitly with [`Supervisor::shutdown`].
//!
//! ## Architecture
//! ```text
//! host ──► Supervisor ──► Registry ──► Runner(key) ──► worker process
//!              │              ▲            │
//!              │          watchdog         ├──► PidStore (pid records)
//!              │                           └──► Bus ──► listener ──► SubscriberSet
//!              └──► PidStore::kill_all / kill_key (emergency sweep)
//! ```
//!
//! ## Shutdown path
//! ```text
//! run_until_signal() ─► wait_for_shutdown_signal()
//!                     └► shutdown():
//!                          runtime_token.cancel()   → watchdog exits
//!                          registry.stop_all()      → every worker stopped (escalating)
//!                          listener_token.cancel()  → pending events flushed to subscribers
//!                          SubscriberSet::shutdown  → subscriber queues drained
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use botvisor::{BotArgs, ExchangeConfig, SupervisorBuilder, SupervisorConfig, WorkerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::from_env()?;
//!     let sup = SupervisorBuilder::new(cfg).build();
//!     let mut events = sup.subscribe();
//!
//!     let config = WorkerConfig::new(
//!         ExchangeConfig::default(),
//!         BotArgs {
//!             ticker: "BTC".into(),
//!             amount_per_level: 25.0,
//!             min_spread: 0.002,
//!             maker_only: true,
//!             ttl: 30.0,
//!         },
//!     );
//!     let pid = sup.start("owner", &config).await?;
//!     println!("worker pid {pid}");
//!
//!     for line in sup.read_logs("owner", 100).await {
//!         println!("{line}");
//!     }
//!     if let Ok(ev) = events.try_recv() {
//!         println!("{:?} key={:?}", ev.kind, ev.key);
//!     }
//!
//!     sup.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::SupervisorConfig;
use super::registry::Registry;
use super::shutdown;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::PidStore;
use crate::protocol::WorkerConfig;
use crate::subscribers::SubscriberSet;

/// Snapshot returned by [`Supervisor::status`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    /// True while the worker process is alive.
    pub running: bool,
    /// Pid of the current process handle (also after a crash, until the next start/stop).
    pub pid: Option<u32>,
}

/// Background tasks owned by the supervisor.
#[derive(Default)]
pub(crate) struct Background {
    pub(crate) watchdog: Option<JoinHandle<()>>,
    pub(crate) listener: Option<JoinHandle<()>>,
}

/// Coordinates per-key workers, their pid records, and event delivery.
pub struct Supervisor {
    cfg: Arc<SupervisorConfig>,
    bus: Bus,
    registry: Arc<Registry>,
    store: Arc<PidStore>,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    background: Mutex<Background>,
}

impl Supervisor {
    pub(crate) fn new_internal(
        cfg: Arc<SupervisorConfig>,
        bus: Bus,
        registry: Arc<Registry>,
        store: Arc<PidStore>,
        runtime_token: CancellationToken,
        listener_token: CancellationToken,
        background: Background,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry,
            store,
            runtime_token,
            listener_token,
            background: Mutex::new(background),
        }
    }

    /// Returns a builder for configuring a supervisor.
    pub fn builder(cfg: SupervisorConfig) -> super::SupervisorBuilder {
        super::SupervisorBuilder::new(cfg)
    }

    /// Starts (or restarts) the worker for `key` with `config`. Returns its pid.
    pub async fn start(&self, key: &str, config: &WorkerConfig) -> Result<u32, SupervisorError> {
        self.registry.start(key, config).await
    }

    /// Stops the worker for `key`. Returns false for a key that was never started.
    pub async fn stop(&self, key: &str) -> bool {
        self.registry.stop(key).await
    }

    /// Reports whether the worker for `key` is running.
    ///
    /// A status poll counts as activity: it resets the idle clock.
    pub async fn status(&self, key: &str) -> WorkerStatus {
        match self.registry.get(key).await {
            Some(runner) => {
                runner.touch();
                WorkerStatus {
                    running: runner.is_alive(),
                    pid: runner.pid(),
                }
            }
            None => WorkerStatus::default(),
        }
    }

    /// Removes and returns up to `max_lines` buffered log lines of `key`, oldest first.
    pub async fn read_logs(&self, key: &str, max_lines: usize) -> Vec<String> {
        match self.registry.get(key).await {
            Some(runner) => runner.read_logs(max_lines),
            None => Vec::new(),
        }
    }

    /// Resets the idle clock of `key`.
    pub async fn touch(&self, key: &str) {
        self.registry.touch(key).await;
    }

    /// Stops every known worker.
    pub async fn stop_all(&self) -> HashMap<String, bool> {
        self.registry.stop_all().await
    }

    /// Terminates every process found in the pid store, including ones this
    /// supervisor never started. Returns the pids confirmed terminated.
    pub async fn kill_all(&self) -> Vec<u32> {
        let pids = self.store.kill_all().await;
        let joined = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.bus
            .publish(Event::new(EventKind::KillAllCompleted).with_reason(joined));
        pids
    }

    /// Stops the worker for `key`, then terminates whatever process is still
    /// recorded for it, including one left by a previous supervisor run.
    ///
    /// Returns false only if a recorded process survived SIGKILL.
    pub async fn kill_key(&self, key: &str) -> bool {
        self.registry.stop(key).await;
        self.store.kill_key(key).await
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &PidStore {
        &self.store
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Raw receiver of supervisor events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT, then shuts down.
    pub async fn run_until_signal(&self) -> std::io::Result<HashMap<String, bool>> {
        shutdown::wait_for_shutdown_signal().await?;
        tracing::info!("shutdown signal received");
        Ok(self.shutdown().await)
    }

    /// Stops the watchdog and every worker, then flushes events to subscribers.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> HashMap<String, bool> {
        self.runtime_token.cancel();
        let watchdog = self.lock_background().watchdog.take();
        if let Some(handle) = watchdog {
            let _ = handle.await;
        }

        let stopped = self.registry.stop_all().await;

        self.listener_token.cancel();
        let listener = self.lock_background().listener.take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        stopped
    }

    fn lock_background(&self) -> std::sync::MutexGuard<'_, Background> {
        self.background.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled,
/// then delivers what is still queued and shuts the set down.
pub(crate) fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(&ev),
                            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}
