//! # botvisor
//!
//! **Botvisor** supervises one long-running worker process per logical key
//! (an owner account, a user session, ...). It spawns the worker, hands it a
//! typed config over stdin, relays the worker's log lines into a bounded
//! buffer, stops it with an escalating ladder, and records its pid on disk so
//! a restarted supervisor can clean up what the previous one left behind.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   host: start(key, cfg) / stop(key) / status(key) / read_logs(key, n) / kill_key(key) / kill_all()
//!            │
//! ┌──────────▼────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                           │
//! │  - Registry (key → Runner, lazy creation)                             │
//! │  - PidStore (one JSON record per key, cleaned up at build)            │
//! │  - idle watchdog (optional, STOP_ON_SILENCE_SEC)                      │
//! │  - Bus + SubscriberSet (lifecycle events)                             │
//! └──────┬──────────────────────┬──────────────────────┬──────────────────┘
//!        ▼                      ▼                      ▼
//!   ┌──────────┐           ┌──────────┐           ┌──────────┐
//!   │ Runner A │           │ Runner B │           │ Runner C │
//!   │ LogRelay │           │ LogRelay │           │ LogRelay │
//!   └──┬───▲───┘           └──┬───▲───┘           └──┬───▲───┘
//! stdin│   │stdout/stderr     │   │                  │   │
//!      ▼   │                  ▼   │                  ▼   │
//!   botvisor-worker        botvisor-worker        botvisor-worker
//!   (Worker + Bot)         (Worker + Bot)         (Worker + Bot)
//! ```
//!
//! ### Worker protocol
//! ```text
//! supervisor → worker (stdin, JSON lines):  {"type":"start","key":..,"config":{..}}
//!                                           {"type":"stop"}   (or EOF)
//! worker → supervisor (stdout, JSON lines): {"ts_ms":..,"level":"INFO","target":..,"message":..}
//! worker → supervisor (stderr):             raw text, relayed as-is
//! exit codes:                               0 ok/signal, 1 crash, 2 orphaned
//! ```
//!
//! ### Stop ladder
//! ```text
//! Stop frame + EOF ─► wait 3s ─► SIGTERM ─► wait 1.5s ─► SIGKILL ─► wait 0.5s
//!   └─► always: relay drained, pid record removed, runner Idle
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Start/stop/status per key, escalating stop, idle watchdog.     | [`Supervisor`], [`Registry`], [`Runner`]     |
//! | **Identity**      | Durable pid records, stale cleanup, emergency kill-all.        | [`PidStore`], [`PidRecord`]                  |
//! | **Log relay**     | Bounded per-worker buffer fed from the worker's pipes.         | [`LogRelay`], [`LogBuffer`]                  |
//! | **Worker**        | Child-side runtime: handshake, cooperative stop, orphan exit.  | [`Worker`], [`Bot`], [`ForwardLayer`]        |
//! | **Subscriber API**| Hook into lifecycle events (logging, alerting, metrics).       | [`Subscribe`], [`Event`], [`EventKind`]      |
//! | **Errors**        | Typed errors for the supervisor, the worker and config.        | [`SupervisorError`], [`WorkerError`]         |
//! | **Configuration** | Centralized settings with environment overrides.               | [`SupervisorConfig`], [`WorkerCommand`]      |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use botvisor::{BotArgs, ExchangeConfig, Supervisor, SupervisorConfig, WorkerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::from_env()?;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn botvisor::Subscribe>> = vec![Arc::new(botvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn botvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!
//!     let config = WorkerConfig::new(
//!         ExchangeConfig { use_testnet: true, ..ExchangeConfig::default() },
//!         BotArgs {
//!             ticker: "BTC".into(),
//!             amount_per_level: 25.0,
//!             min_spread: 0.002,
//!             maker_only: true,
//!             ttl: 30.0,
//!         },
//!     );
//!     sup.start("owner", &config).await?;
//!
//!     let status = sup.status("owner").await;
//!     println!("running={} pid={:?}", status.running, status.pid);
//!
//!     sup.stop("owner").await;
//!     sup.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod identity;
mod os;
pub mod protocol;
mod relay;
mod subscribers;
pub mod worker;

// ---- Public re-exports ----

pub use core::{
    Escalation, Registry, Runner, RunnerPhase, StopReport, Supervisor, SupervisorBuilder,
    SupervisorConfig, WorkerCommand, WorkerExit, WorkerStatus, ENV_IDLE_TIMEOUT, ENV_PID_DIR,
    ENV_WORKER_BIN,
};
pub use error::{ConfigError, SupervisorError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use identity::{decode_key, encode_key, PidRecord, PidStore};
pub use os::is_alive;
pub use protocol::{BotArgs, ControlFrame, ExchangeConfig, LogFrame, LogLevel, WorkerConfig};
pub use relay::{LogBuffer, LogRelay};
pub use subscribers::{Subscribe, SubscriberSet};
pub use worker::{Bot, ForwardLayer, Worker};

// Optional: expose a simple built-in logger subscriber.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
