//! Supervisor core: configuration, runners, registry and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (built by
//! [`SupervisorBuilder`]), plus the [`Registry`]/[`Runner`] types it exposes.
//!
//! Internal modules:
//! - [`runner`]: owns one worker process (spawn, relay, escalating stop);
//! - [`registry`]: key → runner map;
//! - [`watchdog`]: stops workers idle for longer than the configured timeout;
//! - [`supervisor`]: command interface, event fan-out, shutdown;
//! - [`shutdown`]: OS termination signal handling.

mod builder;
mod config;
mod registry;
mod runner;
pub(crate) mod shutdown;
mod supervisor;
mod watchdog;

pub use builder::SupervisorBuilder;
pub use config::{SupervisorConfig, WorkerCommand, ENV_IDLE_TIMEOUT, ENV_PID_DIR, ENV_WORKER_BIN};
pub use registry::Registry;
pub use runner::{Escalation, Runner, RunnerPhase, StopReport, WorkerExit};
pub use supervisor::{Supervisor, WorkerStatus};
