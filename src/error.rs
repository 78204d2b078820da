//! Error types used by the supervisor and by the worker runtime.
//!
//! This module defines three enums:
//!
//! - [`SupervisorError`]: a `start` request could not be satisfied.
//! - [`WorkerError`]: failures inside the worker process (reported through
//!   the log relay and the exit code, never returned across the process boundary).
//! - [`ConfigError`]: invalid environment-level configuration.
//!
//! Everything else the supervisor encounters (unknown keys, stop escalation,
//! relay I/O hiccups, pid-record I/O) degrades to booleans, empty results or
//! log lines instead of errors.
//!
//! All types provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use thiserror::Error;

/// # Errors produced by the supervisor.
///
/// Only conditions that make a `start` request impossible are surfaced; the
/// runner is left `Idle` when any of them is returned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The worker configuration could not be serialized into a control frame.
    #[error("failed to encode config for {key}: {source}")]
    Encode {
        /// Logical key of the worker.
        key: String,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The worker process could not be created.
    #[error("failed to spawn worker for {key}: {source}")]
    Spawn {
        /// Logical key of the worker.
        key: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process started but the config frame could not be delivered.
    #[error("failed to hand config to worker {key} (pid {pid}): {source}")]
    Handshake {
        /// Logical key of the worker.
        key: String,
        /// Pid of the half-started worker (already killed).
        pid: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The OS did not report a pid for the spawned child.
    #[error("worker for {key} exited before its pid could be read")]
    MissingPid {
        /// Logical key of the worker.
        key: String,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use botvisor::SupervisorError;
    ///
    /// let err = SupervisorError::MissingPid { key: "owner".into() };
    /// assert_eq!(err.as_label(), "supervisor_missing_pid");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Encode { .. } => "supervisor_encode",
            SupervisorError::Spawn { .. } => "supervisor_spawn",
            SupervisorError::Handshake { .. } => "supervisor_handshake",
            SupervisorError::MissingPid { .. } => "supervisor_missing_pid",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SupervisorError::Encode { key, source } => format!("encode: key={key} err={source}"),
            SupervisorError::Spawn { key, source } => format!("spawn: key={key} err={source}"),
            SupervisorError::Handshake { key, pid, source } => {
                format!("handshake: key={key} pid={pid} err={source}")
            }
            SupervisorError::MissingPid { key } => format!("missing pid: key={key}"),
        }
    }

    /// Logical key the failed request was made for.
    pub fn key(&self) -> &str {
        match self {
            SupervisorError::Encode { key, .. }
            | SupervisorError::Spawn { key, .. }
            | SupervisorError::Handshake { key, .. }
            | SupervisorError::MissingPid { key } => key,
        }
    }
}

/// # Errors produced inside the worker process.
///
/// Any of these ends the worker with [`EXIT_CRASH`](crate::protocol::EXIT_CRASH)
/// after being logged through the relay.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The start frame never arrived, or stdin was not a valid control stream.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The config was decoded but cannot be used (version mismatch, missing key material, ...).
    #[error("invalid config: {0}")]
    Config(String),

    /// Target resolution failed.
    #[error("resolve failed: {0}")]
    Resolve(String),

    /// The streaming connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The run loop returned an error.
    #[error("run loop failed: {0}")]
    Run(String),

    /// The bot panicked.
    #[error("bot panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use botvisor::WorkerError;
    ///
    /// let err = WorkerError::Connect("refused".into());
    /// assert_eq!(err.as_label(), "worker_connect");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Handshake(_) => "worker_handshake",
            WorkerError::Config(_) => "worker_config",
            WorkerError::Resolve(_) => "worker_resolve",
            WorkerError::Connect(_) => "worker_connect",
            WorkerError::Run(_) => "worker_run",
            WorkerError::Panicked(_) => "worker_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Handshake(e) => format!("handshake: {e}"),
            WorkerError::Config(e) => format!("config: {e}"),
            WorkerError::Resolve(e) => format!("resolve: {e}"),
            WorkerError::Connect(e) => format!("connect: {e}"),
            WorkerError::Run(e) => format!("run: {e}"),
            WorkerError::Panicked(e) => format!("panic: {e}"),
        }
    }
}

/// # Errors produced while reading environment configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidVar {
        /// Environment variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidVar { .. } => "config_invalid_var",
        }
    }
}
