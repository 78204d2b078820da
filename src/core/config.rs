//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor, and
//! [`WorkerCommand`] describing which program is spawned for each worker.
//!
//! ## Sentinel values
//! - `idle_timeout = 0s` → idle watchdog disabled
//! - `log_level = None` → worker default (`info`)
//!
//! ## Environment
//! [`SupervisorConfig::from_env`] reads:
//! - `STOP_ON_SILENCE_SEC`: idle timeout in seconds (`0`/unset disables)
//! - `BOTVISOR_PID_DIR`: directory of pid records (default: system temp dir)
//! - `BOTVISOR_WORKER_BIN`: worker program (default: `botvisor-worker` from `PATH`)

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Idle timeout variable (seconds).
pub const ENV_IDLE_TIMEOUT: &str = "STOP_ON_SILENCE_SEC";
/// Pid record directory variable.
pub const ENV_PID_DIR: &str = "BOTVISOR_PID_DIR";
/// Worker program variable.
pub const ENV_WORKER_BIN: &str = "BOTVISOR_WORKER_BIN";

/// Program spawned for every worker.
///
/// The config itself is never put on the command line; it is delivered on
/// the worker's stdin after spawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Executable path (or a name resolved through `PATH`).
    pub program: PathBuf,
    /// Extra arguments.
    pub args: Vec<OsString>,
    /// Extra environment variables.
    pub env: Vec<(OsString, OsString)>,
    /// Minimum level the worker forwards (`BOTVISOR_LOG_LEVEL`).
    pub log_level: Option<String>,
}

impl WorkerCommand {
    /// Default worker binary name.
    pub const DEFAULT_PROGRAM: &'static str = "botvisor-worker";

    /// A command running `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            log_level: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the worker's forwarded log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `idle_timeout`: stop workers with no heartbeat for this long (`0s` = disabled)
/// - `watchdog_interval`: period between idle sweeps
/// - `stop_timeout`: wait after the cooperative stop before SIGTERM
/// - `term_wait`: wait after SIGTERM before SIGKILL
/// - `kill_wait`: wait after SIGKILL before giving up
/// - `drain_grace`: time the relay gets to read trailing output during stop
/// - `drain_poll`: bounded wait of each relay read
/// - `log_capacity`: lines kept per worker (min 1)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `pid_dir` / `pid_prefix`: location and naming of pid records
/// - `sweep_term_wait` / `sweep_kill_wait`: ladder used by `kill_all`
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub idle_timeout: Duration,
    pub watchdog_interval: Duration,
    pub stop_timeout: Duration,
    pub term_wait: Duration,
    pub kill_wait: Duration,
    pub drain_grace: Duration,
    pub drain_poll: Duration,
    pub log_capacity: usize,
    pub bus_capacity: usize,
    pub pid_dir: PathBuf,
    pub pid_prefix: String,
    pub sweep_term_wait: Duration,
    pub sweep_kill_wait: Duration,
    pub worker: WorkerCommand,
}

impl SupervisorConfig {
    /// Returns the idle timeout as an `Option` (`None` = watchdog disabled).
    #[inline]
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout == Duration::ZERO {
            None
        } else {
            Some(self.idle_timeout)
        }
    }

    /// Upper bound of one `stop()` call with the configured timeouts.
    #[inline]
    pub fn stop_budget(&self) -> Duration {
        self.stop_timeout + self.term_wait + self.kill_wait + self.drain_grace
    }

    /// Default configuration overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_IDLE_TIMEOUT) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let secs: u64 = trimmed.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidVar {
                        var: ENV_IDLE_TIMEOUT,
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                cfg.idle_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(dir) = lookup(ENV_PID_DIR).filter(|v| !v.trim().is_empty()) {
            cfg.pid_dir = PathBuf::from(dir);
        }

        if let Some(bin) = lookup(ENV_WORKER_BIN).filter(|v| !v.trim().is_empty()) {
            cfg.worker.program = PathBuf::from(bin);
        }

        Ok(cfg)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `idle_timeout = 0s` (watchdog disabled)
    /// - `watchdog_interval = 5s`
    /// - `stop_timeout = 3s`, `term_wait = 1.5s`, `kill_wait = 0.5s`
    /// - `drain_grace = 250ms`, `drain_poll = 500ms`
    /// - `log_capacity = 2000`, `bus_capacity = 1024`
    /// - pid records in the system temp dir, prefixed `botvisor-`
    /// - `kill_all` ladder: 3s after SIGTERM, 2s after SIGKILL
    fn default() -> Self {
        Self {
            idle_timeout: Duration::ZERO,
            watchdog_interval: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(3),
            term_wait: Duration::from_millis(1500),
            kill_wait: Duration::from_millis(500),
            drain_grace: Duration::from_millis(250),
            drain_poll: Duration::from_millis(500),
            log_capacity: 2000,
            bus_capacity: 1024,
            pid_dir: std::env::temp_dir(),
            pid_prefix: "botvisor-".to_string(),
            sweep_term_wait: Duration::from_secs(3),
            sweep_kill_wait: Duration::from_secs(2),
            worker: WorkerCommand::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.idle_timeout(), None);
        assert_eq!(cfg.stop_budget(), Duration::from_millis(5250));
        assert_eq!(cfg.worker.program, PathBuf::from("botvisor-worker"));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = SupervisorConfig::from_lookup(lookup(&[
            (ENV_IDLE_TIMEOUT, "300"),
            (ENV_PID_DIR, "/var/run/bots"),
            (ENV_WORKER_BIN, "/opt/bots/worker"),
        ]))
        .unwrap();
        assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(cfg.pid_dir, PathBuf::from("/var/run/bots"));
        assert_eq!(cfg.worker.program, PathBuf::from("/opt/bots/worker"));
    }

    #[test]
    fn test_zero_and_blank_disable_watchdog() {
        for raw in ["0", "", "  "] {
            let cfg = SupervisorConfig::from_lookup(lookup(&[(ENV_IDLE_TIMEOUT, raw)])).unwrap();
            assert_eq!(cfg.idle_timeout(), None, "raw={raw:?}");
        }
    }

    #[test]
    fn test_invalid_idle_timeout_rejected() {
        let err = SupervisorConfig::from_lookup(lookup(&[(ENV_IDLE_TIMEOUT, "5m")])).unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_var");
        assert!(err.to_string().contains(ENV_IDLE_TIMEOUT));
    }
}
