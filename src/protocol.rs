//! # Wire protocol between the supervisor and a worker process.
//!
//! Both directions are newline-delimited JSON:
//!
//! ```text
//!   supervisor ── stdin ──►  worker        ControlFrame::Start { key, config }   (exactly once, first)
//!                                          ControlFrame::Stop                    (cooperative stop)
//!                                          <EOF>                                 (also a stop)
//!
//!   supervisor ◄── stdout ── worker        LogFrame { ts_ms, level, target, message }   (one per line)
//!   supervisor ◄── stderr ── worker        raw text (panics, runtime diagnostics)
//! ```
//!
//! The config travels over stdin rather than argv/env so key material never
//! shows up in `ps` output or `/proc/<pid>/environ`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clean exit: the run loop returned or a termination signal was handled.
pub const EXIT_OK: i32 = 0;
/// The bot failed (error or panic) or the handshake did not complete.
pub const EXIT_CRASH: i32 = 1;
/// The supervisor that spawned the worker is gone.
pub const EXIT_ORPHANED: i32 = 2;

/// Logical key of the worker (informational; the authoritative key is in the start frame).
pub const ENV_KEY: &str = "BOTVISOR_KEY";
/// Pid of the supervisor; the worker exits when its parent stops matching it.
pub const ENV_PARENT_PID: &str = "BOTVISOR_PARENT_PID";
/// Minimum level forwarded by the worker (`trace` .. `error`).
pub const ENV_LOG_LEVEL: &str = "BOTVISOR_LOG_LEVEL";

/// Exchange connection settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Owner key; may be absent when trading through an agent.
    pub private_key: Option<String>,
    #[serde(default)]
    pub use_testnet: bool,
    #[serde(default)]
    pub use_agent: bool,
    /// Agent key used to sign on the owner's behalf.
    pub agent_private_key: Option<String>,
}

impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("use_testnet", &self.use_testnet)
            .field("use_agent", &self.use_agent)
            .field(
                "agent_private_key",
                &self.agent_private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Trading-loop parameters. Opaque to the supervisor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BotArgs {
    pub ticker: String,
    pub amount_per_level: f64,
    pub min_spread: f64,
    #[serde(default)]
    pub maker_only: bool,
    /// Quote time-to-live in seconds.
    pub ttl: f64,
}

/// Immutable, versioned worker configuration.
///
/// Passed by value across the process boundary; holds no live handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub version: u32,
    pub exchange: ExchangeConfig,
    pub bot: BotArgs,
}

impl WorkerConfig {
    /// Current config schema version.
    pub const VERSION: u32 = 1;

    /// Builds a config stamped with the current [`VERSION`](Self::VERSION).
    pub fn new(exchange: ExchangeConfig, bot: BotArgs) -> Self {
        Self {
            version: Self::VERSION,
            exchange,
            bot,
        }
    }

    /// Returns true if this build of the worker understands the config.
    #[inline]
    pub fn is_supported(&self) -> bool {
        self.version == Self::VERSION
    }
}

/// Supervisor → worker message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// First frame: who the worker is and what to run.
    Start { key: String, config: WorkerConfig },
    /// Cooperative stop request.
    Stop,
}

impl ControlFrame {
    /// Encodes the frame as one JSON line (trailing `\n` included).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decodes one line (trailing whitespace ignored).
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

/// Severity of a forwarded log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// Worker → supervisor log record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogFrame {
    /// Unix time in milliseconds.
    pub ts_ms: i64,
    pub level: LogLevel,
    #[serde(default)]
    pub target: String,
    pub message: String,
}

impl LogFrame {
    /// Renders the frame as `"<ts> <LEVEL> <message>"`.
    pub fn render(&self) -> String {
        let ts = DateTime::<Utc>::from_timestamp_millis(self.ts_ms)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| self.ts_ms.to_string());
        format!("{ts} {} {}", self.level.as_str(), self.message)
    }
}

/// Renders one raw output line for the log buffer.
///
/// Valid [`LogFrame`]s are formatted; anything else (plain text, invalid
/// UTF-8, truncated JSON) is converted lossily so no line is lost.
pub fn render_line(raw: &[u8]) -> String {
    let raw = trim_line_end(raw);
    match serde_json::from_slice::<LogFrame>(raw) {
        Ok(frame) => frame.render(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn trim_line_end(mut raw: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = raw {
        raw = rest;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> WorkerConfig {
        WorkerConfig::new(
            ExchangeConfig {
                private_key: Some("0xdeadbeef".into()),
                use_testnet: true,
                use_agent: false,
                agent_private_key: None,
            },
            BotArgs {
                ticker: "PURR/USDC".into(),
                amount_per_level: 12.5,
                min_spread: 0.004,
                maker_only: true,
                ttl: 20.0,
            },
        )
    }

    #[test]
    fn test_start_frame_is_single_line() {
        let frame = ControlFrame::Start {
            key: "user:abc".into(),
            config: sample_config(),
        };
        let line = frame.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(ControlFrame::from_line(&line).unwrap(), frame);
    }

    #[test]
    fn test_stop_frame_wire_shape() {
        assert_eq!(ControlFrame::Stop.to_line().unwrap(), "{\"type\":\"stop\"}\n");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let dbg = format!("{:?}", sample_config());
        assert!(!dbg.contains("deadbeef"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_version_check() {
        let mut cfg = sample_config();
        assert!(cfg.is_supported());
        cfg.version = 7;
        assert!(!cfg.is_supported());
    }

    #[test]
    fn test_render_frame() {
        let frame = LogFrame {
            ts_ms: 0,
            level: LogLevel::Warn,
            target: "bot".into(),
            message: "spread too wide".into(),
        };
        let raw = serde_json::to_vec(&frame).unwrap();
        assert_eq!(
            render_line(&raw),
            "1970-01-01 00:00:00.000 WARN spread too wide"
        );
    }

    #[test]
    fn test_render_plain_text_verbatim() {
        assert_eq!(render_line(b"thread 'main' panicked\r\n"), "thread 'main' panicked");
        assert_eq!(render_line(b"{\"ts_ms\": 1, \"lev"), "{\"ts_ms\": 1, \"lev");
    }

    #[test]
    fn test_render_invalid_utf8_not_dropped() {
        let line = render_line(&[b'o', b'k', 0xff, b'!']);
        assert!(line.starts_with("ok"));
        assert!(line.ends_with('!'));
        assert!(line.contains('\u{fffd}'));
    }
}
