//! # Forwarding layer: `tracing` events → `LogFrame` lines on stdout.
//!
//! Every event that passes the level filter becomes one JSON line:
//! ```text
//! {"ts_ms":1718000000123,"level":"INFO","target":"botvisor_worker","message":"tick 3 BTC"}
//! ```
//! Extra fields are appended to the message as `name=value`. Write failures
//! (closed pipe, supervisor gone) are swallowed: logging never kills the bot.

use std::fmt::{self, Write as _};
use std::io::Write;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::protocol::{LogFrame, LogLevel, ENV_LOG_LEVEL};

/// Level used when `BOTVISOR_LOG_LEVEL` is unset or invalid.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// A [`Layer`] writing each event as a [`LogFrame`] JSON line.
pub struct ForwardLayer<W> {
    make_writer: W,
}

impl ForwardLayer<fn() -> std::io::Stdout> {
    /// Layer writing to the process stdout.
    pub fn stdout() -> Self {
        Self {
            make_writer: std::io::stdout,
        }
    }
}

impl<W> ForwardLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl<S, W> Layer<S> for ForwardLayer<W>
where
    S: Subscriber,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let frame = LogFrame {
            ts_ms: chrono::Utc::now().timestamp_millis(),
            level: LogLevel::from(meta.level()),
            target: meta.target().to_string(),
            message: visitor.finish(),
        };
        let Ok(mut line) = serde_json::to_string(&frame) else {
            return;
        };
        line.push('\n');

        let mut writer = self.make_writer.make_writer();
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Collects the `message` field plus `name=value` pairs for the rest.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

/// Parses a level name (`trace` .. `error`, case-insensitive).
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse::<LevelFilter>().ok()
}

/// Level from `BOTVISOR_LOG_LEVEL`, or [`DEFAULT_LEVEL`].
pub fn level_from_env() -> LevelFilter {
    std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(DEFAULT_LEVEL)
}

/// Installs the forwarding layer on stdout as the global subscriber.
pub fn init(level: LevelFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(level)
        .with(ForwardLayer::stdout())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn frames(out: &Captured) -> Vec<LogFrame> {
        let raw = out.0.lock().unwrap().clone();
        String::from_utf8(raw)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_become_frames() {
        let out = Captured::default();
        let subscriber = tracing_subscriber::registry()
            .with(LevelFilter::INFO)
            .with(ForwardLayer::new(out.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "bot", "tick {}", 1);
            tracing::debug!("filtered out");
            tracing::warn!(coin = "BTC", "spread too wide");
        });

        let frames = frames(&out);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].level, LogLevel::Info);
        assert_eq!(frames[0].target, "bot");
        assert_eq!(frames[0].message, "tick 1");
        assert_eq!(frames[1].level, LogLevel::Warn);
        assert_eq!(frames[1].message, "spread too wide coin=BTC");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
