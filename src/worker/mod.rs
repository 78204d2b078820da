//! # Worker runtime: the child side of the supervisor protocol.
//!
//! ```text
//! stdin  ──► Start{key, config} ──► factory(key, config) ──► Bot
//!        └─► Stop | EOF ──────────► stop token cancelled ──► Bot::run returns
//! stdout ◄── LogFrame JSON lines (ForwardLayer)
//! ```
//!
//! ## Exit codes
//! - [`EXIT_OK`]: the bot returned, or a termination signal arrived
//! - [`EXIT_CRASH`]: handshake, config, resolve, connect or run failed, or the bot panicked
//! - [`EXIT_ORPHANED`]: the supervisor went away
//!
//! ## Example
//! ```rust,no_run
//! use botvisor::worker::forward;
//! use botvisor::{Bot, Worker, WorkerConfig, WorkerError};
//! # use async_trait::async_trait;
//! # use tokio_util::sync::CancellationToken;
//! # struct Paper;
//! # #[async_trait]
//! # impl Bot for Paper {
//! #     async fn resolve_target(&mut self) -> Result<(), WorkerError> { Ok(()) }
//! #     async fn connect(&mut self) -> Result<(), WorkerError> { Ok(()) }
//! #     async fn run(&mut self, stop: CancellationToken) -> Result<(), WorkerError> {
//! #         stop.cancelled().await;
//! #         Ok(())
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let _ = forward::init(forward::level_from_env());
//!     let code = Worker::new(|_key: &str, _cfg: WorkerConfig| Ok(Paper)).run().await;
//!     std::process::exit(code);
//! }
//! ```

mod bot;
pub mod forward;
mod parent;

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::shutdown::wait_for_shutdown_signal;
use crate::error::WorkerError;
use crate::protocol::{ControlFrame, WorkerConfig, EXIT_CRASH, EXIT_OK, EXIT_ORPHANED};
use crate::subscribers::panic_message;

pub use bot::Bot;
pub use forward::ForwardLayer;
pub use parent::PARENT_POLL;

/// Default time allowed for the start frame to arrive.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Worker entrypoint, generic over the bot factory.
pub struct Worker<F> {
    factory: F,
    handshake_timeout: Duration,
    parent_poll: Duration,
}

impl<F, B> Worker<F>
where
    F: FnOnce(&str, WorkerConfig) -> Result<B, WorkerError>,
    B: Bot,
{
    /// Creates a worker building its bot with `factory(key, config)`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            parent_poll: PARENT_POLL,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_parent_poll(mut self, poll: Duration) -> Self {
        self.parent_poll = poll.max(Duration::from_millis(10));
        self
    }

    /// Runs the worker on the process stdin. Returns the exit code to use.
    pub async fn run(self) -> i32 {
        let parent = parent::ParentWatch::from_env();
        let poll = self.parent_poll;
        let main = self.serve(tokio::io::stdin());

        tokio::select! {
            code = finish(main) => code,
            _ = signalled() => {
                tracing::info!("termination signal received, exiting");
                EXIT_OK
            }
            _ = parent::wait_orphaned(parent, poll) => {
                tracing::warn!(?parent, "supervisor is gone, exiting");
                EXIT_ORPHANED
            }
        }
    }

    /// Handshake, then resolve → connect → run until stopped.
    pub(crate) async fn serve<R>(self, input: R) -> Result<(), WorkerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut lines = BufReader::new(input).lines();
        let (key, config) = match self.handshake(&mut lines).await? {
            Some(start) => start,
            None => {
                tracing::debug!("stop requested before start");
                return Ok(());
            }
        };
        if !config.is_supported() {
            return Err(WorkerError::Config(format!(
                "unsupported config version {} (expected {})",
                config.version,
                WorkerConfig::VERSION
            )));
        }

        let stop = CancellationToken::new();
        tokio::spawn(watch_stop(lines, stop.clone()));

        let mut bot = (self.factory)(&key, config)?;
        tracing::debug!(key = %key, "worker started");

        let drive = async {
            bot.resolve_target().await?;
            bot.connect().await?;
            bot.run(stop).await
        };
        std::panic::AssertUnwindSafe(drive)
            .catch_unwind()
            .await
            .map_err(|payload| WorkerError::Panicked(panic_message(&*payload)))??;

        tracing::info!(key = %key, "worker stopped");
        Ok(())
    }

    /// Reads the start frame. `None` if a `Stop` frame came first.
    async fn handshake<R>(
        &self,
        lines: &mut Lines<BufReader<R>>,
    ) -> Result<Option<(String, WorkerConfig)>, WorkerError>
    where
        R: AsyncRead + Unpin,
    {
        let line = time::timeout(self.handshake_timeout, lines.next_line())
            .await
            .map_err(|_| WorkerError::Handshake("timed out waiting for start frame".into()))?
            .map_err(|e| WorkerError::Handshake(e.to_string()))?
            .ok_or_else(|| WorkerError::Handshake("stdin closed before start frame".into()))?;

        match ControlFrame::from_line(&line) {
            Ok(ControlFrame::Start { key, config }) => Ok(Some((key, config))),
            Ok(ControlFrame::Stop) => Ok(None),
            Err(e) => Err(WorkerError::Handshake(format!("invalid start frame: {e}"))),
        }
    }
}

/// Cancels `stop` on a `Stop` frame, EOF, or a read error.
async fn watch_stop<R>(mut lines: Lines<BufReader<R>>, stop: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ControlFrame::from_line(&line) {
                Ok(ControlFrame::Stop) => {
                    tracing::debug!("stop frame received");
                    break;
                }
                Ok(ControlFrame::Start { .. }) => {
                    tracing::debug!("ignoring repeated start frame");
                }
                Err(e) => tracing::debug!(error = %e, "ignoring unreadable control line"),
            },
            Ok(None) => {
                tracing::debug!("stdin closed");
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    stop.cancel();
}

/// Maps the serve result to an exit code, logging failures.
async fn finish(main: impl Future<Output = Result<(), WorkerError>>) -> i32 {
    match main.await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            tracing::error!(label = e.as_label(), "{}", e.as_message());
            EXIT_CRASH
        }
    }
}

/// Completes on a termination signal; pends forever if listeners cannot be installed.
async fn signalled() {
    if let Err(e) = wait_for_shutdown_signal().await {
        tracing::warn!(error = %e, "signal listeners unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BotArgs, ExchangeConfig};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncWriteExt, DuplexStream};

    #[derive(Clone, Copy)]
    enum Mode {
        Normal,
        FailConnect,
        Panic,
    }

    struct Probe {
        mode: Mode,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Bot for Probe {
        async fn resolve_target(&mut self) -> Result<(), WorkerError> {
            self.calls.lock().unwrap().push("resolve");
            Ok(())
        }

        async fn connect(&mut self) -> Result<(), WorkerError> {
            self.calls.lock().unwrap().push("connect");
            match self.mode {
                Mode::FailConnect => Err(WorkerError::Connect("refused".into())),
                _ => Ok(()),
            }
        }

        async fn run(&mut self, stop: CancellationToken) -> Result<(), WorkerError> {
            self.calls.lock().unwrap().push("run");
            if let Mode::Panic = self.mode {
                panic!("bot exploded");
            }
            stop.cancelled().await;
            self.calls.lock().unwrap().push("stopped");
            Ok(())
        }
    }

    fn start_line(version: u32) -> String {
        let mut config = WorkerConfig::new(
            ExchangeConfig::default(),
            BotArgs {
                ticker: "ETH".into(),
                amount_per_level: 5.0,
                min_spread: 0.001,
                maker_only: false,
                ttl: 10.0,
            },
        );
        config.version = version;
        ControlFrame::Start {
            key: "owner".into(),
            config,
        }
        .to_line()
        .unwrap()
    }

    fn worker(
        mode: Mode,
        calls: Arc<Mutex<Vec<&'static str>>>,
    ) -> Worker<impl FnOnce(&str, WorkerConfig) -> Result<Probe, WorkerError>> {
        Worker::new(move |key: &str, cfg: WorkerConfig| {
            assert_eq!(key, "owner");
            assert_eq!(cfg.bot.ticker, "ETH");
            Ok(Probe { mode, calls })
        })
        .with_handshake_timeout(Duration::from_millis(200))
    }

    async fn send(tx: &mut DuplexStream, line: &str) {
        tx.write_all(line.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_runs_until_stop_frame() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut tx, rx) = tokio::io::duplex(4096);
        let serve = tokio::spawn(worker(Mode::Normal, calls.clone()).serve(rx));

        send(&mut tx, &start_line(WorkerConfig::VERSION)).await;
        send(&mut tx, &ControlFrame::Stop.to_line().unwrap()).await;

        serve.await.unwrap().unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["resolve", "connect", "run", "stopped"]
        );
    }

    #[tokio::test]
    async fn test_eof_stops_the_bot() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut tx, rx) = tokio::io::duplex(4096);
        let serve = tokio::spawn(worker(Mode::Normal, calls.clone()).serve(rx));

        send(&mut tx, &start_line(WorkerConfig::VERSION)).await;
        drop(tx);

        serve.await.unwrap().unwrap();
        assert_eq!(calls.lock().unwrap().last(), Some(&"stopped"));
    }

    #[tokio::test]
    async fn test_unsupported_version_is_config_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut tx, rx) = tokio::io::duplex(4096);
        let serve = tokio::spawn(worker(Mode::Normal, calls.clone()).serve(rx));

        send(&mut tx, &start_line(WorkerConfig::VERSION + 1)).await;

        let err = serve.await.unwrap().unwrap_err();
        assert_eq!(err.as_label(), "worker_config");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_start_frame_times_out() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (_tx, rx) = tokio::io::duplex(4096);

        let err = worker(Mode::Normal, calls).serve(rx).await.unwrap_err();
        assert_eq!(err.as_label(), "worker_handshake");
    }

    #[tokio::test]
    async fn test_connect_failure_skips_run() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut tx, rx) = tokio::io::duplex(4096);
        let serve = tokio::spawn(worker(Mode::FailConnect, calls.clone()).serve(rx));

        send(&mut tx, &start_line(WorkerConfig::VERSION)).await;

        let err = serve.await.unwrap().unwrap_err();
        assert_eq!(err.as_label(), "worker_connect");
        assert_eq!(*calls.lock().unwrap(), vec!["resolve", "connect"]);
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut tx, rx) = tokio::io::duplex(4096);
        let serve = tokio::spawn(worker(Mode::Panic, calls).serve(rx));

        send(&mut tx, &start_line(WorkerConfig::VERSION)).await;

        match serve.await.unwrap() {
            Err(WorkerError::Panicked(msg)) => assert_eq!(msg, "bot exploded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finish_maps_exit_codes() {
        assert_eq!(finish(async { Ok(()) }).await, EXIT_OK);
        assert_eq!(
            finish(async { Err(WorkerError::Run("lost feed".into())) }).await,
            EXIT_CRASH
        );
    }
}
