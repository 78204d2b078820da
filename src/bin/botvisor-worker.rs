//! botvisor worker
//!
//! Child process spawned by the supervisor, one per logical key. Reads its
//! config from stdin and runs a paper market-making loop: no orders leave the
//! process, each tick only logs the quote it would place.
//!
//! Usage:
//!   botvisor-worker --ticks 3 --interval-ms 200

use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use botvisor::worker::forward;
use botvisor::{Bot, BotArgs, ExchangeConfig, Worker, WorkerConfig, WorkerError};

#[derive(Parser, Clone, Debug)]
#[command(name = "botvisor-worker")]
#[command(about = "Paper trading worker driven by the botvisor supervisor")]
struct Args {
    /// Ticks to log before idling until stopped (0 = tick forever)
    #[arg(long, default_value = "0")]
    ticks: u64,

    /// Delay between ticks in milliseconds
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Fail the run loop after this many ticks
    #[arg(long)]
    fail_after: Option<u64>,
}

/// Quotes around a synthetic mid price without touching any exchange.
struct PaperBot {
    key: String,
    exchange: ExchangeConfig,
    bot: BotArgs,
    args: Args,
    mid: f64,
}

impl PaperBot {
    fn new(key: &str, config: WorkerConfig, args: Args) -> Self {
        Self {
            key: key.to_string(),
            exchange: config.exchange,
            bot: config.bot,
            args,
            mid: 0.0,
        }
    }
}

#[async_trait]
impl Bot for PaperBot {
    async fn resolve_target(&mut self) -> Result<(), WorkerError> {
        let coin = self.bot.ticker.trim();
        if coin.is_empty() {
            return Err(WorkerError::Resolve("empty ticker".into()));
        }
        self.mid = 100.0;
        tracing::debug!(
            key = %self.key,
            coin,
            testnet = self.exchange.use_testnet,
            "target resolved"
        );
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), WorkerError> {
        if self.exchange.use_agent && self.exchange.agent_private_key.is_none() {
            return Err(WorkerError::Connect("agent mode without agent key".into()));
        }
        tracing::debug!(key = %self.key, agent = self.exchange.use_agent, "paper feed connected");
        Ok(())
    }

    async fn run(&mut self, stop: CancellationToken) -> Result<(), WorkerError> {
        let interval = Duration::from_millis(self.args.interval_ms.max(1));
        let half_spread = self.bot.min_spread.max(0.0) / 2.0;
        let mut n = 0u64;

        loop {
            tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
            n += 1;
            let bid = self.mid * (1.0 - half_spread);
            let ask = self.mid * (1.0 + half_spread);
            tracing::info!(
                "tick {n} {} bid={bid:.4} ask={ask:.4} size={}",
                self.bot.ticker,
                self.bot.amount_per_level
            );

            if self.args.fail_after == Some(n) {
                return Err(WorkerError::Run(format!("simulated failure after {n} ticks")));
            }
            if self.args.ticks != 0 && n >= self.args.ticks {
                stop.cancelled().await;
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _ = forward::init(forward::level_from_env());

    let code = Worker::new(move |key: &str, config: WorkerConfig| {
        Ok(PaperBot::new(key, config, args))
    })
    .run()
    .await;
    std::process::exit(code);
}
