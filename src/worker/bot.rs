use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Trading loop hosted by a worker process.
///
/// The worker calls the three stages in order and exits with
/// [`EXIT_CRASH`](crate::protocol::EXIT_CRASH) on the first error or panic.
///
/// ## Example
/// ```rust
/// use async_trait::async_trait;
/// use botvisor::{Bot, WorkerError};
/// use tokio_util::sync::CancellationToken;
///
/// struct Idle;
///
/// #[async_trait]
/// impl Bot for Idle {
///     async fn resolve_target(&mut self) -> Result<(), WorkerError> { Ok(()) }
///     async fn connect(&mut self) -> Result<(), WorkerError> { Ok(()) }
///     async fn run(&mut self, stop: CancellationToken) -> Result<(), WorkerError> {
///         stop.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Bot: Send {
    /// Resolves what to trade (market, account, ...).
    async fn resolve_target(&mut self) -> Result<(), WorkerError>;

    /// Opens the streaming connection.
    async fn connect(&mut self) -> Result<(), WorkerError>;

    /// Runs until `stop` is cancelled (cooperative stop) or the loop fails.
    async fn run(&mut self, stop: CancellationToken) -> Result<(), WorkerError>;
}
