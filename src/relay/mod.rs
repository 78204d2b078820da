//! # Log relay: worker output → bounded buffer → observer.
//!
//! ```text
//! worker stdout ──► drain task ──┐
//!                                ├──► LogBuffer (bounded FIFO) ──► read_and_drain(max)
//! worker stderr ──► drain task ──┘
//! ```
//!
//! ## Rules
//! - One producer per stream (the worker), one consumer (its drain task):
//!   lines of a stream keep their emission order.
//! - The buffer outlives individual worker processes; `attach` is called on
//!   every start, `shutdown` on every stop.
//! - Relay failures never reach the runner: a closed or broken stream just
//!   ends its drain task.

mod buffer;
mod drain;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use buffer::LogBuffer;

/// Drain tasks of the current worker process.
struct Drain {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Per-runner log relay.
pub struct LogRelay {
    buffer: Arc<LogBuffer>,
    poll: Duration,
    drain: Mutex<Option<Drain>>,
}

impl LogRelay {
    /// Creates a relay with a buffer of `capacity` lines; drain reads wait at most `poll`.
    pub fn new(capacity: usize, poll: Duration) -> Self {
        Self {
            buffer: Arc::new(LogBuffer::new(capacity)),
            poll,
            drain: Mutex::new(None),
        }
    }

    /// Starts draining a new worker's output streams.
    ///
    /// Any drain tasks from a previous process are cancelled first.
    pub fn attach<O, E>(&self, stdout: O, stderr: Option<E>)
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let token = CancellationToken::new();
        let mut tasks = vec![tokio::spawn(drain::drain_lines(
            stdout,
            Arc::clone(&self.buffer),
            token.clone(),
            self.poll,
            "stdout",
        ))];
        if let Some(stderr) = stderr {
            tasks.push(tokio::spawn(drain::drain_lines(
                stderr,
                Arc::clone(&self.buffer),
                token.clone(),
                self.poll,
                "stderr",
            )));
        }

        if let Some(old) = self.lock().replace(Drain { token, tasks }) {
            old.token.cancel();
        }
    }

    /// Stops the drain tasks.
    ///
    /// Waits up to `grace` for the streams to reach EOF so lines written right
    /// before the worker exited are kept, then cancels whatever is left.
    pub async fn shutdown(&self, grace: Duration) {
        let Some(Drain { token, tasks }) = self.lock().take() else {
            return;
        };
        let mut tasks = tasks;
        let all_done = async {
            for task in tasks.iter_mut() {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(grace, all_done).await.is_err() {
            token.cancel();
            for task in tasks {
                if !task.is_finished() {
                    let _ = task.await;
                }
            }
        }
    }

    /// Removes and returns up to `max_lines` buffered lines, oldest first.
    pub fn read_and_drain(&self, max_lines: usize) -> Vec<String> {
        self.buffer.drain(max_lines)
    }

    /// Number of lines waiting to be read.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Lines dropped because the buffer was full.
    pub fn evicted(&self) -> u64 {
        self.buffer.evicted()
    }

    /// Returns true while drain tasks are attached.
    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Drain>> {
        self.drain.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    #[tokio::test]
    async fn test_shutdown_keeps_lines_flushed_before_eof() {
        let relay = LogRelay::new(8, Duration::from_millis(20));
        let (mut out_tx, out_rx) = tokio::io::duplex(64);
        let (mut err_tx, err_rx) = tokio::io::duplex(64);
        relay.attach(out_rx, Some(err_rx));
        assert!(relay.is_attached());

        out_tx.write_all(b"last words\n").await.unwrap();
        err_tx.write_all(b"panicked at src/main.rs\n").await.unwrap();
        drop(out_tx);
        drop(err_tx);

        relay.shutdown(Duration::from_secs(1)).await;
        assert!(!relay.is_attached());

        let mut lines = relay.read_and_drain(10);
        lines.sort();
        assert_eq!(lines, vec!["last words", "panicked at src/main.rs"]);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_streams_held_open() {
        let relay = LogRelay::new(8, Duration::from_millis(20));
        // An orphaned grandchild can keep the pipe open after the worker dies.
        let (_out_tx, out_rx) = tokio::io::duplex(64);
        relay.attach::<_, DuplexStream>(out_rx, None);

        tokio::time::timeout(
            Duration::from_secs(1),
            relay.shutdown(Duration::from_millis(50)),
        )
        .await
        .expect("shutdown must be bounded");
        assert!(!relay.is_attached());
    }

    #[tokio::test]
    async fn test_shutdown_without_attach_is_noop() {
        let relay = LogRelay::new(8, Duration::from_millis(20));
        relay.shutdown(Duration::from_millis(10)).await;
        assert!(relay.is_empty());
    }
}
