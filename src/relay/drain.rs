//! Background task moving worker output lines into a [`LogBuffer`].

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::buffer::LogBuffer;
use crate::protocol::render_line;

/// Longest line kept in one piece; longer output is split at this size.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads `reader` line by line into `buffer` until EOF, a read error, or cancellation.
///
/// Each read waits at most `poll`, so a cancelled token is noticed within one
/// poll interval even when the worker is silent. Partial lines survive a poll
/// timeout (`read_until` keeps what it already consumed in `raw`). A line
/// longer than [`MAX_LINE_BYTES`] is pushed in pieces, so a worker that never
/// writes a newline cannot grow the pending line without bound.
pub(crate) async fn drain_lines<R>(
    reader: R,
    buffer: Arc<LogBuffer>,
    token: CancellationToken,
    poll: Duration,
    stream: &'static str,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::with_capacity(256);
    let poll = poll.max(Duration::from_millis(1));

    loop {
        if token.is_cancelled() {
            break;
        }
        let room = (MAX_LINE_BYTES - raw.len()) as u64;
        let mut limited = (&mut reader).take(room);
        let read = limited.read_until(b'\n', &mut raw);
        match time::timeout(poll, read).await {
            Err(_elapsed) => continue,
            Ok(Ok(0)) => {
                if !raw.is_empty() {
                    buffer.push(render_line(&raw));
                }
                tracing::debug!(stream, "worker stream closed");
                break;
            }
            Ok(Ok(_)) if raw.ends_with(b"\n") || raw.len() >= MAX_LINE_BYTES => {
                buffer.push(render_line(&raw));
                raw.clear();
            }
            // Partial line at EOF; the next read returns 0 and flushes it.
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::debug!(stream, error = %e, "worker stream read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_drains_until_eof_in_order() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let buffer = Arc::new(LogBuffer::new(16));
        let task = tokio::spawn(drain_lines(
            rx,
            Arc::clone(&buffer),
            CancellationToken::new(),
            Duration::from_millis(20),
            "stdout",
        ));

        tx.write_all(b"one\ntwo\nthr").await.unwrap();
        tx.write_all(b"ee\nno newline").await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(buffer.drain(10), vec!["one", "two", "three", "no newline"]);
    }

    #[tokio::test]
    async fn test_cancel_stops_silent_stream() {
        let (_tx, rx) = tokio::io::duplex(64);
        let buffer = Arc::new(LogBuffer::new(16));
        let token = CancellationToken::new();
        let task = tokio::spawn(drain_lines(
            rx,
            Arc::clone(&buffer),
            token.clone(),
            Duration::from_millis(20),
            "stdout",
        ));

        token.cancel();
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("drain task did not observe cancellation")
            .unwrap();
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_output_is_split() {
        let (mut tx, rx) = tokio::io::duplex(4096);
        let buffer = Arc::new(LogBuffer::new(16));
        let task = tokio::spawn(drain_lines(
            rx,
            Arc::clone(&buffer),
            CancellationToken::new(),
            Duration::from_millis(50),
            "stderr",
        ));

        let total = 2 * MAX_LINE_BYTES + 100;
        tx.write_all(&vec![b'x'; total]).await.unwrap();
        tx.write_all(b"\nend\n").await.unwrap();
        drop(tx);
        task.await.unwrap();

        let lengths: Vec<usize> = buffer.drain(10).iter().map(String::len).collect();
        assert_eq!(lengths, vec![MAX_LINE_BYTES, MAX_LINE_BYTES, 100, 3]);
    }
}
