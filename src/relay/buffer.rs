//! Bounded FIFO line buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Ring of the most recent log lines.
///
/// ### Rules
/// - Never grows beyond `capacity` (min 1).
/// - A push into a full buffer evicts the oldest line; pushes never block.
/// - Reads are destructive and oldest-first.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl LogBuffer {
    /// Creates an empty buffer holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Appends a line, evicting the oldest one if the buffer is full.
    pub fn push(&self, line: String) {
        let mut lines = self.lock();
        if lines.len() >= self.capacity {
            lines.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        lines.push_back(line);
    }

    /// Removes and returns up to `max_lines` lines, oldest first.
    pub fn drain(&self, max_lines: usize) -> Vec<String> {
        let mut lines = self.lock();
        let n = max_lines.min(lines.len());
        lines.drain(..n).collect()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total lines evicted since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // A poisoned buffer still holds valid lines.
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let buf = LogBuffer::new(10);
        for i in 0..3 {
            buf.push(format!("line {i}"));
        }
        assert_eq!(buf.drain(10), vec!["line 0", "line 1", "line 2"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let buf = LogBuffer::new(3);
        for i in 0..4 {
            buf.push(format!("line {i}"));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.evicted(), 1);
        assert_eq!(buf.drain(10), vec!["line 1", "line 2", "line 3"]);
        assert!(buf.drain(10).is_empty());
    }

    #[test]
    fn test_partial_drain_leaves_remainder() {
        let buf = LogBuffer::new(10);
        for i in 0..5 {
            buf.push(i.to_string());
        }
        assert_eq!(buf.drain(2), vec!["0", "1"]);
        assert_eq!(buf.drain(2), vec!["2", "3"]);
        assert_eq!(buf.drain(2), vec!["4"]);
        assert_eq!(buf.drain(0), Vec::<String>::new());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let buf = LogBuffer::new(0);
        buf.push("a".into());
        buf.push("b".into());
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.drain(5), vec!["b"]);
    }
}
