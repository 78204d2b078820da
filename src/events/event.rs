//! # Supervisor events.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Lifecycle**: a worker starting, started, failing to start, stopped
//! - **Escalation**: each rung of the stop ladder that was actually taken
//! - **Recovery**: idle-watchdog stops, stale pid records, kill-all sweeps
//! - **Subscriber**: overflow/panic of an event subscriber
//!
//! The [`Event`] struct carries the metadata (key, pid, exit code, ...).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use botvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerStopped)
//!     .with_key("user:abc")
//!     .with_pid(4242)
//!     .with_exit_code(0);
//!
//! assert_eq!(ev.kind, EventKind::WorkerStopped);
//! assert_eq!(ev.key.as_deref(), Some("user:abc"));
//! assert_eq!(ev.exit_code, Some(0));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `key` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `key` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// A runner is about to spawn a worker.
    ///
    /// Sets: `key`.
    WorkerStarting,

    /// Worker spawned and handed its config.
    ///
    /// Sets: `key`, `pid`.
    WorkerStarted,

    /// Spawn or handshake failed; the runner is idle again.
    ///
    /// Sets: `key`, `reason`.
    WorkerSpawnFailed,

    /// Worker exited on its own (observed by the reaper before any stop request).
    ///
    /// Sets: `key`, `pid`, `exit_code` (if any), `reason` (signal, if any).
    WorkerExited,

    /// Stop sequence finished; the runner is idle.
    ///
    /// Sets: `key`, `pid`, `exit_code` (if observed), `elapsed_ms`, `reason` (escalation level).
    WorkerStopped,

    // === Stop escalation ===
    /// Stop sequence began; cooperative stop frame sent.
    ///
    /// Sets: `key`, `pid`.
    StopRequested,

    /// Worker did not exit in time; SIGTERM sent.
    ///
    /// Sets: `key`, `pid`.
    TermSent,

    /// Worker survived SIGTERM; SIGKILL sent.
    ///
    /// Sets: `key`, `pid`.
    KillSent,

    // === Recovery ===
    /// Idle watchdog is stopping a runner.
    ///
    /// Sets: `key`, `pid`, `elapsed_ms` (time since last heartbeat).
    IdleTimeout,

    /// Stale pid records removed at startup.
    ///
    /// Sets: `reason` (comma-separated keys).
    StaleRecordsRemoved,

    /// Kill-all sweep finished.
    ///
    /// Sets: `reason` (comma-separated pids).
    KillAllCompleted,
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Logical key of the worker (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// OS pid of the worker.
    pub pid: Option<u32>,
    /// Exit code of the worker, if it exited normally.
    pub exit_code: Option<i32>,
    /// Duration attached to the event in milliseconds (stop duration, idle time).
    pub elapsed_ms: Option<u64>,
    /// Human-readable reason (errors, escalation level, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            pid: None,
            exit_code: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches a logical key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a pid.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }

    /// Returns true for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
