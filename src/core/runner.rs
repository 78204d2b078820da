//! # Runner: one worker process, end to end.
//!
//! A [`Runner`] owns the worker bound to a single logical key: it spawns the
//! process, hands it its config, relays its output, tracks its heartbeat and
//! shuts it down with an escalating stop sequence.
//!
//! ## Lifecycle
//! ```text
//!   Idle ──start()──► Starting ──(spawn + handshake ok)──► Running
//!    ▲                   │                                    │
//!    │        (encode/spawn/handshake error)               stop()
//!    │                   │                                    ▼
//!    └───────────────────┴──────────────────────────────── Stopping
//! ```
//!
//! ## Stop ladder
//! ```text
//! Stop frame + close stdin ─► wait stop_timeout ─┬─► exited: Cooperative
//!                                                └─► SIGTERM ─► wait term_wait ─┬─► Terminated
//!                                                                               └─► SIGKILL ─► wait kill_wait ─┬─► Killed
//!                                                                                                              └─► Unconfirmed
//! then always: relay shutdown → pid record removed → handle cleared → Idle
//! ```
//!
//! ## Rules
//! - `start`/`stop` on one runner are serialized by an async lifecycle lock.
//! - `start` on a live worker performs a full `stop` first; a crashed worker's
//!   handle is cleaned up without signals. A live process recorded for the key
//!   that no handle owns (left by a previous supervisor) is terminated too.
//! - Idle stops re-check the heartbeat under the lifecycle lock.
//! - The exit status is collected by a reaper task and published through a
//!   `watch` channel, so `is_alive()` never touches the child.
//! - Crashes are observed, never restarted.
//! - The log buffer belongs to the runner and survives restarts.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use nix::sys::signal::Signal;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::watch;
use tokio::time;

use crate::core::config::SupervisorConfig;
use crate::core::watchdog::is_idle;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::PidStore;
use crate::os;
use crate::protocol::{ControlFrame, WorkerConfig, ENV_KEY, ENV_LOG_LEVEL, ENV_PARENT_PID};
use crate::relay::LogRelay;

/// Shared dependencies of every runner of one supervisor.
pub(crate) struct RunnerContext {
    pub(crate) cfg: Arc<SupervisorConfig>,
    pub(crate) store: Arc<PidStore>,
    pub(crate) bus: Bus,
}

/// Lifecycle phase of a [`Runner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerPhase {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// How a worker process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one.
    pub signal: Option<i32>,
}

impl WorkerExit {
    /// Exit whose status could not be collected.
    const UNKNOWN: WorkerExit = WorkerExit {
        code: None,
        signal: None,
    };

    /// True for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

/// Rung of the stop ladder that ended the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escalation {
    /// Exited after the stop frame (or had already exited).
    Cooperative,
    /// Exited after SIGTERM.
    Terminated,
    /// Exited after SIGKILL.
    Killed,
    /// Still not observed dead after SIGKILL.
    Unconfirmed,
}

impl Escalation {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Escalation::Cooperative => "cooperative",
            Escalation::Terminated => "terminated",
            Escalation::Killed => "killed",
            Escalation::Unconfirmed => "unconfirmed",
        }
    }
}

/// Outcome of [`Runner::stop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopReport {
    pub escalation: Escalation,
    pub exit: Option<WorkerExit>,
    pub elapsed: Duration,
}

/// Live process handle; exists from a successful spawn until `stop` completes.
struct Process {
    pid: u32,
    stdin: Option<ChildStdin>,
    exit: watch::Receiver<Option<WorkerExit>>,
    stopping: Arc<AtomicBool>,
    started_at: SystemTime,
}

impl Process {
    fn exit(&self) -> Option<WorkerExit> {
        *self.exit.borrow()
    }
}

struct Inner {
    phase: RunnerPhase,
    process: Option<Process>,
}

/// Owner of the worker process for one logical key.
pub struct Runner {
    key: Arc<str>,
    ctx: Arc<RunnerContext>,
    lifecycle: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
    heartbeat: Mutex<Instant>,
    relay: LogRelay,
}

impl Runner {
    pub(crate) fn new(key: &str, ctx: Arc<RunnerContext>) -> Self {
        let relay = LogRelay::new(ctx.cfg.log_capacity, ctx.cfg.drain_poll);
        Self {
            key: Arc::from(key),
            ctx,
            lifecycle: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                phase: RunnerPhase::Idle,
                process: None,
            }),
            heartbeat: Mutex::new(Instant::now()),
            relay,
        }
    }

    /// Logical key of this runner.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Spawns the worker and hands it `config`. Returns its pid.
    ///
    /// A live worker is stopped first; on error the runner is left `Idle`.
    pub async fn start(&self, config: &WorkerConfig) -> Result<u32, SupervisorError> {
        let _guard = self.lifecycle.lock().await;

        let has_handle = self.lock_inner().process.is_some();
        if has_handle {
            if self.is_alive() {
                self.stop_locked(self.ctx.cfg.stop_timeout).await;
            } else {
                self.release_handle().await;
            }
        }
        if !self.ctx.store.kill_key(&self.key).await {
            tracing::warn!(key = %self.key, "recorded worker survived SIGKILL; starting anyway");
        }

        self.set_phase(RunnerPhase::Starting);
        self.publish(Event::new(EventKind::WorkerStarting));

        match self.spawn(config).await {
            Ok(pid) => {
                self.publish(Event::new(EventKind::WorkerStarted).with_pid(pid));
                Ok(pid)
            }
            Err(e) => {
                self.set_phase(RunnerPhase::Idle);
                tracing::warn!(key = %self.key, error = %e, "worker start failed");
                self.publish(
                    Event::new(EventKind::WorkerSpawnFailed).with_reason(e.as_message()),
                );
                Err(e)
            }
        }
    }

    /// Stops the worker, escalating as needed. `None` if there was nothing to stop.
    ///
    /// `timeout` bounds the cooperative phase; later rungs use the configured waits.
    pub async fn stop(&self, timeout: Duration) -> Option<StopReport> {
        let _guard = self.lifecycle.lock().await;
        self.stop_locked(timeout).await
    }

    /// Stops the worker if it is alive and untouched for longer than `threshold`.
    ///
    /// The check runs under the lifecycle lock, so a worker started or touched
    /// while the caller was deciding is kept.
    pub async fn stop_if_idle(&self, threshold: Duration, timeout: Duration) -> Option<StopReport> {
        let _guard = self.lifecycle.lock().await;
        let idle_for = self.idle_for();
        if !is_idle(self.is_alive(), idle_for, threshold) {
            return None;
        }

        let mut ev = Event::new(EventKind::IdleTimeout).with_elapsed(idle_for);
        if let Some(pid) = self.pid() {
            ev = ev.with_pid(pid);
        }
        self.publish(ev);
        self.stop_locked(timeout).await
    }

    /// True while a process handle exists and its exit has not been observed.
    pub fn is_alive(&self) -> bool {
        self.lock_inner()
            .process
            .as_ref()
            .is_some_and(|p| p.exit().is_none())
    }

    /// Records activity: resets the idle clock.
    pub fn touch(&self) {
        *self.lock_heartbeat() = Instant::now();
    }

    /// Pid of the current process handle (kept after a crash until the next start/stop).
    pub fn pid(&self) -> Option<u32> {
        self.lock_inner().process.as_ref().map(|p| p.pid)
    }

    pub fn phase(&self) -> RunnerPhase {
        self.lock_inner().phase
    }

    /// Wall-clock start time of the current process handle.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.lock_inner().process.as_ref().map(|p| p.started_at)
    }

    pub fn last_heartbeat(&self) -> Instant {
        *self.lock_heartbeat()
    }

    /// Time since the last heartbeat.
    pub fn idle_for(&self) -> Duration {
        self.lock_heartbeat().elapsed()
    }

    /// Observed exit of the current process handle, if it has exited.
    pub fn exit(&self) -> Option<WorkerExit> {
        self.lock_inner().process.as_ref().and_then(Process::exit)
    }

    /// Removes and returns up to `max_lines` buffered log lines, oldest first.
    pub fn read_logs(&self, max_lines: usize) -> Vec<String> {
        self.relay.read_and_drain(max_lines)
    }

    /// Number of buffered log lines.
    pub fn pending_logs(&self) -> usize {
        self.relay.len()
    }

    async fn spawn(&self, config: &WorkerConfig) -> Result<u32, SupervisorError> {
        let key = self.key.to_string();
        let frame = ControlFrame::Start {
            key: key.clone(),
            config: config.clone(),
        };
        let line = frame
            .to_line()
            .map_err(|source| SupervisorError::Encode {
                key: key.clone(),
                source,
            })?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                key: key.clone(),
                source,
            })?;

        let Some(pid) = child.id() else {
            discard(&mut child).await;
            return Err(SupervisorError::MissingPid { key });
        };

        let mut stdin = child.stdin.take();
        if let Err(source) = handshake(stdin.as_mut(), &line).await {
            discard(&mut child).await;
            return Err(SupervisorError::Handshake { key, pid, source });
        }

        if let Some(stdout) = child.stdout.take() {
            self.relay.attach(stdout, child.stderr.take());
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let exit = self.spawn_reaper(child, pid, Arc::clone(&stopping));

        self.update_record(Some(pid)).await;
        self.touch();
        {
            let mut inner = self.lock_inner();
            inner.process = Some(Process {
                pid,
                stdin,
                exit,
                stopping,
                started_at: SystemTime::now(),
            });
            inner.phase = RunnerPhase::Running;
        }
        tracing::debug!(key = %self.key, pid, "worker running");
        Ok(pid)
    }

    fn command(&self) -> Command {
        let worker = &self.ctx.cfg.worker;
        let mut cmd = Command::new(&worker.program);
        cmd.args(&worker.args)
            .envs(worker.env.iter().map(|(k, v)| (k, v)))
            .env(ENV_KEY, &*self.key)
            .env(ENV_PARENT_PID, std::process::id().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        if let Some(level) = &worker.log_level {
            cmd.env(ENV_LOG_LEVEL, level);
        }
        cmd
    }

    /// Waits for the child in the background; the exit is always sent, even if `wait` fails.
    fn spawn_reaper(
        &self,
        mut child: Child,
        pid: u32,
        stopping: Arc<AtomicBool>,
    ) -> watch::Receiver<Option<WorkerExit>> {
        let (tx, rx) = watch::channel(None);
        let key = Arc::clone(&self.key);
        let bus = self.ctx.bus.clone();

        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => WorkerExit::from(status),
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        pid,
                        error = %e,
                        "failed to collect worker exit status"
                    );
                    WorkerExit::UNKNOWN
                }
            };
            let _ = tx.send(Some(exit));

            if !stopping.load(Ordering::Acquire) {
                tracing::warn!(
                    key = %key,
                    pid,
                    code = ?exit.code,
                    signal = ?exit.signal,
                    "worker exited unexpectedly"
                );
                let mut ev = Event::new(EventKind::WorkerExited)
                    .with_key(key)
                    .with_pid(pid);
                if let Some(code) = exit.code {
                    ev = ev.with_exit_code(code);
                }
                if let Some(sig) = exit.signal {
                    ev = ev.with_reason(format!("signal {sig}"));
                }
                bus.publish(ev);
            }
        });
        rx
    }

    async fn stop_locked(&self, timeout: Duration) -> Option<StopReport> {
        let (pid, stdin, mut exit_rx) = {
            let mut inner = self.lock_inner();
            let process = inner.process.as_mut()?;
            process.stopping.store(true, Ordering::Release);
            let taken = (process.pid, process.stdin.take(), process.exit.clone());
            inner.phase = RunnerPhase::Stopping;
            taken
        };

        let began = Instant::now();
        let cfg = Arc::clone(&self.ctx.cfg);
        self.publish(Event::new(EventKind::StopRequested).with_pid(pid));

        let mut escalation = Escalation::Cooperative;
        let mut exit = *exit_rx.borrow();

        if exit.is_none() {
            request_stop(stdin, timeout).await;
            exit = wait_exit(&mut exit_rx, timeout).await;
        }
        if exit.is_none() {
            escalation = Escalation::Terminated;
            self.publish(Event::new(EventKind::TermSent).with_pid(pid));
            os::send_signal(pid, Signal::SIGTERM);
            exit = wait_exit(&mut exit_rx, cfg.term_wait).await;
        }
        if exit.is_none() {
            escalation = Escalation::Killed;
            self.publish(Event::new(EventKind::KillSent).with_pid(pid));
            os::send_signal(pid, Signal::SIGKILL);
            exit = wait_exit(&mut exit_rx, cfg.kill_wait).await;
        }
        if exit.is_none() {
            escalation = Escalation::Unconfirmed;
            tracing::warn!(key = %self.key, pid, "worker exit not confirmed after SIGKILL");
        }

        self.release_handle().await;

        let elapsed = began.elapsed();
        let mut ev = Event::new(EventKind::WorkerStopped)
            .with_pid(pid)
            .with_elapsed(elapsed)
            .with_reason(escalation.as_str());
        if let Some(code) = exit.and_then(|e| e.code) {
            ev = ev.with_exit_code(code);
        }
        self.publish(ev);

        Some(StopReport {
            escalation,
            exit,
            elapsed,
        })
    }

    /// Shuts the relay down, removes the pid record and clears the handle.
    async fn release_handle(&self) {
        self.relay.shutdown(self.ctx.cfg.drain_grace).await;
        self.update_record(None).await;
        let mut inner = self.lock_inner();
        inner.process = None;
        inner.phase = RunnerPhase::Idle;
    }

    /// Writes (`Some`) or removes (`None`) the pid record on the blocking pool.
    async fn update_record(&self, pid: Option<u32>) {
        let store = Arc::clone(&self.ctx.store);
        let key = Arc::clone(&self.key);
        let task = tokio::task::spawn_blocking(move || match pid {
            Some(pid) => store.write(&key, pid),
            None => store.remove(&key),
        });
        if let Err(e) = task.await {
            tracing::warn!(key = %self.key, error = %e, "pid record update did not complete");
        }
    }

    fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev.with_key(Arc::clone(&self.key)));
    }

    fn set_phase(&self, phase: RunnerPhase) {
        self.lock_inner().phase = phase;
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_heartbeat(&self) -> MutexGuard<'_, Instant> {
        self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writes the start frame to the worker's stdin.
async fn handshake(stdin: Option<&mut ChildStdin>, line: &str) -> std::io::Result<()> {
    let stdin = stdin.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "worker stdin is not piped")
    })?;
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await
}

/// Sends the cooperative stop: a `Stop` frame followed by EOF on stdin.
async fn request_stop(stdin: Option<ChildStdin>, timeout: Duration) {
    let Some(mut stdin) = stdin else {
        return;
    };
    let Ok(line) = ControlFrame::Stop.to_line() else {
        return;
    };
    let send = async {
        stdin.write_all(line.as_bytes()).await?;
        stdin.shutdown().await
    };
    match time::timeout(timeout, send).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "stop frame not delivered"),
        Err(_) => tracing::debug!("stop frame write timed out"),
    }
    drop(stdin);
}

/// Waits up to `timeout` for the reaper to report an exit.
async fn wait_exit(
    rx: &mut watch::Receiver<Option<WorkerExit>>,
    timeout: Duration,
) -> Option<WorkerExit> {
    if let Ok(Ok(exit)) = time::timeout(timeout, rx.wait_for(Option::is_some)).await {
        return *exit;
    }
    *rx.borrow()
}

/// Kills and reaps a child that never became a worker.
async fn discard(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "half-started worker already gone");
    }
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WorkerCommand;
    use crate::protocol::{BotArgs, ExchangeConfig};

    fn context(dir: &std::path::Path, program: &str, script: Option<&str>) -> Arc<RunnerContext> {
        let mut worker = WorkerCommand::new(program);
        if let Some(script) = script {
            worker = worker.arg("-c").arg(script);
        }
        let cfg = SupervisorConfig {
            pid_dir: dir.to_path_buf(),
            stop_timeout: Duration::from_millis(500),
            term_wait: Duration::from_millis(500),
            kill_wait: Duration::from_millis(500),
            drain_poll: Duration::from_millis(20),
            worker,
            ..SupervisorConfig::default()
        };
        Arc::new(RunnerContext {
            store: Arc::new(PidStore::new(dir, "test-")),
            cfg: Arc::new(cfg),
            bus: Bus::new(64),
        })
    }

    fn config() -> WorkerConfig {
        WorkerConfig::new(
            ExchangeConfig::default(),
            BotArgs {
                ticker: "BTC".into(),
                amount_per_level: 10.0,
                min_spread: 0.001,
                maker_only: true,
                ttl: 30.0,
            },
        )
    }

    #[test]
    fn test_new_runner_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new("owner", context(dir.path(), "/bin/sh", None));
        assert_eq!(runner.key(), "owner");
        assert_eq!(runner.phase(), RunnerPhase::Idle);
        assert!(!runner.is_alive());
        assert_eq!(runner.pid(), None);
        assert_eq!(runner.exit(), None);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new("owner", context(dir.path(), "/bin/sh", None));
        assert_eq!(runner.stop(Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_runner_idle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(
            "owner",
            context(dir.path(), "/nonexistent/botvisor-worker", None),
        );
        let err = runner.start(&config()).await.unwrap_err();
        assert_eq!(err.as_label(), "supervisor_spawn");
        assert_eq!(runner.phase(), RunnerPhase::Idle);
        assert_eq!(runner.pid(), None);
    }

    #[tokio::test]
    async fn test_cooperative_stop_on_eof() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "/bin/sh", Some("cat >/dev/null; echo bye"));
        let store = Arc::clone(&ctx.store);
        let runner = Runner::new("owner", ctx);

        let pid = runner.start(&config()).await.unwrap();
        assert!(runner.is_alive());
        assert_eq!(runner.phase(), RunnerPhase::Running);
        assert_eq!(store.read("owner"), Some(pid));

        let report = runner.stop(Duration::from_secs(2)).await.unwrap();
        assert_eq!(report.escalation, Escalation::Cooperative);
        assert!(report.exit.unwrap().success());
        assert_eq!(runner.phase(), RunnerPhase::Idle);
        assert_eq!(store.read("owner"), None);
        assert_eq!(runner.read_logs(10), vec!["bye".to_string()]);
    }

    #[tokio::test]
    async fn test_crash_is_observed_without_restart() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "/bin/sh", Some("read line; exit 1"));
        let runner = Runner::new("owner", ctx);
        let pid = runner.start(&config()).await.unwrap();

        for _ in 0..100 {
            if !runner.is_alive() {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!runner.is_alive());
        assert_eq!(runner.pid(), Some(pid));
        assert_eq!(runner.exit().and_then(|e| e.code), Some(1));
    }

    #[test]
    fn test_idle_for_resets_on_touch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new("owner", context(dir.path(), "/bin/sh", None));
        std::thread::sleep(Duration::from_millis(30));
        assert!(runner.idle_for() >= Duration::from_millis(30));
        runner.touch();
        assert!(runner.idle_for() < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_start_terminates_unowned_recorded_worker() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "/bin/sh", Some("cat >/dev/null"));
        let store = Arc::clone(&ctx.store);

        let mut leftover = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let old = leftover.id();
        let reaper = std::thread::spawn(move || leftover.wait());
        store.write("owner", old);

        let runner = Runner::new("owner", ctx);
        let pid = runner.start(&config()).await.unwrap();
        let _ = reaper.join();

        assert_ne!(pid, old);
        assert!(!os::is_alive(old));
        assert_eq!(store.read("owner"), Some(pid));
        runner.stop(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn test_stop_if_idle_rechecks_heartbeat() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new("owner", context(dir.path(), "/bin/sh", Some("cat >/dev/null")));
        runner.start(&config()).await.unwrap();

        time::sleep(Duration::from_millis(60)).await;
        runner.touch();
        let kept = runner
            .stop_if_idle(Duration::from_millis(30), Duration::from_secs(1))
            .await;
        assert_eq!(kept, None);
        assert!(runner.is_alive());

        time::sleep(Duration::from_millis(60)).await;
        let report = runner
            .stop_if_idle(Duration::from_millis(30), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(report.escalation, Escalation::Cooperative);
        assert!(!runner.is_alive());
    }

    #[tokio::test]
    async fn test_idle_stop_racing_restart_keeps_new_worker() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new("owner", context(dir.path(), "/bin/sh", Some("cat >/dev/null")));
        runner.start(&config()).await.unwrap();
        time::sleep(Duration::from_millis(60)).await;

        let cfg = config();
        let (started, _) = tokio::join!(
            runner.start(&cfg),
            runner.stop_if_idle(Duration::from_millis(30), Duration::from_secs(1)),
        );
        let pid = started.unwrap();
        assert!(runner.is_alive());
        assert_eq!(runner.pid(), Some(pid));
        runner.stop(Duration::from_secs(2)).await;
    }
}
