//! # OS-level process helpers.
//!
//! Liveness probes and signal delivery by raw pid. Used for processes the
//! supervisor may not own (records left by a previous supervisor run) as well
//! as for its own children.
//!
//! ## Rules
//! - `kill(pid, 0)` answering `EPERM` still means "alive" (the process exists).
//! - A zombie is dead: it holds a pid but will never run again.
//! - Pids `<= 0` never reach `kill(2)` (they address process groups).

use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Interval between liveness probes while waiting for a foreign process to exit.
const PROBE_INTERVAL: Duration = Duration::from_millis(50);

fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

/// Returns true if a process with this pid exists and is not a zombie.
pub fn is_alive(pid: u32) -> bool {
    let Some(p) = to_pid(pid) else {
        return false;
    };
    match signal::kill(p, None) {
        Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    // /proc/<pid>/stat: "<pid> (<comm>) <state> ..."; comm may contain ')'.
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    stat.rfind(')')
        .and_then(|i| stat[i + 1..].split_whitespace().next())
        .is_some_and(|state| state == "Z" || state == "X")
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Wall-clock start of `pid` in unix seconds, from `/proc`. `None` if unknown.
#[cfg(target_os = "linux")]
pub fn started_at(pid: u32) -> Option<u64> {
    use nix::unistd::{sysconf, SysconfVar};

    // Field 22 of /proc/<pid>/stat is the start time in clock ticks since boot.
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let ticks: u64 = stat
        .get(stat.rfind(')')? + 1..)?
        .split_whitespace()
        .nth(19)?
        .parse()
        .ok()?;
    let hz = sysconf(SysconfVar::CLK_TCK).ok().flatten()?;
    let hz = u64::try_from(hz).ok().filter(|hz| *hz > 0)?;
    let btime = std::fs::read_to_string("/proc/stat")
        .ok()?
        .lines()
        .find_map(|line| line.strip_prefix("btime "))?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(btime + ticks / hz)
}

#[cfg(not(target_os = "linux"))]
pub fn started_at(_pid: u32) -> Option<u64> {
    None
}

/// Tolerance between a process start and the record written right after it.
/// `btime` is rounded to whole seconds and drifts with clock adjustments.
const RECORD_SLACK_SECS: u64 = 5;

/// True unless `pid` is known to have started after `recorded_at`, which
/// means the pid was reused by an unrelated process.
pub fn started_before(pid: u32, recorded_at: u64) -> bool {
    started_at(pid).map_or(true, |start| start <= recorded_at + RECORD_SLACK_SECS)
}

/// Sends `sig` to `pid`. Returns true if the signal was delivered.
pub fn send_signal(pid: u32, sig: Signal) -> bool {
    match to_pid(pid) {
        Some(p) => signal::kill(p, sig).is_ok(),
        None => false,
    }
}

/// Polls until `pid` is gone or `timeout` elapses. Returns true if it exited.
pub async fn wait_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}

/// Terminates a process the caller does not own: SIGTERM, wait, SIGKILL, wait.
///
/// Returns true once the process is confirmed gone (including when it was
/// already gone before the call).
pub async fn terminate(pid: u32, term_wait: Duration, kill_wait: Duration) -> bool {
    if !is_alive(pid) {
        return true;
    }
    send_signal(pid, Signal::SIGTERM);
    if wait_gone(pid, term_wait).await {
        return true;
    }
    tracing::warn!(pid, "process ignored SIGTERM; sending SIGKILL");
    send_signal(pid, Signal::SIGKILL);
    wait_gone(pid, kill_wait).await
}
