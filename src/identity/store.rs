//! # File-backed pid store.
//!
//! One JSON file per key under a shared directory:
//! ```text
//! <dir>/<prefix><encode_key(key)>.pid   {"pid":4242,"key":"user:abc","recorded_at":1718000000}
//! ```
//!
//! ## Rules
//! - Writes are atomic (temp file in the same dir + rename); readers never see half a record.
//! - Persistence is advisory: I/O failures are logged and swallowed.
//! - Only files matching `<prefix>*.pid` are ever touched.
//! - A live pid that started after its record was written belongs to someone
//!   else (pid reuse): the record is dropped and the process left alone.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::record::{decode_key, encode_key, PidRecord, RECORD_EXT};
use crate::os;

/// Internal failure reading or writing a record. Logged, never returned.
#[derive(Error, Debug)]
enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("temp file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Durable `key → pid` map used for crash recovery and emergency kill-all.
#[derive(Clone, Debug)]
pub struct PidStore {
    dir: PathBuf,
    prefix: String,
    term_wait: Duration,
    kill_wait: Duration,
}

impl PidStore {
    /// Default SIGTERM wait used by [`kill_all`](Self::kill_all).
    pub const DEFAULT_TERM_WAIT: Duration = Duration::from_secs(3);
    /// Default SIGKILL wait used by [`kill_all`](Self::kill_all).
    pub const DEFAULT_KILL_WAIT: Duration = Duration::from_secs(2);

    /// Creates a store rooted at `dir`; record files are named `<prefix><key>.pid`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            term_wait: Self::DEFAULT_TERM_WAIT,
            kill_wait: Self::DEFAULT_KILL_WAIT,
        }
    }

    /// Overrides the termination waits used by [`kill_all`](Self::kill_all).
    pub fn with_sweep_waits(mut self, term_wait: Duration, kill_wait: Duration) -> Self {
        self.term_wait = term_wait;
        self.kill_wait = kill_wait;
        self
    }

    /// Directory the records live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", self.prefix, encode_key(key), RECORD_EXT))
    }

    /// Persists `pid` for `key`, replacing any previous record.
    pub fn write(&self, key: &str, pid: u32) {
        if let Err(e) = self.try_write(&PidRecord::now(key, pid)) {
            tracing::warn!(key, pid, error = %e, "failed to write pid record");
        }
    }

    fn try_write(&self, record: &PidRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, record)?;
        tmp.flush()?;
        tmp.persist(self.path_for(&record.key))?;
        Ok(())
    }

    /// Returns the recorded pid for `key`, if a readable record exists.
    pub fn read(&self, key: &str) -> Option<u32> {
        match load(&self.path_for(key)) {
            Ok(rec) => Some(rec.pid),
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!(key, error = %e, "unreadable pid record");
                None
            }
        }
    }

    /// Deletes the record for `key`. A missing record is not an error.
    pub fn remove(&self, key: &str) {
        remove_file(&self.path_for(key));
    }

    /// Returns every decodable record in the store.
    pub fn records(&self) -> Vec<PidRecord> {
        self.scan()
            .into_iter()
            .filter_map(|(_, rec)| rec.ok())
            .collect()
    }

    /// Removes records whose process no longer exists. Returns the removed keys.
    ///
    /// Unreadable or corrupt records are removed too; their key is recovered
    /// from the file name.
    pub fn cleanup_dead(&self) -> Vec<String> {
        let mut removed = Vec::new();
        for (path, rec) in self.scan() {
            let key = match rec {
                Ok(rec) if is_owned(&rec) => continue,
                Ok(rec) => rec.key,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "discarding corrupt pid record"
                    );
                    self.key_from_path(&path)
                        .unwrap_or_else(|| path.display().to_string())
                }
            };
            remove_file(&path);
            removed.push(key);
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), keys = ?removed, "removed stale pid records");
        }
        removed
    }

    /// Terminates every recorded live process. Returns the pids confirmed terminated.
    ///
    /// Works without any in-memory state, so it also reaches workers left
    /// behind by a previous supervisor run.
    pub async fn kill_all(&self) -> Vec<u32> {
        let store = self.clone();
        let entries = tokio::task::spawn_blocking(move || store.scan())
            .await
            .unwrap_or_default();

        let mut killed = Vec::new();
        for (path, rec) in entries {
            let Ok(rec) = rec else {
                remove_file(&path);
                continue;
            };
            if self.terminate_record(&path, &rec).await == Some(true) {
                killed.push(rec.pid);
            }
        }
        killed
    }

    /// Terminates the recorded process for `key` and removes its record.
    ///
    /// Returns true when no recorded process is left running: nothing was
    /// recorded, the record was stale, or the process was terminated.
    pub async fn kill_key(&self, key: &str) -> bool {
        let path = self.path_for(key);
        let load_path = path.clone();
        let rec = match tokio::task::spawn_blocking(move || load(&load_path)).await {
            Ok(Ok(rec)) => rec,
            Ok(Err(StoreError::Io(e))) if e.kind() == io::ErrorKind::NotFound => return true,
            Ok(Err(e)) => {
                tracing::debug!(key, error = %e, "dropping unreadable pid record");
                remove_file(&path);
                return true;
            }
            Err(_) => return false,
        };
        self.terminate_record(&path, &rec).await != Some(false)
    }

    /// Signals the process behind `rec` if it is still the recorded worker.
    ///
    /// `None` if there was nothing to terminate, else whether it is gone.
    /// The record is removed unless the process survived.
    async fn terminate_record(&self, path: &Path, rec: &PidRecord) -> Option<bool> {
        if !is_owned(rec) {
            remove_file(path);
            return None;
        }
        if os::terminate(rec.pid, self.term_wait, self.kill_wait).await {
            tracing::info!(key = %rec.key, pid = rec.pid, "terminated recorded worker");
            remove_file(path);
            Some(true)
        } else {
            tracing::error!(key = %rec.key, pid = rec.pid, "recorded worker survived SIGKILL");
            Some(false)
        }
    }

    /// Lists record files with their parse result.
    fn scan(&self) -> Vec<(PathBuf, Result<PidRecord, StoreError>)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        dir = %self.dir.display(),
                        error = %e,
                        "cannot scan pid records"
                    );
                }
                return Vec::new();
            }
        };
        let mut out: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| self.key_token(path).is_some())
            .map(|path| {
                let rec = load(&path);
                (path, rec)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn key_token<'a>(&self, path: &'a Path) -> Option<&'a str> {
        path.file_name()?
            .to_str()?
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(RECORD_EXT)
    }

    fn key_from_path(&self, path: &Path) -> Option<String> {
        self.key_token(path).and_then(decode_key)
    }
}

/// True if the record's process is alive and is the one that was recorded.
fn is_owned(rec: &PidRecord) -> bool {
    if !os::is_alive(rec.pid) {
        return false;
    }
    if !os::started_before(rec.pid, rec.recorded_at) {
        tracing::debug!(key = %rec.key, pid = rec.pid, "pid reused since record was written");
        return false;
    }
    true
}

fn load(path: &Path) -> Result<PidRecord, StoreError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn remove_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove pid record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> PidStore {
        PidStore::new(dir.path(), "test-")
            .with_sweep_waits(Duration::from_secs(2), Duration::from_secs(1))
    }

    /// A pid that is guaranteed not to be running: a child we already reaped.
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(store.read("user:abc"), None);
        store.write("user:abc", 4242);
        assert_eq!(store.read("user:abc"), Some(4242));

        store.write("user:abc", 4343);
        assert_eq!(store.read("user:abc"), Some(4343));

        store.remove("user:abc");
        assert_eq!(store.read("user:abc"), None);
        store.remove("user:abc");
    }

    #[test]
    fn test_record_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.write("user:abc", 77);

        let path = dir.path().join("test-user%3Aabc.pid");
        assert_eq!(store.path_for("user:abc"), path);
        let rec: PidRecord = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(rec.pid, 77);
        assert_eq!(rec.key, "user:abc");
        assert!(rec.recorded_at > 0);
    }

    #[test]
    fn test_cleanup_dead_keeps_live_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.write("alive", std::process::id());
        store.write("gone", dead_pid());

        let removed = store.cleanup_dead();
        assert_eq!(removed, vec!["gone".to_string()]);
        assert_eq!(store.read("alive"), Some(std::process::id()));
        assert_eq!(store.read("gone"), None);
    }

    #[test]
    fn test_cleanup_dead_discards_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        fs::write(store.path_for("user:x"), b"{not json").unwrap();

        assert_eq!(store.cleanup_dead(), vec!["user:x".to_string()]);
        assert!(!store.path_for("user:x").exists());
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let foreign = dir.path().join("other-owner.pid");
        fs::write(&foreign, b"garbage").unwrap();
        fs::write(dir.path().join("test-owner.txt"), b"garbage").unwrap();

        assert!(store.cleanup_dead().is_empty());
        assert!(store.records().is_empty());
        assert!(foreign.exists());
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PidStore::new(dir.path().join("nope"), "test-");
        assert!(store.records().is_empty());
        assert!(store.cleanup_dead().is_empty());
    }

    #[tokio::test]
    async fn test_kill_all_terminates_live_and_drops_dead() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let live = child.id();
        let reaper = std::thread::spawn(move || child.wait());

        store.write("live", live);
        store.write("dead", dead_pid());

        let killed = store.kill_all().await;
        let _ = reaper.join();

        assert_eq!(killed, vec![live]);
        assert!(store.records().is_empty());
    }

    fn sleeper() -> (u32, std::thread::JoinHandle<std::io::Result<std::process::ExitStatus>>) {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        (pid, std::thread::spawn(move || child.wait()))
    }

    #[tokio::test]
    async fn test_kill_key_terminates_recorded_process() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let (pid, reaper) = sleeper();
        store.write("owner", pid);

        assert!(store.kill_key("owner").await);
        let _ = reaper.join();
        assert!(!os::is_alive(pid));
        assert_eq!(store.read("owner"), None);

        assert!(store.kill_key("owner").await);
        store.write("gone", dead_pid());
        assert!(store.kill_key("gone").await);
        assert_eq!(store.read("gone"), None);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_reused_pid_is_never_signalled() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let (pid, reaper) = sleeper();

        // A record written an hour before this process started.
        let stale = PidRecord {
            pid,
            key: "old".into(),
            recorded_at: os::started_at(pid).unwrap() - 3600,
        };
        fs::write(store.path_for("old"), serde_json::to_vec(&stale).unwrap()).unwrap();

        assert!(store.kill_all().await.is_empty());
        assert!(os::is_alive(pid));
        assert_eq!(store.read("old"), None);

        os::send_signal(pid, nix::sys::signal::Signal::SIGKILL);
        let _ = reaper.join();
    }
}
