//! Workspace lock taken around every batch, purge and config edit.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_FILE: &str = ".lock";
const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// The process recorded in the lock file while it holds the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub pid: u32,
    pub since: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        LockHolder {
            pid: std::process::id(),
            since: Utc::now(),
        }
    }

    /// Parse the `<pid> <rfc3339>` record; anything else is unknown
    fn parse(text: &str) -> Option<Self> {
        let (pid, since) = text.trim().split_once(' ')?;
        Some(LockHolder {
            pid: pid.parse().ok()?,
            since: DateTime::parse_from_rfc3339(since).ok()?.with_timezone(&Utc),
        })
    }

    fn read(path: &Path) -> Option<Self> {
        fs::read_to_string(path).ok().as_deref().and_then(Self::parse)
    }
}

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pid, self.since.to_rfc3339())
    }
}

/// Advisory flock on `bulkmod/.lock`, released on drop.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("workspace is locked by {}", describe(.holder))]
    Timeout {
        path: PathBuf,
        holder: Option<LockHolder>,
    },
    #[error("lock error: {0}")]
    IoError(#[from] std::io::Error),
}

fn describe(holder: &Option<LockHolder>) -> String {
    match holder {
        Some(h) => format!("bm process {} (since {})", h.pid, h.since.to_rfc3339()),
        None => "another bm process".to_string(),
    }
}

impl FileLock {
    /// Wait up to `timeout` for the lock on `bulk_dir`, backing off between
    /// attempts. The holder record is written once the lock is taken.
    pub fn acquire(bulk_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = bulk_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateError {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_millis(5);
        while let Err(e) = try_lock(&file) {
            if Instant::now() >= deadline {
                let holder = LockHolder::read(&path);
                tracing::debug!(path = %path.display(), error = %e, ?holder, "lock wait timed out");
                return Err(LockError::Timeout { path, holder });
            }
            std::thread::sleep(backoff);
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        let mut lock = FileLock { file, path };
        lock.record_holder()?;
        Ok(lock)
    }

    pub fn acquire_default(bulk_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(bulk_dir, DEFAULT_TIMEOUT)
    }

    fn record_holder(&mut self) -> Result<(), LockError> {
        self.file.set_len(0)?;
        writeln!(self.file, "{}", LockHolder::current())?;
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
