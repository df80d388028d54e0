//! Advisory locking for withlock.
//!
//! The lock file is only a rendezvous point: the exclusive lock is taken on
//! the open descriptor with `flock(2)` semantics (via `fs2`), so the kernel
//! releases it when the holding process exits for any reason, crash included.
//! The file itself is created on demand and left in place for reuse.
//!
//! # Wait Policies
//!
//! Acquisition runs under one of three policies: fail immediately when the
//! lock is busy, block until it frees, or block up to a bounded duration.
//! The timed wait polls the non-blocking attempt at a fixed interval, so the
//! observed wait never undershoots the bound and overshoots it by at most
//! one interval.
//!
//! # Holder Metadata
//!
//! Each acquisition rewrites the lock file with JSON metadata:
//! - `owner`: the holder (e.g. `user@HOST`)
//! - `pid`: the holder's process ID
//! - `acquired_at`: RFC3339 timestamp
//! - `command`: the command being run under the lock
//!
//! The metadata is purely diagnostic. It is reported when another invocation
//! finds the lock busy, and stale or unparseable contents never affect
//! locking itself.
//!
//! # RAII Guard
//!
//! The lock is held through a guard object that releases it when dropped.
//! The lock file is never deleted; deletion would race with a waiter that
//! already has the old inode open.

use crate::error::{Result, WithlockError};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// Backoff between non-blocking attempts in the timed-wait path.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// What to do when the lock is currently held by another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Fail immediately.
    NoWait,
    /// Block until the lock becomes available.
    WaitForever,
    /// Block up to the given duration, then give up.
    WaitWithTimeout(std::time::Duration),
}

/// Holder metadata stored in the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderMetadata {
    /// Owner of the lock (e.g. `user@HOST`).
    pub owner: String,

    /// Process ID of the holder.
    pub pid: u32,

    /// Timestamp when the lock was acquired (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// The command being run under the lock.
    pub command: String,
}

impl HolderMetadata {
    /// Create metadata for the current process with the current timestamp.
    pub fn new(command: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            command: command.to_string(),
        }
    }

    /// Parse holder metadata from a lock file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            WithlockError::Io(format!(
                "failed to read lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            WithlockError::Io(format!(
                "failed to parse lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

/// Get the owner string for holder metadata.
fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// RAII guard for the held lock.
///
/// When dropped, the advisory lock is released but the lock file stays on
/// disk for the next invocation. The kernel also releases the lock if the
/// process terminates while the guard is alive.
#[derive(Debug)]
pub struct LockGuard {
    /// The open descriptor holding the lock.
    file: File,

    /// Path to the lock file.
    path: PathBuf,
}

impl LockGuard {
    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            eprintln!(
                "Warning: failed to release lock '{}': {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Open the lock file (creating it if absent) and take an exclusive advisory
/// lock on it under the given wait policy.
///
/// `command` is recorded in the holder metadata for diagnostics.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Lock held until the guard drops (exit code pass-through)
/// * `Err(WithlockError::LockBusy)` - Lock held elsewhere under `NoWait` (exit code 1)
/// * `Err(WithlockError::LockTimeout)` - Wait exhausted (exit code 1)
pub fn acquire(path: &Path, policy: WaitPolicy, command: &str) -> Result<LockGuard> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| {
            WithlockError::Io(format!(
                "failed to open lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

    match policy {
        WaitPolicy::NoWait => lock_or_fail(&file, path)?,
        WaitPolicy::WaitForever => lock_blocking(&file, path)?,
        WaitPolicy::WaitWithTimeout(timeout) => lock_with_deadline(&file, path, timeout)?,
    }

    write_holder_metadata(&mut file, command);

    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
    })
}

/// Single non-blocking attempt; a busy lock fails immediately.
fn lock_or_fail(file: &File, path: &Path) -> Result<()> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(lock_busy_error(path)),
        Err(e) => Err(lock_io_error(path, &e)),
    }
}

/// Block until the lock becomes available, retrying on interruption.
fn lock_blocking(file: &File, path: &Path) -> Result<()> {
    loop {
        match file.lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(lock_io_error(path, &e)),
        }
    }
}

/// Poll the non-blocking attempt until the deadline passes.
fn lock_with_deadline(file: &File, path: &Path, timeout: std::time::Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(WithlockError::LockTimeout {
                        path: path.to_path_buf(),
                        waited: timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(lock_io_error(path, &e)),
        }
    }
}

/// Build the busy error, enriched with the holder's metadata when readable.
fn lock_busy_error(path: &Path) -> WithlockError {
    let holder = match HolderMetadata::from_file(path) {
        Ok(meta) => format!(
            " (held by {}, pid {}, running '{}', acquired {} ago)",
            meta.owner,
            meta.pid,
            meta.command,
            meta.age_string()
        ),
        Err(_) => String::new(),
    };

    WithlockError::LockBusy {
        path: path.to_path_buf(),
        holder,
    }
}

fn lock_io_error(path: &Path, error: &io::Error) -> WithlockError {
    WithlockError::Io(format!(
        "failed to lock '{}': {}",
        path.display(),
        error
    ))
}

/// Rewrite the lock file with the current holder's metadata.
///
/// The contents are diagnostic only: a failed write never fails the
/// acquisition, and the lock is already held at this point.
fn write_holder_metadata(file: &mut File, command: &str) {
    let meta = HolderMetadata::new(command);
    let Ok(json) = serde_json::to_string_pretty(&meta) else {
        return;
    };

    let _ = file.set_len(0);
    let _ = file.seek(SeekFrom::Start(0));
    let _ = file.write_all(json.as_bytes());
    let _ = file.write_all(b"\n");
    let _ = file.sync_all();
}
