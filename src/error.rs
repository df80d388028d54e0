//! Error types for the withlock CLI.
//!
//! Uses thiserror for derive macros. Each variant maps to the exit code the
//! wrapper reports for that failure.

use crate::exit_codes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for withlock operations.
#[derive(Error, Debug)]
pub enum WithlockError {
    /// The lock file's directory is writable by users other than its owner.
    #[error("'{}' is group- or other-writable, can't use it for locks", .dir.display())]
    InsecureLocation {
        /// Directory that failed the permission check.
        dir: PathBuf,
    },

    /// The lock is held by another process and no wait was requested.
    #[error("lock '{}' is busy{holder}", .path.display())]
    LockBusy {
        /// The lock file path.
        path: PathBuf,
        /// Preformatted holder description (" (held by ...)"), or empty when
        /// the holder metadata could not be read.
        holder: String,
    },

    /// The lock did not become available within the configured wait.
    #[error("gave up waiting for lock '{}' after {waited:?}", .path.display())]
    LockTimeout {
        /// The lock file path.
        path: PathBuf,
        /// The configured wait duration.
        waited: Duration,
    },

    /// The child command could not be started.
    #[error("failed to execute '{command}': {message}")]
    SpawnFailure {
        /// The program that failed to spawn.
        command: String,
        /// Exit code to report (126 or 127).
        code: i32,
        /// The underlying OS error message.
        message: String,
    },

    /// Unexpected I/O failure while setting up the lock or waiting on the child.
    #[error("{0}")]
    Io(String),
}

impl WithlockError {
    /// Returns the exit code the wrapper reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            WithlockError::InsecureLocation { .. } => exit_codes::INSECURE_LOCATION,
            WithlockError::LockBusy { .. } => exit_codes::LOCK_BUSY,
            WithlockError::LockTimeout { .. } => exit_codes::LOCK_BUSY,
            WithlockError::SpawnFailure { code, .. } => *code,
            // Failures that prevented the run share the generic nonzero code.
            WithlockError::Io(_) => exit_codes::LOCK_BUSY,
        }
    }

    /// True for the two contention outcomes that `--quiet` silences.
    pub fn is_lock_busy(&self) -> bool {
        matches!(
            self,
            WithlockError::LockBusy { .. } | WithlockError::LockTimeout { .. }
        )
    }
}

/// Result type alias for withlock operations.
pub type Result<T> = std::result::Result<T, WithlockError>;
