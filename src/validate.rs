//! Lock location validation.
//!
//! A lock file that lives in a directory writable by other users (a shared
//! temp directory, typically) is useless for serialization: any user could
//! pre-create or replace the file. Such locations are rejected before any
//! lock attempt, with an exit code distinct from "lock busy".

use crate::error::{Result, WithlockError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Permission bits granting write access to group or other users.
const GROUP_OR_WORLD_WRITABLE: u32 = 0o022;

/// Check that `path` is safe to use as a lock file and return it in absolute
/// form.
///
/// Fails with `InsecureLocation` when the containing directory is group- or
/// world-writable. Does not create or modify the lock file itself.
pub fn validate_lock_location(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| {
        WithlockError::Io(format!(
            "failed to resolve lock path '{}': {}",
            path.display(),
            e
        ))
    })?;

    let dir = match absolute.parent() {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("/"),
    };

    let metadata = fs::metadata(&dir).map_err(|e| {
        WithlockError::Io(format!(
            "failed to stat lock directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    if !metadata.is_dir() {
        return Err(WithlockError::Io(format!(
            "lock path parent '{}' is not a directory",
            dir.display()
        )));
    }

    if metadata.permissions().mode() & GROUP_OR_WORLD_WRITABLE != 0 {
        return Err(WithlockError::InsecureLocation { dir });
    }

    Ok(absolute)
}
