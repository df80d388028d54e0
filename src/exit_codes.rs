//! Exit code constants for the withlock CLI.
//!
//! - 0: Success (the child ran and exited 0)
//! - 1: Lock busy, wait timed out, or other runtime failure
//! - 3: Lock file located in an insecure directory
//! - 126/127: Child command not executable / not found
//!
//! A child that exits non-zero has its code passed through verbatim, and a
//! child killed by signal N maps to 128 + N. Usage errors are reported by
//! clap with exit code 2.

/// Successful execution: the child ran and exited 0.
pub const SUCCESS: i32 = 0;

/// The lock is held by another process, or the wait for it was exhausted.
pub const LOCK_BUSY: i32 = 1;

/// The lock file's directory is group- or world-writable.
pub const INSECURE_LOCATION: i32 = 3;

/// The child command exists but could not be executed.
pub const COMMAND_NOT_EXECUTABLE: i32 = 126;

/// The child command was not found.
pub const COMMAND_NOT_FOUND: i32 = 127;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            LOCK_BUSY,
            INSECURE_LOCATION,
            COMMAND_NOT_EXECUTABLE,
            COMMAND_NOT_FOUND,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_match_documented_values() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(LOCK_BUSY, 1);
        assert_eq!(INSECURE_LOCATION, 3);
        assert_eq!(COMMAND_NOT_EXECUTABLE, 126);
        assert_eq!(COMMAND_NOT_FOUND, 127);
    }
}
