//! Child process supervision.
//!
//! Spawns the command with inherited standard streams, then waits for it to
//! finish. Termination signals received by the wrapper while waiting are
//! relayed to the child, so killing the wrapper cannot leave the child
//! running (and the lock effectively held) past the wrapper's own lifetime.

use crate::error::{Result, WithlockError};
use crate::exit_codes;
use std::io;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::Duration;

/// Poll interval while waiting for the child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Signals relayed to the child while it runs.
const FORWARDED_SIGNALS: [libc::c_int; 4] =
    [libc::SIGHUP, libc::SIGINT, libc::SIGTERM, libc::SIGQUIT];

/// Last termination signal received by the wrapper, not yet relayed.
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn note_signal(signal: libc::c_int) {
    PENDING_SIGNAL.store(signal, Ordering::SeqCst);
}

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildOutcome {
    /// Exit code, if the child exited normally.
    pub code: Option<i32>,

    /// Terminating signal, if the child was killed by one.
    pub signal: Option<i32>,
}

impl ChildOutcome {
    /// Final exit code for the wrapper: the child's own code, or 128 plus
    /// the signal number for a signal-killed child.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            Some(code) => code,
            None => self.signal.map(|s| 128 + s).unwrap_or(1),
        }
    }
}

/// Spawn `command` and block until it terminates.
///
/// Standard streams are inherited, so the child's output appears exactly as
/// if it were run directly.
///
/// # Returns
///
/// * `Ok(ChildOutcome)` - The child was reaped; its exit code or signal
/// * `Err(WithlockError::SpawnFailure)` - The command could not be started
pub fn run(command: &[String]) -> Result<ChildOutcome> {
    let Some((program, args)) = command.split_first() else {
        return Err(WithlockError::Io("no command to run".to_string()));
    };

    install_signal_forwarders();

    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    reap(&mut child, program)
}

/// Wait for the child, relaying any termination signal the wrapper receives.
fn reap(child: &mut Child, program: &str) -> Result<ChildOutcome> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                use std::os::unix::process::ExitStatusExt;
                return Ok(ChildOutcome {
                    code: status.code(),
                    signal: status.signal(),
                });
            }
            Ok(None) => {
                relay_pending_signal(child);
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(WithlockError::Io(format!(
                    "failed to wait for '{}': {}",
                    program, e
                )));
            }
        }
    }
}

/// Forward a termination signal received by the wrapper to the child.
fn relay_pending_signal(child: &Child) {
    let signal = PENDING_SIGNAL.swap(0, Ordering::SeqCst);
    if signal != 0 {
        unsafe {
            libc::kill(child.id() as libc::pid_t, signal);
        }
    }
}

fn install_signal_forwarders() {
    unsafe {
        for signal in FORWARDED_SIGNALS {
            libc::signal(signal, note_signal as libc::sighandler_t);
        }
    }
}

fn spawn_error(program: &str, error: &io::Error) -> WithlockError {
    let code = match error.kind() {
        io::ErrorKind::PermissionDenied => exit_codes::COMMAND_NOT_EXECUTABLE,
        _ => exit_codes::COMMAND_NOT_FOUND,
    };

    WithlockError::SpawnFailure {
        command: program.to_string(),
        code,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_child_outcome_exit_code_mapping() {
        let ran = ChildOutcome {
            code: Some(0),
            signal: None,
        };
        assert_eq!(ran.exit_code(), 0);

        let failed = ChildOutcome {
            code: Some(7),
            signal: None,
        };
        assert_eq!(failed.exit_code(), 7);

        let killed = ChildOutcome {
            code: None,
            signal: Some(libc::SIGTERM),
        };
        assert_eq!(killed.exit_code(), 143);

        let unknown = ChildOutcome {
            code: None,
            signal: None,
        };
        assert_eq!(unknown.exit_code(), 1);
    }

    #[test]
    #[serial]
    fn test_run_successful_command() {
        let outcome = run(&cmd(&["true"])).unwrap();
        assert_eq!(outcome.code, Some(0));
        assert_eq!(outcome.signal, None);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    #[serial]
    fn test_run_passes_through_nonzero_exit() {
        let outcome = run(&cmd(&["sh", "-c", "exit 7"])).unwrap();
        assert_eq!(outcome.exit_code(), 7);
    }

    #[test]
    #[serial]
    fn test_run_nonexistent_command() {
        let err = run(&cmd(&["withlock-test-no-such-command"])).unwrap_err();
        assert!(matches!(err, WithlockError::SpawnFailure { .. }));
        assert_eq!(err.exit_code(), exit_codes::COMMAND_NOT_FOUND);
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    #[serial]
    fn test_run_signal_killed_child() {
        // The child terminates itself with SIGTERM; the wrapper must report
        // 128 + 15.
        let outcome = run(&cmd(&["sh", "-c", "kill -TERM $$"])).unwrap();
        assert_eq!(outcome.code, None);
        assert_eq!(outcome.signal, Some(libc::SIGTERM));
        assert_eq!(outcome.exit_code(), 143);
    }

    #[test]
    #[serial]
    fn test_run_empty_command() {
        let err = run(&[]).unwrap_err();
        assert!(matches!(err, WithlockError::Io(_)));
    }
}
