//! Withlock: run a command while holding an exclusive advisory file lock.
//!
//! This is the main entry point for the `withlock` CLI. It parses arguments,
//! runs the validate/lock/supervise pipeline, and maps the outcome to the
//! process exit code:
//! - the child's own exit code when the lock was acquired and the child ran
//! - 1 when the lock is busy or the wait timed out
//! - 3 when the lock file sits in an insecure directory

mod cli;
mod error;
mod exit_codes;
mod locks;
mod runner;
mod supervise;
mod validate;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let quiet = cli.quiet;

    match runner::run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // --quiet silences the two contention outcomes only; every other
            // failure is always reported.
            if !(quiet && err.is_lock_busy()) {
                eprintln!("Error: {}", err);
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
