//! The withlock run pipeline.
//!
//! A single linear pass: validate the lock location, acquire the lock under
//! the configured wait policy, run the child to completion, release the
//! lock. The guard lives across the whole supervision step, so the lock is
//! only released once the child has been reaped, on success and error paths
//! alike.

use crate::cli::Cli;
use crate::error::Result;
use crate::locks;
use crate::supervise;
use crate::validate;

/// Validate, lock, run. Returns the wrapper's final exit code.
pub fn run(cli: &Cli) -> Result<i32> {
    let lock_path = validate::validate_lock_location(&cli.lockfile)?;

    let command_display = shell_words::join(&cli.command);
    let _guard = locks::acquire(&lock_path, cli.wait_policy(), &command_display)?;

    let outcome = supervise::run(&cli.command)?;
    Ok(outcome.exit_code())
}
