//! CLI argument parsing for withlock.
//!
//! Uses clap derive macros for declarative argument definitions. Parsing is
//! all that happens here; the run pipeline lives in the `runner` module, and
//! `--help`/`--version` are answered by clap before any lock or filesystem
//! operation takes place.

use crate::locks::WaitPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Run a command while holding an exclusive lock on a file.
///
/// The lock is advisory: concurrent withlock invocations against the same
/// lock file serialize against each other, and the kernel releases the lock
/// automatically when the holder exits for any reason. The lock file itself
/// is created on demand and left in place for reuse.
#[derive(Parser, Debug)]
#[command(name = "withlock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Seconds to wait for a busy lock before giving up; 0 waits forever.
    ///
    /// Without this flag a busy lock fails immediately.
    #[arg(short = 'w', long = "wait", value_name = "SECONDS")]
    pub wait: Option<u64>,

    /// Suppress the diagnostic message when the lock is busy or the wait
    /// times out. Exit codes are unchanged.
    #[arg(short, long)]
    pub quiet: bool,

    /// Path of the lock file (created if absent).
    pub lockfile: PathBuf,

    /// Command to run while the lock is held, with its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// The wait policy selected by the flags.
    pub fn wait_policy(&self) -> WaitPolicy {
        match self.wait {
            None => WaitPolicy::NoWait,
            Some(0) => WaitPolicy::WaitForever,
            Some(secs) => WaitPolicy::WaitWithTimeout(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_minimal() {
        let cli = Cli::try_parse_from(["withlock", "job.lock", "echo", "hello"]).unwrap();
        assert_eq!(cli.lockfile, PathBuf::from("job.lock"));
        assert_eq!(cli.command, vec!["echo", "hello"]);
        assert_eq!(cli.wait, None);
        assert!(!cli.quiet);
    }

    #[test]
    fn parse_wait_and_quiet() {
        let cli =
            Cli::try_parse_from(["withlock", "-w", "2", "-q", "job.lock", "sleep", "5"]).unwrap();
        assert_eq!(cli.wait, Some(2));
        assert!(cli.quiet);
        assert_eq!(cli.command, vec!["sleep", "5"]);
    }

    #[test]
    fn parse_long_flags() {
        let cli = Cli::try_parse_from([
            "withlock",
            "--wait",
            "10",
            "--quiet",
            "job.lock",
            "true",
        ])
        .unwrap();
        assert_eq!(cli.wait, Some(10));
        assert!(cli.quiet);
    }

    #[test]
    fn parse_command_with_hyphenated_arguments() {
        let cli =
            Cli::try_parse_from(["withlock", "job.lock", "grep", "-r", "needle", "."]).unwrap();
        assert_eq!(cli.command, vec!["grep", "-r", "needle", "."]);
    }

    #[test]
    fn parse_missing_command_fails() {
        let result = Cli::try_parse_from(["withlock", "job.lock"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_missing_lockfile_fails() {
        let result = Cli::try_parse_from(["withlock"]);
        assert!(result.is_err());
    }

    #[test]
    fn help_and_version_are_informational() {
        let err = Cli::try_parse_from(["withlock", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["withlock", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn wait_policy_mapping() {
        let cli = Cli::try_parse_from(["withlock", "job.lock", "true"]).unwrap();
        assert_eq!(cli.wait_policy(), WaitPolicy::NoWait);

        let cli = Cli::try_parse_from(["withlock", "-w", "0", "job.lock", "true"]).unwrap();
        assert_eq!(cli.wait_policy(), WaitPolicy::WaitForever);

        let cli = Cli::try_parse_from(["withlock", "-w", "7", "job.lock", "true"]).unwrap();
        assert_eq!(
            cli.wait_policy(),
            WaitPolicy::WaitWithTimeout(Duration::from_secs(7))
        );
    }
}
