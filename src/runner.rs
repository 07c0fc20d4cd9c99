//! External command execution behind a trait seam.
//!
//! Image builds shell out to provisioning tools (formatting a device, copying
//! a root filesystem onto it). The [`CommandRunner`] trait keeps those call
//! sites testable; [`ProcessCommandRunner`] is the host-backed implementation
//! and additionally supports a dry-run mode that logs the command instead of
//! executing it.

use std::ffi::OsString;
use std::process::Command;

use thiserror::Error;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Output representing a command that was skipped but counts as success.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Errors surfaced while executing external commands.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner {
    dry_run: bool,
}

impl ProcessCommandRunner {
    /// Creates a runner that executes commands on the host.
    #[must_use]
    pub const fn new() -> Self {
        Self { dry_run: false }
    }

    /// Creates a runner that logs commands instead of executing them.
    #[must_use]
    pub const fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        if self.dry_run {
            tracing::info!(program, ?args, "dry run, skipping command");
            return Ok(CommandOutput::skipped());
        }

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| RunnerError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
