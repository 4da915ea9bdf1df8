//! Shell command execution for `RunCommand` directives.
//!
//! The [`CommandExecutor`] trait decouples the turn loop from the host shell.
//! Tests use scripted executors that return predetermined results without
//! spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::types::ExecutionResult;
use crate::io::process::{CommandOutput, run_command_with_timeout};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over command execution backends.
pub trait CommandExecutor {
    /// Run `command` and classify the outcome.
    ///
    /// Failures of the command itself (non-zero exit, timeout, spawn errors)
    /// are reported as a failed [`ExecutionResult`], not as `Err`.
    fn run(&self, command: &str) -> Result<ExecutionResult>;
}

/// Executor that hands the literal command line to the host shell.
///
/// The child inherits the working directory and environment of this process.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            output_limit_bytes: 100_000,
        }
    }
}

impl CommandExecutor for ShellExecutor {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs()))]
    fn run(&self, command: &str) -> Result<ExecutionResult> {
        info!(command, "running shell command");
        let cmd = shell_command(command);
        let output = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %err, "command could not be run");
                return Ok(ExecutionResult::failure(format!(
                    "command failed to start: {err:#}"
                )));
            }
        };
        Ok(classify(&output, self.timeout))
    }
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Combine captured streams into feedback text and decide success.
fn classify(output: &CommandOutput, timeout: Duration) -> ExecutionResult {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        text.push_str("\nstderr: ");
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    text.push_str(&output.truncated_notice());
    if output.detached {
        text.push_str("\n[output stream left open by a background process]");
    }

    if output.timed_out {
        text.push_str(&format!(
            "\ncommand timed out after {}s and was killed",
            timeout.as_secs()
        ));
        return ExecutionResult {
            output: text,
            succeeded: false,
            exit_code: None,
        };
    }

    let exit_code = output.status.code();
    ExecutionResult {
        output: text,
        succeeded: exit_code == Some(0),
        exit_code,
    }
}
