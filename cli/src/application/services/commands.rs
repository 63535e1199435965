//! Sequential command execution with fail-fast.

use std::time::Duration;

use crate::application::cancel::CancelToken;
use crate::application::ports::{ProgressReporter, ShellExecutor};
use crate::application::services::exit_failure;
use crate::domain::{CommandReport, ExecError, Stage};

/// Run `commands` in order, each bounded by `timeout`.
///
/// Returns the report of the last command, or `None` when the list is empty.
///
/// # Errors
///
/// Returns [`ExecError::Command`] for the first command that exits non-zero,
/// times out or loses its transport. Later commands never run.
pub async fn run_commands(
    host: &impl ShellExecutor,
    commands: &[String],
    timeout: Duration,
    reporter: &impl ProgressReporter,
    cancel: &CancelToken,
) -> Result<Option<CommandReport>, ExecError> {
    let mut last = None;
    for (index, command) in commands.iter().enumerate() {
        reporter.step(&format!("running [{command}]..."));
        tracing::debug!(index, command = %command, "command");

        let output = match cancel.guard(Stage::Command, host.exec(command, timeout)).await? {
            Ok(output) => output,
            Err(cause) => {
                tracing::debug!(index, done = false, error = %format!("{cause:#}"), "done");
                return Err(ExecError::Command {
                    index,
                    command: command.clone(),
                    cause,
                });
            }
        };

        let report = CommandReport::finished(
            command,
            &output.stdout,
            &output.stderr,
            output.status.code(),
        );
        tracing::debug!(index, done = report.done, exit_code = ?report.exit_code, "done");
        tracing::debug!(index, stdout = %report.stdout, "stdout");
        tracing::debug!(index, stderr = %report.stderr, "stderr");

        if !report.succeeded() {
            return Err(ExecError::Command {
                index,
                command: command.clone(),
                cause: exit_failure(report.exit_code, &output.stderr),
            });
        }
        last = Some(report);
    }
    if !commands.is_empty() {
        reporter.success(&format!("{} command(s) completed", commands.len()));
    }
    Ok(last)
}
