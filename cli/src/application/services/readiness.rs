//! Readiness polling: run the probe until it succeeds or the deadline passes.

use tokio::time::Instant;

use crate::application::cancel::CancelToken;
use crate::application::ports::{ProgressReporter, ShellExecutor};
use crate::application::services::exit_failure;
use crate::domain::{ExecError, ReadinessPolicy, Stage};

/// Poll `host` with the probe command at a fixed interval.
///
/// Each attempt is bounded by the probe timeout, clipped to whatever is left
/// of the deadline. Returns the number of attempts made.
///
/// # Errors
///
/// Returns [`ExecError::ReadinessTimeout`] with the last probe failure once
/// the deadline is reached.
pub async fn wait_ready(
    host: &impl ShellExecutor,
    address: &str,
    policy: &ReadinessPolicy,
    reporter: &impl ProgressReporter,
    cancel: &CancelToken,
) -> Result<u32, ExecError> {
    reporter.step(&format!("waiting for {address} to accept commands..."));
    let started = Instant::now();
    let mut attempt = 0u32;
    let mut last_failure = String::new();

    loop {
        let remaining = policy.deadline.saturating_sub(started.elapsed());
        if attempt > 0 && remaining.is_zero() {
            break;
        }
        attempt += 1;

        let probe = host.exec(&policy.command, policy.probe_timeout.min(remaining));
        let failure = match cancel.guard(Stage::Readiness, probe).await? {
            Ok(output) if output.status.success() => {
                tracing::info!(address, attempt, "host ready");
                reporter.success(&format!("{address} is ready"));
                return Ok(attempt);
            }
            Ok(output) => exit_failure(output.status.code(), &output.stderr),
            Err(e) => e,
        };
        last_failure = format!("{failure:#}");
        tracing::warn!(address, attempt, error = %last_failure, "readiness probe failed");

        let remaining = policy.deadline.saturating_sub(started.elapsed());
        cancel
            .guard(
                Stage::Readiness,
                tokio::time::sleep(policy.interval.min(remaining)),
            )
            .await?;
    }

    Err(ExecError::ReadinessTimeout {
        host: address.to_string(),
        waited_secs: started.elapsed().as_secs(),
        last_failure,
    })
}
