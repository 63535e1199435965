//! Application service: execute one request against one host.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use crate::application::cancel::CancelToken;
use crate::application::ports::{Connector, ContentSource, ProgressReporter, RelayDirectory};
use crate::application::services::{
    commands::run_commands,
    provision::{provision_files, resolve_contents},
    readiness::wait_ready,
};
use crate::domain::{
    ConfigError, ExecError, ExecOutcome, ExecPlan, ExecRequest, ExecutionId, RunPolicy, Stage,
};

/// Validate `request` and build its plan, with no network action.
///
/// The default relay is resolved once from the fleet directory.
///
/// # Errors
///
/// Returns the first [`ConfigError`] in the request.
pub fn plan_request(
    request: &ExecRequest,
    relays: &impl RelayDirectory,
    port: u16,
) -> Result<ExecPlan, ConfigError> {
    let default_relay = relays.default_relay_host();
    request.plan(default_relay.as_deref(), port)
}

/// Run a request end to end: validate, upload files, wait for readiness,
/// run commands.
///
/// Every stage is a hard gate. A request with no files and no commands
/// succeeds without opening a connection.
///
/// # Errors
///
/// Returns a single [`ExecError`] naming the failed stage.
pub async fn execute(
    request: &ExecRequest,
    policy: &RunPolicy,
    relays: &impl RelayDirectory,
    connector: &impl Connector,
    sources: &impl ContentSource,
    reporter: &impl ProgressReporter,
    cancel: &CancelToken,
) -> Result<ExecOutcome, ExecError> {
    let plan = plan_request(request, relays, policy.port)?;
    let Some(connection) = plan.connection.as_ref() else {
        tracing::info!("no files or commands declared, nothing to do");
        reporter.warn("no files or commands declared, nothing to run");
        return Ok(ExecOutcome::empty());
    };

    let files = resolve_contents(&plan.files, sources, cancel).await?;

    let endpoint = connection.target.to_string();
    match &connection.relay {
        Some(relay) => reporter.step(&format!("connecting to {endpoint} via {}...", relay.host)),
        None => reporter.step(&format!("connecting to {endpoint}...")),
    }
    let host = cancel
        .guard(Stage::Transfer, connector.connect(connection))
        .await?
        .map_err(|cause| ExecError::Connection {
            target: endpoint.clone(),
            cause,
        })?;
    tracing::info!(
        endpoint = %endpoint,
        relay = ?connection.relay.as_ref().map(|r| &r.host),
        "session opened"
    );

    let files_provisioned =
        provision_files(&host, &files, policy.transfer_timeout, reporter, cancel).await?;

    wait_ready(
        &host,
        &connection.target.host,
        &policy.readiness,
        reporter,
        cancel,
    )
    .await?;

    let last = run_commands(
        &host,
        &plan.commands,
        policy.command_timeout,
        reporter,
        cancel,
    )
    .await?;

    let outcome = ExecOutcome {
        id: ExecutionId::generate(),
        result: last.map(|report| report.stdout).unwrap_or_default(),
        files_provisioned,
        commands_run: plan.commands.len(),
    };
    tracing::info!(
        id = %outcome.id,
        files = files_provisioned,
        commands = outcome.commands_run,
        "run succeeded"
    );
    Ok(outcome)
}
