//! `hostexec run`: execute a request against its host.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::cancel::cancel_pair;
use crate::application::ports::RecordStore;
use crate::application::services::host_exec;
use crate::domain::ExecRecord;
use crate::infra::fleet::ConfiguredFleet;
use crate::infra::proxy::HttpTunnel;
use crate::infra::record::RecordFile;
use crate::infra::request::load_request;
use crate::infra::source::LocalContentSource;
use crate::infra::ssh::{OpenSshConnector, SshOptions};
use crate::output::TerminalReporter;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Request file (YAML)
    pub request: PathBuf,

    /// Write a JSON record of the run to this file on success
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,
}

/// Entry point for `hostexec run`.
///
/// Relative `source` paths in the request resolve against the request
/// file's directory. Ctrl-C cancels the run at the next stage boundary and
/// kills any in-flight `ssh` process.
///
/// # Errors
///
/// Returns an error if the request or settings cannot be loaded, the record
/// path is not writable, or the run fails at any stage. A record that cannot
/// be saved after a successful run is reported on stderr and the outcome is
/// still rendered.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<ExitCode> {
    let request = load_request(&args.request)?;
    let config = app.load_config()?;
    let policy = config.run_policy();

    let record = args
        .record
        .as_ref()
        .map(|path| (path, RecordFile::new(path.clone())));
    if let Some((path, store)) = &record {
        store
            .prepare()
            .with_context(|| format!("cannot write run record {}", path.display()))?;
    }

    let fleet = ConfiguredFleet::new(&config.fleet);
    let connector = OpenSshConnector::spawning(
        SshOptions::from(&config.ssh).with_http_tunnel(HttpTunnel::from_env()?),
        policy.transfer_timeout,
        policy.command_timeout,
    );
    let base_dir = args
        .request
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let sources = LocalContentSource::new(base_dir);

    let (handle, token) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            handle.cancel();
        }
    });

    let reporter = TerminalReporter::new(&app.output);
    let result = host_exec::execute(
        &request,
        &policy,
        &fleet,
        &connector,
        &sources,
        &reporter,
        &token,
    )
    .await;
    interrupt.abort();
    drop(reporter);
    let outcome = result?;

    // The remote work is done at this point; a failed save must not hide it.
    let saved = match &record {
        Some((path, store)) => store
            .save(&ExecRecord::new(&outcome, &request.triggers))
            .await
            .with_context(|| format!("cannot write run record {}", path.display())),
        None => Ok(()),
    };

    app.renderer().render_outcome(&outcome)?;
    if let Err(e) = saved {
        tracing::error!(id = %outcome.id, error = %format!("{e:#}"), "run record not written");
        app.output.error(&format!("run {} succeeded, but {e:#}", outcome.id));
    }
    Ok(ExitCode::SUCCESS)
}
