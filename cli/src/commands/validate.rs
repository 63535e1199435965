//! `hostexec validate`: check a request without touching the network.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::host_exec::plan_request;
use crate::infra::fleet::ConfiguredFleet;
use crate::infra::request::load_request;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Request file (YAML)
    pub request: PathBuf,
}

/// Entry point for `hostexec validate`.
///
/// # Errors
///
/// Returns the first configuration error in the request or the settings.
pub fn run(app: &AppContext, args: &ValidateArgs) -> Result<ExitCode> {
    let request = load_request(&args.request)?;
    let config = app.load_config()?;
    let fleet = ConfiguredFleet::new(&config.fleet);
    let plan = plan_request(&request, &fleet, config.ssh.port)?;
    app.renderer().render_plan(&plan)?;
    Ok(ExitCode::SUCCESS)
}
