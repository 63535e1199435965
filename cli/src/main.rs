//! hostexec - remote provisioning over SSH

use std::process::ExitCode;

use clap::Parser;

use hostexec::app::AppContext;
use hostexec::cli::Cli;
use hostexec::domain::{ConfigError, ExecError, SettingsError};
use hostexec::output::json;

/// Machine-readable code for a top-level error.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(exec) = err.downcast_ref::<ExecError>() {
        exec.code()
    } else if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<SettingsError>().is_some()
    {
        "configuration"
    } else {
        "error"
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let app = AppContext::new(&cli.output_flags());

    if let Err(e) = hostexec::logging::init(cli.debug_log.as_deref()) {
        eprintln!("Warning: {e:#}");
    }

    match cli.run(&app).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "command failed");
            if app.is_json() {
                match json::format_error(&format!("{e:#}"), error_code(&e)) {
                    Ok(out) => println!("{out}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                app.output.error(&format!("Error: {e:#}"));
            }
            ExitCode::FAILURE
        }
    }
}
