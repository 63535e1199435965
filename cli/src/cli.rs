//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Upload files to a remote host over SSH and run commands on it
#[derive(Parser)]
#[command(
    name = "hostexec",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Append debug logs, including command output, to this file
    #[arg(long, global = true, env = "HOSTEXEC_DEBUG_LOG", value_name = "FILE")]
    pub debug_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload files and run commands on a remote host
    Run(commands::run::RunArgs),

    /// Check a request without connecting
    Validate(commands::validate::ValidateArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,

    #[command(hide = true, name = "_http-connect")]
    HttpConnect(commands::internal::HttpConnectArgs),
}

impl Cli {
    /// Output flags for building the `AppContext`.
    #[must_use]
    pub fn output_flags(&self) -> OutputFlags {
        OutputFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            json: self.json,
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, app: &AppContext) -> Result<ExitCode> {
        match self.command {
            Command::Run(args) => commands::run::run(app, &args).await,
            Command::Validate(args) => commands::validate::run(app, &args),
            Command::Config(cmd) => commands::config::run(app, &cmd),
            Command::Version => commands::version::run(app),
            Command::HttpConnect(args) => commands::internal::http_connect(&args).await,
        }
    }
}
