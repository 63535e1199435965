//! Human-readable terminal renderer.

use std::path::Path;

use anyhow::Result;

use owo_colors::OwoColorize as _;

use crate::domain::{Auth, ExecOutcome, ExecPlan, ExecutorConfig};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) -> Result<()> {
        println!("hostexec {version}");
        Ok(())
    }

    /// Render the outcome of a run. The result is printed verbatim on stdout
    /// even when quiet, so it can be piped.
    pub fn render_outcome(&self, outcome: &ExecOutcome) -> Result<()> {
        if !self.ctx.quiet {
            println!();
            self.ctx.kv("id:", &outcome.id.to_string());
            self.ctx.kv(
                "done:",
                &format!(
                    "{} file(s), {} command(s)",
                    outcome.files_provisioned, outcome.commands_run
                ),
            );
            if !outcome.result.is_empty() {
                self.ctx.header("result:");
            }
        }
        print!("{}", outcome.result);
        Ok(())
    }

    /// Render a validated plan.
    pub fn render_plan(&self, plan: &ExecPlan) -> Result<()> {
        let Some(connection) = &plan.connection else {
            self.ctx
                .success("request is valid (no files or commands, nothing to run)");
            return Ok(());
        };
        self.ctx.success("request is valid");
        self.ctx.kv("target:", &connection.target.to_string());
        if let Some(relay) = &connection.relay {
            self.ctx.kv("relay:", &relay.to_string());
        }
        let auth = match connection.auth {
            Auth::PrivateKey(_) => "private key",
            Auth::Agent => "ssh agent",
        };
        self.ctx.kv("auth:", auth);
        for file in &plan.files {
            self.ctx.kv("file:", &file.destination);
        }
        for (i, command) in plan.commands.iter().enumerate() {
            self.ctx.kv(&format!("command {}:", i + 1), command);
        }
        Ok(())
    }

    /// Render the effective hostexec settings.
    pub fn render_config(&self, config: &ExecutorConfig, path: &Path) -> Result<()> {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let known_hosts = config.ssh.known_hosts_file.as_deref().unwrap_or("(default)");
        let bastion = if config.fleet.bastion_host.is_empty() {
            "(direct)"
        } else {
            config.fleet.bastion_host.as_str()
        };
        for (key, value) in [
            ("ssh.program:", config.ssh.program.clone()),
            ("ssh.port:", config.ssh.port.to_string()),
            ("ssh.connect_timeout_secs:", config.ssh.connect_timeout_secs.to_string()),
            ("ssh.strict_host_key_checking:", config.ssh.strict_host_key_checking.clone()),
            ("ssh.known_hosts_file:", known_hosts.to_string()),
            ("timeouts.command_secs:", config.timeouts.command_secs.to_string()),
            ("timeouts.transfer_secs:", config.timeouts.transfer_secs.to_string()),
            ("readiness.command:", config.readiness.command.clone()),
            ("readiness.interval_secs:", config.readiness.interval_secs.to_string()),
            ("readiness.deadline_secs:", config.readiness.deadline_secs.to_string()),
            ("readiness.probe_timeout_secs:", config.readiness.probe_timeout_secs.to_string()),
            ("fleet.bastion_host:", bastion.to_string()),
        ] {
            println!("  {key:<32} {value}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["HOSTEXEC_CONFIG", "HOSTEXEC_BASTION_HOST", "HOSTEXEC_DEBUG_LOG", "RUST_LOG", "NO_COLOR"] {
            println!(
                "    {:<24} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
        Ok(())
    }
}
