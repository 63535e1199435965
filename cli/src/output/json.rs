//! JSON output renderer.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout: a command-specific payload on success, or the error object from
//! [`format_error`] on failure.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{Auth, ExecOutcome, ExecPlan, ExecutorConfig};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice: `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

fn print(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Machine-readable renderer.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print(&serde_json::json!({ "version": version }))
    }

    /// Render the published outputs of a successful run.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_outcome(outcome: &ExecOutcome) -> Result<()> {
        print(&serde_json::json!({
            "id": outcome.id,
            "result": outcome.result,
            "files": outcome.files_provisioned,
            "commands": outcome.commands_run,
        }))
    }

    /// Render a validated plan. Key material is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_plan(plan: &ExecPlan) -> Result<()> {
        let connection = plan.connection.as_ref().map(|c| {
            serde_json::json!({
                "target": c.target.to_string(),
                "relay": c.relay.as_ref().map(ToString::to_string),
                "auth": match c.auth {
                    Auth::PrivateKey(_) => "private_key",
                    Auth::Agent => "agent",
                },
            })
        });
        let files: Vec<&str> = plan.files.iter().map(|f| f.destination.as_str()).collect();
        print(&serde_json::json!({
            "valid": true,
            "connection": connection,
            "files": files,
            "commands": plan.commands,
        }))
    }

    /// Render the effective settings with the file they come from.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(config: &ExecutorConfig, path: &Path) -> Result<()> {
        print(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }
}
