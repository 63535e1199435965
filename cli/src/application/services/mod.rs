//! Application services: use-case orchestration.
//!
//! Each service module implements one stage of a run by composing domain
//! logic with port trait calls. Services import only from `crate::domain`
//! and `crate::application`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod commands;
pub mod host_exec;
pub mod provision;
pub mod readiness;

#[cfg(test)]
pub(crate) mod test_support;

use std::process::Output;

use anyhow::Result;

/// Turn a non-zero exit into an error carrying the exit code and stderr.
pub(crate) fn ensure_success(output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    Err(exit_failure(output.status.code(), &output.stderr))
}

/// Error for a remote process that did not exit 0.
pub(crate) fn exit_failure(code: Option<i32>, stderr: &[u8]) -> anyhow::Error {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    let status = code.map_or_else(
        || "terminated by signal".to_string(),
        |c| format!("exited with status {c}"),
    );
    if stderr.is_empty() {
        anyhow::anyhow!("{status}")
    } else {
        anyhow::anyhow!("{status}: {stderr}")
    }
}
