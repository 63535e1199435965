//! Shared test helpers: output constructors, request builders and policies.

#![allow(dead_code)]

use std::process::{ExitStatus, Output};
use std::time::Duration;

use hostexec::domain::{ExecRequest, FileDecl, ReadinessPolicy, RunPolicy};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
/// On Windows `ExitStatusExt::from_raw` takes the exit code directly.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

/// A request for `core@10.0.0.5` using the SSH agent.
pub fn request(commands: &[&str]) -> ExecRequest {
    ExecRequest {
        host: "10.0.0.5".to_string(),
        user: "core".to_string(),
        agent: true,
        commands: commands.iter().map(ToString::to_string).collect(),
        ..ExecRequest::default()
    }
}

pub fn inline_file(destination: &str, content: &str) -> FileDecl {
    FileDecl {
        content: Some(content.to_string()),
        destination: destination.to_string(),
        ..FileDecl::default()
    }
}

pub fn source_file(destination: &str, source: &str) -> FileDecl {
    FileDecl {
        source: Some(source.to_string()),
        destination: destination.to_string(),
        ..FileDecl::default()
    }
}

/// Readiness probe used by every service test.
pub const PROBE: &str = "docker volume ls";

pub fn policy() -> RunPolicy {
    RunPolicy {
        port: 22,
        command_timeout: Duration::from_secs(300),
        transfer_timeout: Duration::from_secs(300),
        readiness: ReadinessPolicy {
            command: PROBE.to_string(),
            interval: Duration::from_secs(5),
            deadline: Duration::from_secs(20),
            probe_timeout: Duration::from_secs(60),
        },
    }
}
