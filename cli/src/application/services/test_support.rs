//! Shared test helpers for service tests.
//!
//! Provides cross-platform `exit_status()` and a scripted `RemoteHost` spy
//! that records every call in order.

use std::cell::RefCell;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{FileTransfer, ShellExecutor};

/// Build an `ExitStatus` from a logical exit code (cross-platform).
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn fail_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

type ExecScript = Box<dyn Fn(&str) -> Result<Output>>;

/// Host spy. Uploads succeed unless their destination is listed in
/// `failing_uploads`; commands are answered by the exec script.
pub struct ScriptedHost {
    pub calls: RefCell<Vec<String>>,
    pub uploads: RefCell<Vec<(String, Vec<u8>)>>,
    pub failing_uploads: Vec<String>,
    exec_script: ExecScript,
}

impl ScriptedHost {
    /// Every command succeeds and echoes nothing.
    pub fn ok() -> Self {
        Self::with_exec(|_| Ok(ok_output(b"")))
    }

    pub fn with_exec(script: impl Fn(&str) -> Result<Output> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
            failing_uploads: Vec::new(),
            exec_script: Box::new(script),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl FileTransfer for ScriptedHost {
    async fn upload(&self, content: &[u8], destination: &str) -> Result<Output> {
        self.calls.borrow_mut().push(format!("upload {destination}"));
        if self.failing_uploads.iter().any(|d| d == destination) {
            return Ok(fail_output(1, b"Permission denied"));
        }
        self.uploads
            .borrow_mut()
            .push((destination.to_string(), content.to_vec()));
        Ok(ok_output(b""))
    }
}

impl ShellExecutor for ScriptedHost {
    async fn exec(&self, command: &str, _timeout: Duration) -> Result<Output> {
        self.calls.borrow_mut().push(format!("exec {command}"));
        (self.exec_script)(command)
    }
}
