//! Shared mock infrastructure for unit tests.
//!
//! The connector and every host it opens append to one shared log, so a test
//! can assert on the exact order of connects, uploads and commands.

#![allow(dead_code, clippy::expect_used)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use hostexec::application::ports::{
    CommandRunner, Connector, ContentSource, FileTransfer, ProgressReporter, RelayDirectory,
    ShellExecutor,
};
use hostexec::domain::ConnectionSpec;

use crate::helpers::{err_output, ok_output};

pub type Log = Arc<Mutex<Vec<String>>>;
type ExecScript = Arc<dyn Fn(&str) -> Result<Output> + Send + Sync>;

/// Behaves like `sh -c` for `echo X`, `true`, `false` and anything else
/// succeeding silently.
pub fn shell_like(command: &str) -> Result<Output> {
    match command {
        "false" => Ok(err_output(1, b"")),
        other => match other.strip_prefix("echo ") {
            Some(text) => Ok(ok_output(format!("{text}\n").as_bytes())),
            None => Ok(ok_output(b"")),
        },
    }
}

// ── Connector / host ─────────────────────────────────────────────────────────

pub struct RecordingConnector {
    pub log: Log,
    pub specs: Arc<Mutex<Vec<ConnectionSpec>>>,
    exec: ExecScript,
    fail_connect: bool,
}

impl RecordingConnector {
    pub fn new(exec: impl Fn(&str) -> Result<Output> + Send + Sync + 'static) -> Self {
        Self {
            log: Arc::default(),
            specs: Arc::default(),
            exec: Arc::new(exec),
            fail_connect: false,
        }
    }

    pub fn shell() -> Self {
        Self::new(shell_like)
    }

    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::shell()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("log").clone()
    }

    pub fn specs(&self) -> Vec<ConnectionSpec> {
        self.specs.lock().expect("specs").clone()
    }
}

impl Connector for RecordingConnector {
    type Host = RecordingHost;

    async fn connect(&self, spec: &ConnectionSpec) -> Result<RecordingHost> {
        self.log
            .lock()
            .expect("log")
            .push(format!("connect {}", spec.target));
        self.specs.lock().expect("specs").push(spec.clone());
        if self.fail_connect {
            anyhow::bail!("cannot create identity file");
        }
        Ok(RecordingHost {
            log: Arc::clone(&self.log),
            exec: Arc::clone(&self.exec),
        })
    }
}

pub struct RecordingHost {
    log: Log,
    exec: ExecScript,
}

impl FileTransfer for RecordingHost {
    async fn upload(&self, content: &[u8], destination: &str) -> Result<Output> {
        self.log.lock().expect("log").push(format!(
            "upload {destination} {}",
            String::from_utf8_lossy(content)
        ));
        Ok(ok_output(b""))
    }
}

impl ShellExecutor for RecordingHost {
    async fn exec(&self, command: &str, _timeout: Duration) -> Result<Output> {
        self.log.lock().expect("log").push(format!("exec {command}"));
        (self.exec)(command)
    }
}

// ── Local collaborators ──────────────────────────────────────────────────────

/// In-memory `ContentSource`.
#[derive(Default)]
pub struct MapSource(pub HashMap<PathBuf, Vec<u8>>);

impl MapSource {
    pub fn with(path: &str, content: &[u8]) -> Self {
        let mut map = HashMap::new();
        map.insert(PathBuf::from(path), content.to_vec());
        Self(map)
    }
}

impl ContentSource for MapSource {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such file or directory"))
    }
}

/// Fleet directory with a fixed default relay.
pub struct FixedRelay(pub Option<&'static str>);

impl RelayDirectory for FixedRelay {
    fn default_relay_host(&self) -> Option<String> {
        self.0.map(ToString::to_string)
    }
}

pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

// ── Command runner spy ───────────────────────────────────────────────────────

/// One recorded invocation of the `CommandRunner` port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

/// Records every invocation and answers with a fixed exit code and stderr.
#[derive(Clone)]
pub struct RecordingRunner {
    pub calls: Arc<Mutex<Vec<RunnerCall>>>,
    code: i32,
    stderr: &'static [u8],
}

impl RecordingRunner {
    pub fn ok() -> Self {
        Self::exiting(0, b"")
    }

    pub fn exiting(code: i32, stderr: &'static [u8]) -> Self {
        Self {
            calls: Arc::default(),
            code,
            stderr,
        }
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().expect("calls").clone()
    }

    fn record(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Output {
        self.calls.lock().expect("calls").push(RunnerCall {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            stdin: stdin.map(<[u8]>::to_vec),
            timeout,
        });
        if self.code == 0 {
            ok_output(b"")
        } else {
            err_output(self.code, self.stderr)
        }
    }
}

impl CommandRunner for RecordingRunner {
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        Ok(self.record(program, args, None, Some(timeout)))
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output> {
        Ok(self.record(program, args, Some(stdin), None))
    }
}
