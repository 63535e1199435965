//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{ConnectionSpec, ExecRecord, ExecutorConfig};

// ── Remote Host Port Traits ───────────────────────────────────────────────────

/// Delivers file content to the target.
#[allow(async_fn_in_trait)]
pub trait FileTransfer {
    /// Write `content` to `destination` on the target, replacing any existing
    /// file. A non-zero exit in the returned output means the write failed.
    async fn upload(&self, content: &[u8], destination: &str) -> Result<Output>;
}

/// Command execution on the target.
#[allow(async_fn_in_trait)]
pub trait ShellExecutor {
    /// Run one shell command and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when `timeout` elapses. On
    /// timeout the local transport process must be killed.
    async fn exec(&self, command: &str, timeout: Duration) -> Result<Output>;
}

/// Composite trait: a connected target that accepts files and commands.
pub trait RemoteHost: FileTransfer + ShellExecutor {}

/// Blanket implementation: any type implementing both sub-traits is a `RemoteHost`.
impl<T> RemoteHost for T where T: FileTransfer + ShellExecutor {}

/// Opens a session to the target described by a [`ConnectionSpec`].
///
/// The returned host owns every resource of the session and releases it on
/// drop.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Host: RemoteHost;

    async fn connect(&self, spec: &ConnectionSpec) -> Result<Self::Host>;
}

// ── Local Collaborator Ports ──────────────────────────────────────────────────

/// Reads the bytes behind a file's `source` reference.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// The fleet directory: knows the default relay host for the fleet.
pub trait RelayDirectory {
    /// Default relay host, or `None` to connect directly.
    fn default_relay_host(&self) -> Option<String>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`, bounded by the
    /// instance's default timeout.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Persistence Ports ─────────────────────────────────────────────────────────

/// Loads hostexec settings.
pub trait ConfigStore {
    /// Load settings, falling back to defaults when no file exists.
    fn load(&self) -> Result<ExecutorConfig>;
    /// Location of the settings file.
    fn path(&self) -> Result<PathBuf>;
}

/// Persists the record of a successful run for the caller.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Check that a record can be written, before any remote work starts.
    fn prepare(&self) -> Result<()>;
    async fn save(&self, record: &ExecRecord) -> Result<()>;
}
