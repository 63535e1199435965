//! Typed domain error enums.
//!
//! `ConfigError` covers everything detected before the first network call.
//! `ExecError` is the single terminal diagnostic of one run: it names the
//! stage that failed and, where it applies, the file or command involved.

use std::fmt;

use thiserror::Error;

use crate::domain::request::MAX_COMMANDS;

// ── Stages ────────────────────────────────────────────────────────────────────

/// The stage of a run an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Transfer,
    Readiness,
    Command,
}

impl Stage {
    /// Stable machine-readable name, used as the JSON error `code`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Transfer => "transfer",
            Self::Readiness => "readiness",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Configuration errors ──────────────────────────────────────────────────────

/// Errors in the declared request, raised before any network action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host is required")]
    MissingHost,

    #[error("user required when commands or files are declared")]
    MissingUser,

    #[error("invalid user '{value}'")]
    InvalidUser { value: String },

    #[error("no authentication method available: set 'private_key' or enable 'agent'")]
    NoAuthMethod,

    #[error("ambiguous authentication: key and agent both specified")]
    AmbiguousAuth,

    #[error("too many commands: {count} declared, at most {max} allowed", max = MAX_COMMANDS)]
    TooManyCommands { count: usize },

    #[error("command #{index} is empty")]
    EmptyCommand { index: usize },

    #[error("file #{index}: destination is required")]
    MissingDestination { index: usize },

    #[error("file '{destination}': exactly one of 'source' or 'content' must be set")]
    FileOrigin { destination: String },

    #[error("file '{destination}': invalid permissions '{value}' (expected octal mode such as 0644)")]
    InvalidPermissions { destination: String, value: String },

    #[error("file '{destination}': invalid {property} '{value}'")]
    InvalidPrincipal {
        destination: String,
        property: &'static str,
        value: String,
    },

    #[error("file '{destination}' is declared more than once")]
    DuplicateDestination { destination: String },
}

// ── Settings errors ───────────────────────────────────────────────────────────

/// Errors in the executor's own settings file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },

    #[error(
        "readiness.interval_secs ({interval}) must not exceed readiness.deadline_secs ({deadline})"
    )]
    IntervalExceedsDeadline { interval: u64, deadline: u64 },

    #[error("invalid ssh.strict_host_key_checking '{value}'. Valid values: {valid}")]
    InvalidHostKeyPolicy { value: String, valid: String },

    #[error("ssh.program must not be empty")]
    EmptyProgram,

    #[error("readiness.command must not be empty")]
    EmptyProbe,

    #[error("invalid proxy in {var} '{value}': {reason}")]
    InvalidProxy {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

// ── Execution errors ──────────────────────────────────────────────────────────

/// The terminal failure of one run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("reading source '{path}' for '{destination}': {cause:#}")]
    Source {
        path: String,
        destination: String,
        cause: anyhow::Error,
    },

    #[error("connecting to '{target}': {cause:#}")]
    Connection { target: String, cause: anyhow::Error },

    #[error("copying file to '{destination}': {cause:#}")]
    Transfer {
        destination: String,
        cause: anyhow::Error,
    },

    #[error("setting {property} on '{destination}': {cause:#}")]
    Metadata {
        destination: String,
        property: &'static str,
        cause: anyhow::Error,
    },

    #[error("host '{host}' not ready after {waited_secs}s: {last_failure}")]
    ReadinessTimeout {
        host: String,
        waited_secs: u64,
        last_failure: String,
    },

    #[error("command [{command}]: {cause:#}")]
    Command {
        index: usize,
        command: String,
        cause: anyhow::Error,
    },

    #[error("cancelled during {stage} stage")]
    Cancelled { stage: Stage },
}

impl ExecError {
    /// The stage this failure belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Configuration,
            Self::Source { .. }
            | Self::Connection { .. }
            | Self::Transfer { .. }
            | Self::Metadata { .. } => Stage::Transfer,
            Self::ReadinessTimeout { .. } => Stage::Readiness,
            Self::Command { .. } => Stage::Command,
            Self::Cancelled { stage } => *stage,
        }
    }

    /// Machine-readable error code: the stage name, or `cancelled`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => "cancelled",
            other => other.stage().as_str(),
        }
    }
}
