//! Per-command reports and the published outcome of a run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::TriggerSet;

/// Opaque identifier of a successful run. Random; never derived from inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What one remote command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// The command ran to completion (it was not cut off by a timeout or a
    /// transport failure).
    pub done: bool,
    pub exit_code: Option<i32>,
}

impl CommandReport {
    /// Report for a command whose process finished with `exit_code`.
    /// Output bytes are decoded lossily: invalid UTF-8 becomes U+FFFD.
    #[must_use]
    pub fn finished(command: &str, stdout: &[u8], stderr: &[u8], exit_code: Option<i32>) -> Self {
        Self {
            command: command.to_string(),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            done: true,
            exit_code,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.done && self.exit_code == Some(0)
    }
}

/// The successful outcome of a run.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub id: ExecutionId,
    /// Stdout of the last command, or empty when no commands were declared.
    pub result: String,
    pub files_provisioned: usize,
    pub commands_run: usize,
}

impl ExecOutcome {
    /// Outcome of a run that had nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: ExecutionId::generate(),
            result: String::new(),
            files_provisioned: 0,
            commands_run: 0,
        }
    }
}

/// What the caller stores after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRecord {
    pub id: ExecutionId,
    pub result: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "TriggerSet::is_empty")]
    pub triggers: TriggerSet,
}

impl ExecRecord {
    #[must_use]
    pub fn new(outcome: &ExecOutcome, triggers: &TriggerSet) -> Self {
        Self {
            id: outcome.id,
            result: outcome.result.clone(),
            created_at: Utc::now(),
            triggers: triggers.clone(),
        }
    }
}
