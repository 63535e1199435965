//! Domain types and validators for hostexec settings.
//!
//! Pure functions only, no I/O.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::connection::DEFAULT_SSH_PORT;
use crate::domain::error::SettingsError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_HOST_KEY_POLICIES: &[&str] = &["yes", "no", "accept-new"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.hostexec/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// SSH client settings.
    pub ssh: SshConfig,
    /// Per-operation time bounds.
    pub timeouts: TimeoutConfig,
    /// Readiness probe settings.
    pub readiness: ReadinessConfig,
    /// Fleet-wide defaults.
    pub fleet: FleetConfig,
}

/// SSH client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Client binary, looked up on `PATH` unless absolute.
    pub program: String,
    /// Port for the target and the relay.
    pub port: u16,
    pub connect_timeout_secs: u64,
    /// `StrictHostKeyChecking` value: `yes`, `no` or `accept-new`.
    pub strict_host_key_checking: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_hosts_file: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            port: DEFAULT_SSH_PORT,
            connect_timeout_secs: 30,
            strict_host_key_checking: "accept-new".to_string(),
            known_hosts_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on each remote command.
    pub command_secs: u64,
    /// Bound on each file upload and metadata step.
    pub transfer_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 300,
            transfer_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Probe run on the target until it exits 0.
    pub command: String,
    pub interval_secs: u64,
    pub deadline_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            command: "docker volume ls".to_string(),
            interval_secs: 5,
            deadline_secs: 300,
            probe_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Relay used when a request declares none. Empty means direct.
    pub bastion_host: String,
}

// ── Derived policies ─────────────────────────────────────────────────────────

/// Readiness polling bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub command: String,
    pub interval: Duration,
    pub deadline: Duration,
    pub probe_timeout: Duration,
}

/// Everything the run service needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPolicy {
    pub port: u16,
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
    pub readiness: ReadinessPolicy,
}

impl ExecutorConfig {
    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.ssh.program.trim().is_empty() {
            return Err(SettingsError::EmptyProgram);
        }
        if self.readiness.command.trim().is_empty() {
            return Err(SettingsError::EmptyProbe);
        }
        let non_zero = [
            ("ssh.port", u64::from(self.ssh.port)),
            ("ssh.connect_timeout_secs", self.ssh.connect_timeout_secs),
            ("timeouts.command_secs", self.timeouts.command_secs),
            ("timeouts.transfer_secs", self.timeouts.transfer_secs),
            ("readiness.interval_secs", self.readiness.interval_secs),
            ("readiness.deadline_secs", self.readiness.deadline_secs),
            ("readiness.probe_timeout_secs", self.readiness.probe_timeout_secs),
        ];
        if let Some((key, _)) = non_zero.iter().find(|(_, v)| *v == 0) {
            return Err(SettingsError::Zero { key });
        }
        if self.readiness.interval_secs > self.readiness.deadline_secs {
            return Err(SettingsError::IntervalExceedsDeadline {
                interval: self.readiness.interval_secs,
                deadline: self.readiness.deadline_secs,
            });
        }
        let policy = self.ssh.strict_host_key_checking.as_str();
        if !VALID_HOST_KEY_POLICIES.contains(&policy) {
            return Err(SettingsError::InvalidHostKeyPolicy {
                value: policy.to_string(),
                valid: VALID_HOST_KEY_POLICIES.join(", "),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            port: self.ssh.port,
            command_timeout: Duration::from_secs(self.timeouts.command_secs),
            transfer_timeout: Duration::from_secs(self.timeouts.transfer_secs),
            readiness: ReadinessPolicy {
                command: self.readiness.command.clone(),
                interval: Duration::from_secs(self.readiness.interval_secs),
                deadline: Duration::from_secs(self.readiness.deadline_secs),
                probe_timeout: Duration::from_secs(self.readiness.probe_timeout_secs),
            },
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
