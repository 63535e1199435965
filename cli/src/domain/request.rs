//! The typed request document consumed by the executor.
//!
//! A request is deserialized once at the boundary and then turned into an
//! [`ExecPlan`] by [`ExecRequest::plan`], which performs every configuration
//! check. Nothing past the plan sees unvalidated input.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::domain::connection::{ConnectionInput, ConnectionSpec, build_connection_spec};
use crate::domain::error::ConfigError;
use crate::domain::files::{FileSpec, validate_files};

/// Maximum number of commands in one request.
pub const MAX_COMMANDS: usize = 50;

/// Caller-owned key/value map. Its only role is forcing a re-run when it changes.
pub type TriggerSet = BTreeMap<String, String>;

/// Private key material. Never printed: `Debug` is redacted.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    #[must_use]
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// The raw key material.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// One declared file, as written in the request document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDecl {
    /// Path of a local file whose bytes are uploaded.
    #[serde(default)]
    pub source: Option<String>,
    /// Literal content uploaded verbatim.
    #[serde(default)]
    pub content: Option<String>,
    /// Absolute path on the target.
    #[serde(default)]
    pub destination: String,
    /// Octal mode, e.g. `0644`.
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// The full request document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecRequest {
    #[serde(default)]
    pub triggers: TriggerSet,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub bastion_host: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub private_key: Option<PrivateKey>,
    #[serde(default)]
    pub agent: bool,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileDecl>,
}

/// A validated request, ready to execute.
#[derive(Debug, Clone)]
pub struct ExecPlan {
    /// `None` when nothing is declared and no connection is needed.
    pub connection: Option<ConnectionSpec>,
    pub files: Vec<FileSpec>,
    pub commands: Vec<String>,
}

impl ExecPlan {
    /// Whether the plan touches the target at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.commands.is_empty()
    }
}

impl ExecRequest {
    /// Whether any files or commands are declared.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.commands.is_empty() || !self.files.is_empty()
    }

    /// Key material, treating an empty string as absent.
    #[must_use]
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref().filter(|k| !k.is_empty())
    }

    /// Run every configuration check and build the execution plan.
    ///
    /// `default_relay` is the fleet's default bastion, used when the request
    /// declares none. `port` is the SSH port for both hops.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: connection rules first, then
    /// the command list, then the file list.
    pub fn plan(&self, default_relay: Option<&str>, port: u16) -> Result<ExecPlan, ConfigError> {
        let connection = build_connection_spec(
            &ConnectionInput {
                host: &self.host,
                bastion_host: self.bastion_host.as_deref(),
                user: &self.user,
                private_key: self.private_key(),
                agent: self.agent,
                has_work: self.has_work(),
                port,
            },
            default_relay,
        )?;
        validate_commands(&self.commands)?;
        let files = validate_files(&self.files)?;
        Ok(ExecPlan {
            connection,
            files,
            commands: self.commands.clone(),
        })
    }
}

/// Check the command list: at most [`MAX_COMMANDS`], none blank.
///
/// # Errors
///
/// Returns `TooManyCommands` or `EmptyCommand`.
pub fn validate_commands(commands: &[String]) -> Result<(), ConfigError> {
    if commands.len() > MAX_COMMANDS {
        return Err(ConfigError::TooManyCommands {
            count: commands.len(),
        });
    }
    if let Some(index) = commands.iter().position(|c| c.trim().is_empty()) {
        return Err(ConfigError::EmptyCommand { index });
    }
    Ok(())
}
