//! Validated file declarations and the metadata steps applied after upload.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ConfigError;
use crate::domain::request::FileDecl;
use crate::domain::shell::quote;

/// Octal mode, three or four digits.
static MODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-7]{3,4}$").expect("valid regex")
});

/// User/group names as accepted by `useradd`, or a numeric id. Checked before
/// the value is interpolated into `chown`/`chgrp` or an SSH destination.
pub(crate) static PRINCIPAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_.-]{0,31}\$?|[0-9]+)$").expect("valid regex")
});

/// Where a file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOrigin {
    /// Literal content, uploaded byte-for-byte.
    Inline(String),
    /// A path on the executing machine.
    Source(PathBuf),
}

/// Octal permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl FileMode {
    /// Parse a 3–4 digit octal string such as `644` or `0755`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if !MODE_RE.is_match(value) {
            return None;
        }
        u32::from_str_radix(value, 8).ok().map(Self)
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// A validated file to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub origin: FileOrigin,
    pub destination: String,
    pub mode: Option<FileMode>,
    pub owner: Option<String>,
    pub group: Option<String>,
}

/// A property applied to a file after its content lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStep {
    Permissions(FileMode),
    Owner(String),
    Group(String),
}

impl MetadataStep {
    /// Property name used in diagnostics.
    #[must_use]
    pub fn property(&self) -> &'static str {
        match self {
            Self::Permissions(_) => "permissions",
            Self::Owner(_) => "owner",
            Self::Group(_) => "group",
        }
    }

    /// Shell command that applies this step to `destination` on the target.
    #[must_use]
    pub fn command(&self, destination: &str) -> String {
        let dest = quote(destination);
        match self {
            Self::Permissions(mode) => format!("chmod {mode} {dest}"),
            Self::Owner(owner) => format!("chown {} {dest}", quote(owner)),
            Self::Group(group) => format!("chgrp {} {dest}", quote(group)),
        }
    }
}

impl FileSpec {
    /// Metadata steps in application order: permissions, owner, group.
    #[must_use]
    pub fn metadata_steps(&self) -> Vec<MetadataStep> {
        let mut steps = Vec::new();
        if let Some(mode) = self.mode {
            steps.push(MetadataStep::Permissions(mode));
        }
        if let Some(owner) = &self.owner {
            steps.push(MetadataStep::Owner(owner.clone()));
        }
        if let Some(group) = &self.group {
            steps.push(MetadataStep::Group(group.clone()));
        }
        steps
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Validate every declared file before any transfer starts.
///
/// # Errors
///
/// Returns the first problem found, in declaration order.
pub fn validate_files(decls: &[FileDecl]) -> Result<Vec<FileSpec>, ConfigError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(decls.len());

    for (index, decl) in decls.iter().enumerate() {
        let destination = decl.destination.trim();
        if destination.is_empty() {
            return Err(ConfigError::MissingDestination { index });
        }
        let destination = destination.to_string();

        let origin = match (non_empty(decl.content.as_ref()), non_empty(decl.source.as_ref())) {
            (Some(content), None) => FileOrigin::Inline(content.to_string()),
            (None, Some(source)) => FileOrigin::Source(PathBuf::from(source)),
            _ => return Err(ConfigError::FileOrigin { destination }),
        };

        let mode = match non_empty(decl.permissions.as_ref()) {
            Some(value) => Some(FileMode::parse(value).ok_or_else(|| {
                ConfigError::InvalidPermissions {
                    destination: destination.clone(),
                    value: value.to_string(),
                }
            })?),
            None => None,
        };
        let owner = principal(&destination, "owner", decl.owner.as_ref())?;
        let group = principal(&destination, "group", decl.group.as_ref())?;

        if !seen.insert(destination.clone()) {
            return Err(ConfigError::DuplicateDestination { destination });
        }
        specs.push(FileSpec {
            origin,
            destination,
            mode,
            owner,
            group,
        });
    }
    Ok(specs)
}

fn principal(
    destination: &str,
    property: &'static str,
    value: Option<&String>,
) -> Result<Option<String>, ConfigError> {
    match non_empty(value) {
        Some(v) if PRINCIPAL_RE.is_match(v) => Ok(Some(v.to_string())),
        Some(v) => Err(ConfigError::InvalidPrincipal {
            destination: destination.to_string(),
            property,
            value: v.to_string(),
        }),
        None => Ok(None),
    }
}
