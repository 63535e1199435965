//! Loads request documents (YAML or JSON) from disk.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::ExecRequest;

/// Read and parse a request document. JSON is accepted as a YAML subset.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match the request
/// schema (unknown fields are rejected).
pub fn load_request(path: &Path) -> Result<ExecRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read request {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse request {}", path.display()))
}
