//! File provisioning: resolve content, upload in order, apply metadata.

use std::time::Duration;

use crate::application::cancel::CancelToken;
use crate::application::ports::{ContentSource, ProgressReporter, RemoteHost};
use crate::application::services::ensure_success;
use crate::domain::{ExecError, FileOrigin, FileSpec, Stage};

/// A validated file with its bytes loaded.
#[derive(Debug)]
pub struct ResolvedFile<'a> {
    pub spec: &'a FileSpec,
    pub content: Vec<u8>,
}

/// Load the bytes of every file before the first transfer.
///
/// Inline content is used byte-for-byte; sources are read through `sources`.
///
/// # Errors
///
/// Returns [`ExecError::Source`] for the first unreadable source.
pub async fn resolve_contents<'a>(
    files: &'a [FileSpec],
    sources: &impl ContentSource,
    cancel: &CancelToken,
) -> Result<Vec<ResolvedFile<'a>>, ExecError> {
    let mut resolved = Vec::with_capacity(files.len());
    for spec in files {
        let content = match &spec.origin {
            FileOrigin::Inline(text) => text.as_bytes().to_vec(),
            FileOrigin::Source(path) => cancel
                .guard(Stage::Transfer, sources.read(path))
                .await?
                .map_err(|cause| ExecError::Source {
                    path: path.display().to_string(),
                    destination: spec.destination.clone(),
                    cause,
                })?,
        };
        resolved.push(ResolvedFile { spec, content });
    }
    Ok(resolved)
}

/// Upload each file in declaration order, applying its metadata right after.
///
/// Returns the number of files delivered.
///
/// # Errors
///
/// Stops at the first failed upload ([`ExecError::Transfer`]) or metadata
/// step ([`ExecError::Metadata`]); later files are not attempted.
pub async fn provision_files(
    host: &impl RemoteHost,
    files: &[ResolvedFile<'_>],
    metadata_timeout: Duration,
    reporter: &impl ProgressReporter,
    cancel: &CancelToken,
) -> Result<usize, ExecError> {
    for file in files {
        let destination = file.spec.destination.as_str();
        reporter.step(&format!("copying {destination}..."));

        cancel
            .guard(Stage::Transfer, host.upload(&file.content, destination))
            .await?
            .and_then(ensure_success)
            .map_err(|cause| ExecError::Transfer {
                destination: destination.to_string(),
                cause,
            })?;

        for step in file.spec.metadata_steps() {
            let command = step.command(destination);
            cancel
                .guard(Stage::Transfer, host.exec(&command, metadata_timeout))
                .await?
                .and_then(ensure_success)
                .map_err(|cause| ExecError::Metadata {
                    destination: destination.to_string(),
                    property: step.property(),
                    cause,
                })?;
        }
        tracing::info!(destination, bytes = file.content.len(), "file provisioned");
    }
    if !files.is_empty() {
        reporter.success(&format!("{} file(s) provisioned", files.len()));
    }
    Ok(files.len())
}
