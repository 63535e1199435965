//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`), so they
//! never mix with the result printed on stdout. `--debug-log <FILE>` adds a
//! second layer that appends everything this crate logs at debug level,
//! including each command's stdout and stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter applied to the debug log file.
const DEBUG_LOG_FILTER: &str = "hostexec=debug";

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the debug log cannot be opened or a subscriber is
/// already installed.
pub fn init(debug_log: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = debug_log
        .map(|path| -> Result<_> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open debug log {}", path.display()))?;
            Ok(fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(DEBUG_LOG_FILTER)))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("cannot install tracing subscriber")
}
