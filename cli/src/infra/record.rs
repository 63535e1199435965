//! Infrastructure implementation of the `RecordStore` port.
//!
//! `RecordFile` writes the run record as JSON using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so a reader never sees a partial file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::RecordStore;
use crate::domain::ExecRecord;

/// Record file at a caller-chosen path.
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        Ok(())
    }

    /// Synchronous save, used internally by `save` via `spawn_blocking`.
    fn save_sync(&self, record: &ExecRecord) -> Result<()> {
        self.ensure_parent()?;
        let content = serde_json::to_string_pretty(record).context("serializing record")?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e)
                .with_context(|| format!("finalizing record file {}", self.path.display()));
        }
        Ok(())
    }
}

impl RecordStore for RecordFile {
    /// Create the parent directory and a scratch file next to the record.
    /// An existing directory at the record path is rejected here too.
    fn prepare(&self) -> Result<()> {
        self.ensure_parent()?;
        anyhow::ensure!(!self.path.is_dir(), "{} is a directory", self.path.display());
        let dir = self.parent().unwrap_or_else(|| Path::new("."));
        tempfile::Builder::new()
            .prefix(".hostexec-record-")
            .tempfile_in(dir)
            .with_context(|| format!("cannot write to {}", dir.display()))?;
        Ok(())
    }

    async fn save(&self, record: &ExecRecord) -> Result<()> {
        let path = self.path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || RecordFile::new(path).save_sync(&record))
            .await
            .context("record save task panicked")?
    }
}
