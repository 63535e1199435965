//! Filesystem infrastructure: implements `ContentSource`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ContentSource;

/// Reads file sources from the local filesystem. Relative paths resolve
/// against `base_dir`, normally the directory holding the request document.
pub struct LocalContentSource {
    base_dir: PathBuf,
}

impl LocalContentSource {
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ContentSource for LocalContentSource {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        tokio::task::spawn_blocking(move || {
            std::fs::read(&full).with_context(|| format!("reading {}", full.display()))
        })
        .await
        .context("spawn_blocking for source read")?
    }
}
