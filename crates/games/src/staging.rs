//! Private staging directories for transient local artifacts.

use std::path::{Path, PathBuf};

/// A uniquely named directory removed with its contents on drop.
pub(crate) struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    pub(crate) fn create(base: &Path) -> std::io::Result<Self> {
        let path = base.join(format!("cloudsave-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging dir");
        }
    }
}
