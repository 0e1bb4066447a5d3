//! Directory scanning for archiving.
//!
//! Walks a directory recursively and produces entries with relative
//! paths normalized to forward slashes, sorted so archives are
//! reproducible.

use std::path::{Path, PathBuf};

use crate::ArchiveError;

/// Kind of a scanned entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Path relative to the root, `/`-separated.
    pub relative_path: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// Scans `root` recursively. Symlinks and other special files are skipped.
pub fn scan_directory(root: &Path) -> Result<Vec<ScanEntry>, ArchiveError> {
    let mut entries = Vec::new();
    walk_dir(root, root, &mut entries)?;
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn walk_dir(root: &Path, current: &Path, entries: &mut Vec<ScanEntry>) -> Result<(), ArchiveError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            tracing::debug!(path = %path.display(), "skipping special file");
            continue;
        };

        let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
        // Normalize to forward slashes.
        let relative_path = rel_path.to_string_lossy().replace('\\', "/");
        let size = match kind {
            EntryKind::File => entry.metadata()?.len(),
            EntryKind::Directory => 0,
        };

        entries.push(ScanEntry {
            relative_path,
            path: path.clone(),
            kind,
            size,
        });

        if kind == EntryKind::Directory {
            walk_dir(root, &path, entries)?;
        }
    }

    Ok(())
}
