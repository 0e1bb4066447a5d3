use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;

use zip::ZipArchive;

use crate::ArchiveError;

/// Result of unpacking an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files written.
    pub files: usize,
    /// Entries skipped (symlinks, names escaping the destination).
    pub skipped: usize,
}

/// Unpacks zip `bytes` into `dest`, creating directories as needed.
///
/// Existing files are overwritten. Only regular files and directories
/// are materialized; an entry whose name would land outside `dest` is
/// skipped.
pub fn decompress(bytes: &[u8], dest: &Path) -> Result<ExtractSummary, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    std::fs::create_dir_all(dest)?;

    let mut summary = ExtractSummary::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "skipping archive entry outside destination");
            summary.skipped += 1;
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if !entry.is_file() {
            summary.skipped += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        summary.files += 1;
    }

    tracing::debug!(
        dest = %dest.display(),
        files = summary.files,
        skipped = summary.skipped,
        "archive extracted"
    );
    Ok(summary)
}
