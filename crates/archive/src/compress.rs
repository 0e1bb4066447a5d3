use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::ArchiveError;
use crate::scanner::{EntryKind, scan_directory};

/// Extension of produced archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Maximum Deflate level.
const COMPRESSION_LEVEL: i64 = 9;

/// Returns the archive file name for a save directory: `<last segment>.zip`.
pub fn archive_file_name(source_dir: &Path) -> String {
    let stem = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "save".into());
    format!("{stem}.{ARCHIVE_EXTENSION}")
}

/// Compresses `source_dir` into `out_dir/<dir name>.zip`.
///
/// Entries are written in sorted order with a fixed timestamp, so the
/// same directory contents always produce the same bytes. Returns the
/// archive path. A partially written archive is removed on failure.
pub fn compress(source_dir: &Path, out_dir: &Path) -> Result<PathBuf, ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.display().to_string()));
    }

    std::fs::create_dir_all(out_dir)?;
    let archive_path = out_dir.join(archive_file_name(source_dir));

    match write_archive(source_dir, &archive_path) {
        Ok(count) => {
            tracing::debug!(
                source = %source_dir.display(),
                archive = %archive_path.display(),
                entries = count,
                "archive written"
            );
            Ok(archive_path)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&archive_path);
            Err(e)
        }
    }
}

fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<usize, ArchiveError> {
    let entries = scan_directory(source_dir)?;
    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(file);

    let base = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .last_modified_time(DateTime::default());

    for entry in &entries {
        match entry.kind {
            EntryKind::Directory => {
                zip.add_directory(entry.relative_path.clone(), base.unix_permissions(0o755))?;
            }
            EntryKind::File => {
                let options = base
                    .unix_permissions(0o644)
                    .large_file(entry.size >= u64::from(u32::MAX));
                zip.start_file(entry.relative_path.clone(), options)?;
                let mut src = File::open(&entry.path)?;
                io::copy(&mut src, &mut zip)?;
            }
        }
    }

    let mut file = zip.finish()?;
    file.flush()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn archive_name_from_last_segment() {
        assert_eq!(archive_file_name(Path::new("/home/u/Game")), "Game.zip");
        assert_eq!(archive_file_name(Path::new("/")), "save.zip");
    }

    #[test]
    fn compress_missing_dir_fails() {
        let out = tempfile::tempdir().unwrap();
        let err = compress(Path::new("/nonexistent/save/dir"), out.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::NotADirectory(_)));
    }

    #[test]
    fn compress_is_deterministic() {
        let src = tempfile::tempdir().unwrap();
        let saves = src.path().join("Saves");
        fs::create_dir_all(saves.join("profile")).unwrap();
        fs::write(saves.join("slot1.sav"), vec![7u8; 4096]).unwrap();
        fs::write(saves.join("profile").join("settings.ini"), b"volume=3").unwrap();

        let out1 = tempfile::tempdir().unwrap();
        let out2 = tempfile::tempdir().unwrap();
        let a = compress(&saves, out1.path()).unwrap();
        let b = compress(&saves, out2.path()).unwrap();

        assert_eq!(a.file_name().unwrap(), "Saves.zip");
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }
}
