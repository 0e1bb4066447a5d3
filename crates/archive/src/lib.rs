//! Deterministic zip archiving of save directories.
//!
//! [`compress`] packs a directory into `<dir name>.zip` with maximum
//! Deflate compression; [`decompress`] unpacks archive bytes into a
//! destination directory. Both are blocking and should be run on a
//! blocking thread from async code.

mod compress;
mod extract;
mod scanner;

pub use compress::{ARCHIVE_EXTENSION, archive_file_name, compress};
pub use extract::{ExtractSummary, decompress};
pub use scanner::{EntryKind, ScanEntry, scan_directory};

/// Errors produced by the archive codec.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("not a directory: {0}")]
    NotADirectory(String),
}
