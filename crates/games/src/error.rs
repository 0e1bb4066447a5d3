//! Error types for game operations.

use cloudsave_archive::ArchiveError;
use cloudsave_drive::DriveError;
use cloudsave_paths::ResolveError;

/// Errors produced by backup, restore and create operations.
#[derive(Debug, thiserror::Error)]
pub enum GamesError {
    #[error("no save location recorded for this game")]
    NoSaveLocation(String),

    #[error("no save archive found for this game")]
    NoSaveArchive(String),

    #[error("game name must not be empty")]
    InvalidName,

    #[error("cannot resolve save location: {0}")]
    Resolve(#[from] ResolveError),

    #[error("cloud storage error: {0}")]
    Drive(#[from] DriveError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Coarse classification shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing metadata, save archive or placeholder value.
    NotFound,
    /// The storage service failed an upload, download or listing.
    TransferFailure,
    /// Local directory creation, file write or archive failure.
    FilesystemFailure,
    /// The user supplied unusable input.
    InvalidInput,
}

impl GamesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GamesError::NoSaveLocation(_) | GamesError::NoSaveArchive(_) | GamesError::Resolve(_) => {
                ErrorKind::NotFound
            }
            GamesError::Drive(DriveError::Io(_)) => ErrorKind::FilesystemFailure,
            GamesError::Drive(_) => ErrorKind::TransferFailure,
            GamesError::Archive(_) | GamesError::Io(_) | GamesError::Task(_) => {
                ErrorKind::FilesystemFailure
            }
            GamesError::InvalidName => ErrorKind::InvalidInput,
        }
    }
}
