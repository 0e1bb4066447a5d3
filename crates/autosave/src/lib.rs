//! Periodic autosave sessions.
//!
//! An [`AutosaveSession`] repeats a backup job for one game folder at a
//! fixed interval until it is cancelled. Firings never overlap, and an
//! in-flight firing always runs to completion.

mod session;

pub use session::{AutosaveJob, AutosaveSession, BoxFuture};

/// Errors for autosave sessions.
#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    #[error("no save location recorded for folder {0}")]
    NoSaveLocation(String),

    #[error("autosave interval must be non-zero and representable")]
    InvalidInterval,

    #[error("save location lookup failed: {0}")]
    Lookup(String),

    #[error("backup failed: {0}")]
    Backup(String),
}
