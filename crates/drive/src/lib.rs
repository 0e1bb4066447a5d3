//! Cloud storage for game folders.
//!
//! [`CloudStorage`] is the narrow interface the backup logic talks to;
//! [`DriveClient`] implements it over the Google Drive v3 REST API.

pub mod auth;
pub mod client;
pub mod storage;
pub mod types;

pub use auth::{Credentials, ServiceAccountKey};
pub use client::DriveClient;
pub use storage::{BoxFuture, CloudStorage};
pub use types::{DriveEntry, FOLDER_MIME_TYPE};

/// Errors from the cloud storage service.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid access token")]
    InvalidToken,

    #[error("credential signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("not found: {0}")]
    NotFound(String),
}
