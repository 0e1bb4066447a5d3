//! Tracked game management: list, backup, restore, create.
//!
//! This crate implements the **business logic** of the tool. It has no
//! terminal or HTTP dependencies; the app provides a `CloudStorage`
//! implementation and a path resolver.
//!
//! # Cloud layout
//!
//! ```text
//! <root folder>/
//!   <game name>/
//!     metadata.txt    save-location template
//!     <dir>.zip       latest save archive
//! ```

pub mod error;
pub mod service;
mod staging;
pub mod types;

pub use error::{ErrorKind, GamesError};
pub use service::GamesService;
pub use types::{ARCHIVE_MIME_TYPE, GameEntry, METADATA_FILE_NAME, TEXT_MIME_TYPE};
