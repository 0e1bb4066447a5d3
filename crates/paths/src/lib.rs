//! Save-location template resolution.
//!
//! A game's save directory is recorded as a template such as
//! `%APPDATA%\MyGame\<user-id>\saves`. This crate turns such a template
//! into a concrete, normalized filesystem path.

pub mod platform;
#[cfg(target_os = "linux")]
mod platform_linux;
#[cfg(target_os = "windows")]
mod platform_windows;
mod resolver;

pub use platform::{MapLookup, Placeholder, PlatformLookup, SystemLookup};
pub use resolver::{PathResolver, USER_ID_MARKER, normalize};

/// Errors for path resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no value available for placeholder {0}")]
    Unresolved(Placeholder),

    #[error("save location template is empty")]
    Empty,
}
