use std::collections::HashMap;
use std::fmt;

/// A recognized placeholder token in a save-location template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    AppData,
    LocalAppData,
    ProgramFiles,
    ProgramFilesX86,
    UserProfile,
    /// Installation root of the Steam launcher.
    SteamFolder,
}

impl Placeholder {
    /// Returns all placeholders, in substitution order.
    pub fn all() -> &'static [Placeholder] {
        &[
            Placeholder::AppData,
            Placeholder::LocalAppData,
            Placeholder::ProgramFiles,
            Placeholder::ProgramFilesX86,
            Placeholder::UserProfile,
            Placeholder::SteamFolder,
        ]
    }

    /// Returns the literal token as it appears in templates.
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::AppData => "%APPDATA%",
            Placeholder::LocalAppData => "%LOCALAPPDATA%",
            Placeholder::ProgramFiles => "%PROGRAMFILES%",
            Placeholder::ProgramFilesX86 => "%PROGRAMFILES(X86)%",
            Placeholder::UserProfile => "%USERPROFILE%",
            Placeholder::SteamFolder => "<Steam-folder>",
        }
    }

    /// Returns the environment variable backing this placeholder, if any.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Placeholder::AppData => Some("APPDATA"),
            Placeholder::LocalAppData => Some("LOCALAPPDATA"),
            Placeholder::ProgramFiles => Some("PROGRAMFILES"),
            Placeholder::ProgramFilesX86 => Some("PROGRAMFILES(X86)"),
            Placeholder::UserProfile => Some("USERPROFILE"),
            Placeholder::SteamFolder => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Source of placeholder values.
///
/// Returns `None` when a value is unavailable on this machine.
pub trait PlatformLookup: Send + Sync {
    fn lookup(&self, placeholder: Placeholder) -> Option<String>;
}

/// Looks values up from the process environment and the local launcher
/// installation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl PlatformLookup for SystemLookup {
    fn lookup(&self, placeholder: Placeholder) -> Option<String> {
        match placeholder.env_var() {
            Some(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
            None => {
                let root = steam_root();
                if root.is_none() {
                    tracing::debug!("steam installation not found");
                }
                root
            }
        }
    }
}

// Platform-specific launcher root detection.
#[cfg(target_os = "linux")]
fn steam_root() -> Option<String> {
    crate::platform_linux::steam_root()
}

#[cfg(target_os = "windows")]
fn steam_root() -> Option<String> {
    crate::platform_windows::steam_root()
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn steam_root() -> Option<String> {
    None
}

/// Fixed in-memory placeholder table.
#[derive(Debug, Default, Clone)]
pub struct MapLookup {
    values: HashMap<Placeholder, String>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a value.
    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }
}

impl PlatformLookup for MapLookup {
    fn lookup(&self, placeholder: Placeholder) -> Option<String> {
        self.values.get(&placeholder).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_distinct() {
        let mut tokens: Vec<&str> = Placeholder::all().iter().map(|p| p.token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), Placeholder::all().len());
    }

    #[test]
    fn steam_folder_has_no_env_var() {
        assert!(Placeholder::SteamFolder.env_var().is_none());
        assert_eq!(Placeholder::ProgramFilesX86.env_var(), Some("PROGRAMFILES(X86)"));
    }

    #[test]
    fn display_is_token() {
        assert_eq!(Placeholder::AppData.to_string(), "%APPDATA%");
        assert_eq!(Placeholder::SteamFolder.to_string(), "<Steam-folder>");
    }

    #[test]
    fn map_lookup_returns_configured_values() {
        let lookup = MapLookup::new().with(Placeholder::AppData, "/data");
        assert_eq!(lookup.lookup(Placeholder::AppData).as_deref(), Some("/data"));
        assert!(lookup.lookup(Placeholder::UserProfile).is_none());
    }
}
