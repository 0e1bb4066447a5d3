use std::path::{Path, PathBuf};

/// Returns the Steam base directory on Linux, if installed.
pub(crate) fn steam_root() -> Option<String> {
    let home = std::env::var_os("HOME").map(PathBuf::from)?;
    find_steam_root(&home).map(|p| p.to_string_lossy().into_owned())
}

fn find_steam_root(home: &Path) -> Option<PathBuf> {
    let candidates = [
        // Primary location: ~/.steam/steam
        home.join(".steam").join("steam"),
        home.join(".local").join("share").join("Steam"),
        // Flatpak
        home.join(".var")
            .join("app")
            .join("com.valvesoftware.Steam")
            .join(".steam")
            .join("steam"),
    ];

    candidates.into_iter().find(|dir| dir.exists())
}
