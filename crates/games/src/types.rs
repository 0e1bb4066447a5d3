use cloudsave_drive::DriveEntry;

/// Name of the save-location file stored in each game folder.
pub const METADATA_FILE_NAME: &str = "metadata.txt";

pub const ARCHIVE_MIME_TYPE: &str = "application/zip";
pub const TEXT_MIME_TYPE: &str = "text/plain";

const UNNAMED_GAME: &str = "Unnamed Game";

/// A tracked game: one folder under the cloud root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    pub id: String,
    pub name: String,
}

impl GameEntry {
    /// Name to show in menus.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            UNNAMED_GAME
        } else {
            &self.name
        }
    }
}

impl From<DriveEntry> for GameEntry {
    fn from(entry: DriveEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
        }
    }
}

/// Picks the save-location file among a game folder's children.
///
/// Exact `metadata.txt` wins; otherwise the first name containing `metadata`.
pub(crate) fn find_metadata(children: &[DriveEntry]) -> Option<&DriveEntry> {
    children
        .iter()
        .find(|c| c.name == METADATA_FILE_NAME)
        .or_else(|| children.iter().find(|c| c.name.contains("metadata")))
}

/// Picks the save archive among a game folder's children.
pub(crate) fn find_archive(children: &[DriveEntry]) -> Option<&DriveEntry> {
    children
        .iter()
        .find(|c| c.name.to_ascii_lowercase().ends_with(".zip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str) -> DriveEntry {
        DriveEntry {
            id: id.into(),
            name: name.into(),
            mime_type: String::new(),
        }
    }

    #[test]
    fn display_name_fallback() {
        let game = GameEntry {
            id: "1".into(),
            name: " ".into(),
        };
        assert_eq!(game.display_name(), "Unnamed Game");
    }

    #[test]
    fn exact_metadata_name_preferred() {
        let children = vec![
            entry("a", "old-metadata.bak"),
            entry("b", "metadata.txt"),
            entry("c", "Saves.zip"),
        ];
        assert_eq!(find_metadata(&children).unwrap().id, "b");
        assert_eq!(find_archive(&children).unwrap().id, "c");
    }

    #[test]
    fn metadata_substring_fallback() {
        let children = vec![entry("a", "game-metadata"), entry("c", "SAVES.ZIP")];
        assert_eq!(find_metadata(&children).unwrap().id, "a");
        assert_eq!(find_archive(&children).unwrap().id, "c");
    }

    #[test]
    fn nothing_found() {
        let children = vec![entry("a", "notes.txt")];
        assert!(find_metadata(&children).is_none());
        assert!(find_archive(&children).is_none());
    }
}
