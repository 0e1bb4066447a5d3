//! Games service: business logic over cloud storage and the local disk.
//!
//! All archive/upload and download/extract work for one game folder is
//! serialized through a per-folder lock, so a manual backup never races
//! an autosave firing for the same game.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cloudsave_archive::ExtractSummary;
use cloudsave_autosave::{AutosaveError, AutosaveJob, BoxFuture};
use cloudsave_drive::CloudStorage;
use cloudsave_paths::PathResolver;
use tracing::{debug, info};

use crate::error::GamesError;
use crate::staging::StagingDir;
use crate::types::{
    ARCHIVE_MIME_TYPE, GameEntry, METADATA_FILE_NAME, TEXT_MIME_TYPE, find_archive, find_metadata,
};

type FolderLock = Arc<tokio::sync::Mutex<()>>;

/// Manages tracked games in cloud storage.
pub struct GamesService {
    storage: Arc<dyn CloudStorage>,
    resolver: PathResolver,
    staging_base: PathBuf,
    locks: Mutex<HashMap<String, FolderLock>>,
}

impl GamesService {
    /// Creates a service staging local artifacts under `staging_base`.
    pub fn new(storage: Arc<dyn CloudStorage>, resolver: PathResolver, staging_base: PathBuf) -> Self {
        Self {
            storage,
            resolver,
            staging_base,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lists tracked games under the root folder, sorted by name.
    pub async fn list_games(&self, root_id: &str) -> Result<Vec<GameEntry>, GamesError> {
        let folders = self.storage.list_child_folders(root_id).await?;
        let mut games: Vec<GameEntry> = folders.into_iter().map(GameEntry::from).collect();
        games.sort_by_key(|g| g.display_name().to_lowercase());
        debug!(count = games.len(), "listed games");
        Ok(games)
    }

    /// Reads the save-location template recorded for a game.
    ///
    /// Returns `None` if the folder has no metadata file or it is blank.
    pub async fn save_location(&self, folder_id: &str) -> Result<Option<String>, GamesError> {
        let children = self.storage.list_children(folder_id).await?;
        let Some(meta) = find_metadata(&children) else {
            return Ok(None);
        };
        let text = self.storage.get_text_content(&meta.id).await?;
        let text = text.trim();
        Ok(if text.is_empty() { None } else { Some(text.to_string()) })
    }

    /// Returns the id of the game's save archive, if one was uploaded.
    pub async fn save_archive_id(&self, folder_id: &str) -> Result<Option<String>, GamesError> {
        let children = self.storage.list_children(folder_id).await?;
        Ok(find_archive(&children).map(|e| e.id.clone()))
    }

    /// Archives the directory `save_location` resolves to and uploads it,
    /// replacing the folder's previous archive. Returns the uploaded file id.
    ///
    /// The local archive is removed whether or not the upload succeeds.
    pub async fn backup(&self, folder_id: &str, save_location: &str) -> Result<String, GamesError> {
        let source = self.resolver.resolve(save_location)?;

        let lock = self.folder_lock(folder_id);
        let _guard = lock.lock().await;

        let staging = StagingDir::create(&self.staging_base)?;
        let out_dir = staging.path().to_path_buf();
        let src = source.clone();
        let archive = tokio::task::spawn_blocking(move || cloudsave_archive::compress(&src, &out_dir))
            .await
            .map_err(|e| GamesError::Task(e.to_string()))??;

        let file_id = self
            .storage
            .upload_file(&archive, folder_id, ARCHIVE_MIME_TYPE)
            .await?;
        drop(staging);

        info!(folder_id, source = %source.display(), file_id = %file_id, "backup uploaded");
        Ok(file_id)
    }

    /// Backs up a game using its recorded save location.
    pub async fn backup_game(&self, folder_id: &str) -> Result<String, GamesError> {
        let location = self
            .save_location(folder_id)
            .await?
            .ok_or_else(|| GamesError::NoSaveLocation(folder_id.to_string()))?;
        self.backup(folder_id, &location).await
    }

    /// Downloads the game's save archive and unpacks it into the resolved
    /// save location. Returns the directory written to.
    pub async fn restore_game(&self, folder_id: &str) -> Result<PathBuf, GamesError> {
        let children = self.storage.list_children(folder_id).await?;
        let meta_id = find_metadata(&children)
            .map(|e| e.id.clone())
            .ok_or_else(|| GamesError::NoSaveLocation(folder_id.to_string()))?;
        let archive_id = find_archive(&children)
            .map(|e| e.id.clone())
            .ok_or_else(|| GamesError::NoSaveArchive(folder_id.to_string()))?;

        let template = self.storage.get_text_content(&meta_id).await?;
        let dest = self.resolver.resolve(&template)?;

        let lock = self.folder_lock(folder_id);
        let _guard = lock.lock().await;

        let bytes = self.storage.download_file(&archive_id).await?;
        let target = dest.clone();
        let summary: ExtractSummary =
            tokio::task::spawn_blocking(move || cloudsave_archive::decompress(&bytes, &target))
                .await
                .map_err(|e| GamesError::Task(e.to_string()))??;

        info!(
            folder_id,
            dest = %dest.display(),
            files = summary.files,
            "save restored"
        );
        Ok(dest)
    }

    /// Creates a tracked game: a cloud folder holding the save-location
    /// file, followed by an initial backup.
    ///
    /// The template is resolved before anything is created remotely.
    pub async fn create_game(
        &self,
        root_id: &str,
        name: &str,
        save_location: &str,
    ) -> Result<GameEntry, GamesError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GamesError::InvalidName);
        }
        let save_location = save_location.trim();
        self.resolver.resolve(save_location)?;

        let folder_id = self.storage.create_folder(name, root_id).await?;
        self.upload_metadata(&folder_id, save_location).await?;
        self.backup(&folder_id, save_location).await?;

        info!(folder_id = %folder_id, name, "game created");
        Ok(GameEntry {
            id: folder_id,
            name: name.to_string(),
        })
    }

    async fn upload_metadata(&self, folder_id: &str, save_location: &str) -> Result<(), GamesError> {
        let staging = StagingDir::create(&self.staging_base)?;
        let path = staging.path().join(METADATA_FILE_NAME);
        tokio::fs::write(&path, save_location).await?;
        self.storage
            .upload_file(&path, folder_id, TEXT_MIME_TYPE)
            .await?;
        Ok(())
    }

    fn folder_lock(&self, folder_id: &str) -> FolderLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(folder_id.to_string()).or_default())
    }
}

impl AutosaveJob for GamesService {
    fn save_location<'a>(
        &'a self,
        folder_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, AutosaveError>> {
        Box::pin(async move {
            GamesService::save_location(self, folder_id)
                .await
                .map_err(|e| AutosaveError::Lookup(e.to_string()))
        })
    }

    fn backup<'a>(
        &'a self,
        folder_id: &'a str,
        save_location: &'a str,
    ) -> BoxFuture<'a, Result<(), AutosaveError>> {
        Box::pin(async move {
            GamesService::backup(self, folder_id, save_location)
                .await
                .map(|_| ())
                .map_err(|e| AutosaveError::Backup(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};

    use cloudsave_autosave::AutosaveSession;
    use cloudsave_drive::{DriveEntry, DriveError, FOLDER_MIME_TYPE};
    use cloudsave_paths::{MapLookup, Placeholder};
    use tokio_util::sync::CancellationToken;

    #[derive(Clone)]
    struct MockFile {
        name: String,
        parent: String,
        mime_type: String,
        content: Vec<u8>,
    }

    /// In-memory cloud storage.
    #[derive(Default)]
    struct MockStorage {
        files: Mutex<BTreeMap<String, MockFile>>,
        next_id: Mutex<u32>,
        fail_uploads: AtomicBool,
    }

    impl MockStorage {
        fn insert(&self, name: &str, parent: &str, mime_type: &str, content: &[u8]) -> String {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let id = format!("id-{next}");
            self.files.lock().unwrap().insert(
                id.clone(),
                MockFile {
                    name: name.into(),
                    parent: parent.into(),
                    mime_type: mime_type.into(),
                    content: content.to_vec(),
                },
            );
            id
        }

        fn children(&self, parent: &str) -> Vec<(String, MockFile)> {
            self.files
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, f)| f.parent == parent)
                .map(|(id, f)| (id.clone(), f.clone()))
                .collect()
        }

        fn names_in(&self, parent: &str) -> Vec<String> {
            self.children(parent).into_iter().map(|(_, f)| f.name).collect()
        }

        fn entries(&self, parent: &str, folders_only: bool) -> Vec<DriveEntry> {
            self.children(parent)
                .into_iter()
                .filter(|(_, f)| !folders_only || f.mime_type == FOLDER_MIME_TYPE)
                .map(|(id, f)| DriveEntry {
                    id,
                    name: f.name,
                    mime_type: f.mime_type,
                })
                .collect()
        }

        fn content(&self, id: &str) -> Result<Vec<u8>, DriveError> {
            self.files
                .lock()
                .unwrap()
                .get(id)
                .map(|f| f.content.clone())
                .ok_or_else(|| DriveError::NotFound(id.into()))
        }
    }

    impl CloudStorage for MockStorage {
        fn list_child_folders<'a>(
            &'a self,
            parent_id: &'a str,
        ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>> {
            Box::pin(async move { Ok(self.entries(parent_id, true)) })
        }

        fn create_folder<'a>(
            &'a self,
            name: &'a str,
            parent_id: &'a str,
        ) -> BoxFuture<'a, Result<String, DriveError>> {
            Box::pin(async move { Ok(self.insert(name, parent_id, FOLDER_MIME_TYPE, b"")) })
        }

        fn list_children<'a>(
            &'a self,
            folder_id: &'a str,
        ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>> {
            Box::pin(async move { Ok(self.entries(folder_id, false)) })
        }

        fn upload_file<'a>(
            &'a self,
            local_path: &'a Path,
            folder_id: &'a str,
            mime_type: &'a str,
        ) -> BoxFuture<'a, Result<String, DriveError>> {
            Box::pin(async move {
                let content = fs::read(local_path)?;
                if self.fail_uploads.load(Ordering::SeqCst) {
                    return Err(DriveError::Api {
                        status: 503,
                        body: "unavailable".into(),
                    });
                }
                let name = local_path.file_name().unwrap().to_string_lossy().to_string();
                self.files
                    .lock()
                    .unwrap()
                    .retain(|_, f| !(f.parent == folder_id && f.name == name));
                Ok(self.insert(&name, folder_id, mime_type, &content))
            })
        }

        fn download_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, DriveError>> {
            Box::pin(async move { self.content(file_id) })
        }

        fn get_text_content<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<String, DriveError>> {
            Box::pin(async move {
                let bytes = self.content(file_id)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            })
        }

        fn delete_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<(), DriveError>> {
            Box::pin(async move {
                self.files.lock().unwrap().remove(file_id);
                Ok(())
            })
        }
    }

    struct Fixture {
        storage: Arc<MockStorage>,
        service: Arc<GamesService>,
        appdata: tempfile::TempDir,
        staging: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let storage = Arc::new(MockStorage::default());
            let appdata = tempfile::tempdir().unwrap();
            let staging = tempfile::tempdir().unwrap();
            let lookup = MapLookup::new().with(
                Placeholder::AppData,
                appdata.path().to_string_lossy().to_string(),
            );
            let service = Arc::new(GamesService::new(
                storage.clone(),
                PathResolver::new(Arc::new(lookup)),
                staging.path().to_path_buf(),
            ));
            Self {
                storage,
                service,
                appdata,
                staging,
            }
        }

        /// Writes a save directory under the fake APPDATA.
        fn write_saves(&self) -> PathBuf {
            let dir = self.appdata.path().join("Celeste").join("Saves");
            fs::create_dir_all(dir.join("slots")).unwrap();
            fs::write(dir.join("settings.celeste"), b"<Settings/>").unwrap();
            fs::write(dir.join("slots").join("0.celeste"), b"chapter=7").unwrap();
            dir
        }

        fn staging_is_empty(&self) -> bool {
            fs::read_dir(self.staging.path()).unwrap().next().is_none()
        }
    }

    const TEMPLATE: &str = "%APPDATA%/Celeste/Saves";

    #[tokio::test]
    async fn list_games_returns_folders_only() {
        let fx = Fixture::new();
        fx.storage.insert("Zelda", "root", FOLDER_MIME_TYPE, b"");
        fx.storage.insert("celeste", "root", FOLDER_MIME_TYPE, b"");
        fx.storage.insert("notes.txt", "root", "text/plain", b"");

        let games = fx.service.list_games("root").await.unwrap();

        let names: Vec<&str> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["celeste", "Zelda"]);
    }

    #[tokio::test]
    async fn save_location_reads_trimmed_metadata() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        fx.storage
            .insert(METADATA_FILE_NAME, &folder, TEXT_MIME_TYPE, b"  %APPDATA%/Celeste\n");

        let location = fx.service.save_location(&folder).await.unwrap();
        assert_eq!(location.as_deref(), Some("%APPDATA%/Celeste"));
    }

    #[tokio::test]
    async fn save_location_missing() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        assert!(fx.service.save_location(&folder).await.unwrap().is_none());
        assert!(fx.service.save_archive_id(&folder).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_game_uploads_metadata_and_archive() {
        let fx = Fixture::new();
        fx.write_saves();

        let game = fx
            .service
            .create_game("root", "  Celeste ", TEMPLATE)
            .await
            .unwrap();

        assert_eq!(game.name, "Celeste");
        let mut names = fx.storage.names_in(&game.id);
        names.sort();
        assert_eq!(names, vec!["Saves.zip", METADATA_FILE_NAME]);
        assert_eq!(
            fx.service.save_location(&game.id).await.unwrap().as_deref(),
            Some(TEMPLATE)
        );
        assert!(fx.staging_is_empty());
    }

    #[tokio::test]
    async fn create_game_rejects_blank_name() {
        let fx = Fixture::new();
        let err = fx.service.create_game("root", "  ", TEMPLATE).await.unwrap_err();
        assert!(matches!(err, GamesError::InvalidName));
        assert!(fx.storage.names_in("root").is_empty());
    }

    #[tokio::test]
    async fn create_game_with_unresolvable_template_creates_nothing() {
        let fx = Fixture::new();
        let err = fx
            .service
            .create_game("root", "Celeste", "%LOCALAPPDATA%/Celeste")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        assert!(fx.storage.names_in("root").is_empty());
    }

    #[tokio::test]
    async fn backup_replaces_previous_archive() {
        let fx = Fixture::new();
        let saves = fx.write_saves();
        let game = fx.service.create_game("root", "Celeste", TEMPLATE).await.unwrap();
        let first = fx.service.save_archive_id(&game.id).await.unwrap().unwrap();

        fs::write(saves.join("slots").join("1.celeste"), b"chapter=1").unwrap();
        let second = fx.service.backup_game(&game.id).await.unwrap();

        assert_ne!(first, second);
        let zips: Vec<String> = fx
            .storage
            .names_in(&game.id)
            .into_iter()
            .filter(|n| n.ends_with(".zip"))
            .collect();
        assert_eq!(zips.len(), 1);
        assert!(fx.staging_is_empty());
    }

    #[tokio::test]
    async fn failed_upload_still_removes_artifact() {
        let fx = Fixture::new();
        fx.write_saves();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        fx.storage.fail_uploads.store(true, Ordering::SeqCst);

        let err = fx.service.backup(&folder, TEMPLATE).await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::TransferFailure);
        assert!(fx.staging_is_empty());
    }

    #[tokio::test]
    async fn backup_of_missing_directory_fails() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");

        let err = fx.service.backup(&folder, TEMPLATE).await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::FilesystemFailure);
        assert!(fx.storage.names_in(&folder).is_empty());
        assert!(fx.staging_is_empty());
    }

    #[tokio::test]
    async fn backup_game_without_metadata_is_not_found() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        let err = fx.service.backup_game(&folder).await.unwrap_err();
        assert!(matches!(err, GamesError::NoSaveLocation(_)));
    }

    #[tokio::test]
    async fn restore_round_trip() {
        let fx = Fixture::new();
        let saves = fx.write_saves();
        let game = fx.service.create_game("root", "Celeste", TEMPLATE).await.unwrap();

        fs::remove_dir_all(&saves).unwrap();
        let dest = fx.service.restore_game(&game.id).await.unwrap();

        assert_eq!(dest, saves);
        assert_eq!(fs::read(saves.join("settings.celeste")).unwrap(), b"<Settings/>");
        assert_eq!(fs::read(saves.join("slots").join("0.celeste")).unwrap(), b"chapter=7");
    }

    #[tokio::test]
    async fn restore_without_archive() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        fx.storage
            .insert(METADATA_FILE_NAME, &folder, TEXT_MIME_TYPE, TEMPLATE.as_bytes());

        let err = fx.service.restore_game(&folder).await.unwrap_err();
        assert!(matches!(err, GamesError::NoSaveArchive(_)));
    }

    #[tokio::test]
    async fn autosave_refuses_game_without_location() {
        let fx = Fixture::new();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");
        let job: Arc<dyn AutosaveJob> = fx.service.clone();

        let result = AutosaveSession::start(
            job,
            folder,
            std::time::Duration::from_secs(300),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(AutosaveError::NoSaveLocation(_))));
    }

    #[tokio::test]
    async fn autosave_job_backs_up() {
        let fx = Fixture::new();
        fx.write_saves();
        let folder = fx.storage.insert("Celeste", "root", FOLDER_MIME_TYPE, b"");

        AutosaveJob::backup(fx.service.as_ref(), &folder, TEMPLATE)
            .await
            .unwrap();

        assert_eq!(fx.storage.names_in(&folder), vec!["Saves.zip"]);
    }
}
