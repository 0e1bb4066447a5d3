//! Cloud storage trait.
//!
//! The backup logic only sees this trait, which keeps it decoupled from
//! the HTTP transport and testable with in-memory mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::DriveError;
use crate::types::DriveEntry;

/// Boxed future returned by [`CloudStorage`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Abstract cloud storage service.
pub trait CloudStorage: Send + Sync {
    /// Lists the folders directly under `parent_id`.
    fn list_child_folders<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>>;

    /// Creates a folder named `name` under `parent_id` and returns its id.
    fn create_folder<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
    ) -> BoxFuture<'a, Result<String, DriveError>>;

    /// Lists every file and folder directly under `folder_id`.
    fn list_children<'a>(
        &'a self,
        folder_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>>;

    /// Uploads a local file into `folder_id` under its file name.
    ///
    /// Any existing file with the same name in that folder is replaced.
    fn upload_file<'a>(
        &'a self,
        local_path: &'a Path,
        folder_id: &'a str,
        mime_type: &'a str,
    ) -> BoxFuture<'a, Result<String, DriveError>>;

    /// Downloads the raw content of a file.
    fn download_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, DriveError>>;

    /// Downloads a file's content as text.
    fn get_text_content<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<String, DriveError>>;

    /// Deletes a file.
    fn delete_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<(), DriveError>>;
}
