//! Google Drive v3 client.
//!
//! Async HTTP client using `reqwest`; requests carry a Bearer token from
//! [`crate::auth`].

use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::DriveError;
use crate::auth::{Credentials, TokenSource};
use crate::storage::{BoxFuture, CloudStorage};
use crate::types::{CreateFile, DriveEntry, FOLDER_MIME_TYPE, FileId, FileList};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";
const PAGE_SIZE: &str = "1000";

/// Google Drive API client.
pub struct DriveClient {
    http: reqwest::Client,
    auth: TokenSource,
    api_url: String,
    upload_url: String,
}

impl DriveClient {
    /// Creates a new client authenticating with `credentials`.
    pub fn new(credentials: Credentials) -> Result<Self, DriveError> {
        let auth = TokenSource::new(credentials)?;
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            auth,
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
        })
    }

    /// Overrides the metadata and upload endpoints.
    pub fn with_base_urls(mut self, api_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.upload_url = upload_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Starts a request carrying a current bearer token.
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, DriveError> {
        let token = self.auth.bearer(&self.http).await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Runs a `files.list` query, following pagination.
    async fn list(&self, query: &str) -> Result<Vec<DriveEntry>, DriveError> {
        let url = format!("{}/files", self.api_url);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.to_string()),
                ("fields", LIST_FIELDS.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let resp = self
                .request(Method::GET, &url)
                .await?
                .query(&params)
                .send()
                .await?;
            let page: FileList = parse(check(resp).await?).await?;
            entries.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Finds files named `name` directly under `folder_id`.
    async fn find_by_name(&self, name: &str, folder_id: &str) -> Result<Vec<DriveEntry>, DriveError> {
        let query = format!(
            "'{}' in parents and name = '{}' and trashed = false",
            quote(folder_id),
            quote(name)
        );
        self.list(&query).await
    }

    /// Creates file metadata and returns the new id.
    async fn create(&self, body: &CreateFile<'_>) -> Result<String, DriveError> {
        let url = format!("{}/files", self.api_url);
        let resp = self
            .request(Method::POST, &url)
            .await?
            .query(&[("fields", "id")])
            .json(body)
            .send()
            .await?;
        let created: FileId = parse(check(resp).await?).await?;
        Ok(created.id)
    }

    async fn get_media(&self, file_id: &str) -> Result<reqwest::Response, DriveError> {
        let url = format!("{}/files/{}", self.api_url, file_id);
        let resp = self
            .request(Method::GET, &url)
            .await?
            .query(&[("alt", "media")])
            .send()
            .await?;
        check(resp).await
    }

    async fn upload(&self, local_path: &Path, folder_id: &str, mime_type: &str) -> Result<String, DriveError> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DriveError::NotFound(local_path.display().to_string()))?;
        let content = tokio::fs::read(local_path).await?;
        let size = content.len();

        // Older copies are removed only once the new content is stored.
        let previous = self.find_by_name(&name, folder_id).await?;

        let file_id = self
            .create(&CreateFile {
                name: &name,
                parents: [folder_id],
                mime_type: None,
            })
            .await?;

        let url = format!("{}/files/{}", self.upload_url, file_id);
        let result = async {
            let resp = self
                .request(Method::PATCH, &url)
                .await?
                .query(&[("uploadType", "media")])
                .header(CONTENT_TYPE, mime_type)
                .body(content)
                .send()
                .await?;
            check(resp).await
        }
        .await;

        if let Err(e) = result {
            // Don't leave an empty placeholder file behind.
            if let Err(cleanup) = self.remove(&file_id).await {
                tracing::warn!(file_id = %file_id, error = %cleanup, "failed to remove partial upload");
            }
            return Err(e);
        }

        for old in previous.iter().filter(|e| e.id != file_id) {
            match self.remove(&old.id).await {
                Ok(()) => tracing::debug!(file_id = %old.id, name = %name, "replaced previous file"),
                Err(e) => {
                    tracing::warn!(file_id = %old.id, name = %name, error = %e, "failed to remove previous file")
                }
            }
        }

        tracing::info!(file_id = %file_id, name = %name, bytes = size, "file uploaded");
        Ok(file_id)
    }

    async fn remove(&self, file_id: &str) -> Result<(), DriveError> {
        let url = format!("{}/files/{}", self.api_url, file_id);
        let resp = self.request(Method::DELETE, &url).await?.send().await?;
        check(resp).await?;
        Ok(())
    }
}

impl CloudStorage for DriveClient {
    fn list_child_folders<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>> {
        Box::pin(async move {
            let query = format!(
                "'{}' in parents and mimeType = '{}' and trashed = false",
                quote(parent_id),
                FOLDER_MIME_TYPE
            );
            self.list(&query).await
        })
    }

    fn create_folder<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
    ) -> BoxFuture<'a, Result<String, DriveError>> {
        Box::pin(async move {
            let id = self
                .create(&CreateFile {
                    name,
                    parents: [parent_id],
                    mime_type: Some(FOLDER_MIME_TYPE),
                })
                .await?;
            tracing::info!(folder_id = %id, name, "folder created");
            Ok(id)
        })
    }

    fn list_children<'a>(
        &'a self,
        folder_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DriveEntry>, DriveError>> {
        Box::pin(async move {
            let query = format!("'{}' in parents and trashed = false", quote(folder_id));
            self.list(&query).await
        })
    }

    fn upload_file<'a>(
        &'a self,
        local_path: &'a Path,
        folder_id: &'a str,
        mime_type: &'a str,
    ) -> BoxFuture<'a, Result<String, DriveError>> {
        Box::pin(self.upload(local_path, folder_id, mime_type))
    }

    fn download_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<Vec<u8>, DriveError>> {
        Box::pin(async move {
            let resp = self.get_media(file_id).await?;
            let bytes = resp.bytes().await?.to_vec();
            tracing::info!(file_id, bytes = bytes.len(), "file downloaded");
            Ok(bytes)
        })
    }

    fn get_text_content<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<String, DriveError>> {
        Box::pin(async move {
            let resp = self.get_media(file_id).await?;
            Ok(resp.text().await?)
        })
    }

    fn delete_file<'a>(&'a self, file_id: &'a str) -> BoxFuture<'a, Result<(), DriveError>> {
        Box::pin(self.remove(file_id))
    }
}

/// Maps non-2xx responses to [`DriveError::Api`].
pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DriveError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, DriveError> {
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Escapes a value for use inside a single-quoted Drive query string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
