//! Remote audio storage.
//!
//! Recordings are archived to a Google Drive folder and may also arrive
//! there directly from the phone recorder. The `ObjectStore` trait keeps the
//! pipeline testable without network access.

use crate::error::{PensumError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";

/// A file in the remote folder.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Remote storage for recordings: upload local files, list the folder, and
/// download files that only exist remotely.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under the given name. Returns the remote id.
    async fn upload(&self, path: &Path, name: &str) -> Result<String>;

    /// List all files in the configured folder.
    async fn list(&self) -> Result<Vec<RemoteFile>>;

    /// Download a remote file to a local destination.
    async fn download(&self, id: &str, dest: &Path) -> Result<()>;
}

/// Google Drive v3 implementation.
pub struct DriveStore {
    client: reqwest::Client,
    folder_id: String,
    token: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

impl DriveStore {
    /// Build a store for one folder. The access token comes from the
    /// `GOOGLE_DRIVE_TOKEN` environment variable, or from a token file
    /// containing `{"access_token": "..."}`.
    pub fn new(folder_id: &str, token_file: Option<&Path>) -> Result<Self> {
        let token = match std::env::var("GOOGLE_DRIVE_TOKEN") {
            Ok(token) if !token.is_empty() => token,
            _ => {
                let path = token_file.ok_or_else(|| {
                    PensumError::Drive(
                        "No Drive credentials: set GOOGLE_DRIVE_TOKEN or configure a token file"
                            .to_string(),
                    )
                })?;
                let content = std::fs::read_to_string(path)?;
                let parsed: TokenFile = serde_json::from_str(&content)?;
                parsed.access_token
            }
        };

        Ok(Self {
            client: reqwest::Client::new(),
            folder_id: folder_id.to_string(),
            token,
        })
    }
}

#[async_trait]
impl ObjectStore for DriveStore {
    async fn upload(&self, path: &Path, name: &str) -> Result<String> {
        debug!("Uploading {} to Drive as '{}'", path.display(), name);

        let bytes = tokio::fs::read(path).await?;
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.folder_id],
        });

        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| PensumError::Upload(e.to_string()))?,
            )
            .part(
                "media",
                reqwest::multipart::Part::bytes(bytes)
                    .mime_str("audio/mpeg")
                    .map_err(|e| PensumError::Upload(e.to_string()))?,
            );

        let response = self
            .client
            .post(format!("{}/files?uploadType=multipart", DRIVE_UPLOAD_API))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PensumError::Upload(format!(
                "Drive upload failed with {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response.json().await?;
        info!("Uploaded '{}' to Drive ({})", name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn list(&self) -> Result<Vec<RemoteFile>> {
        let query = format!("'{}' in parents and trashed = false", self.folder_id);
        let response = self
            .client
            .get(format!("{}/files", DRIVE_API))
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "1000"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PensumError::Drive(format!(
                "Drive listing failed with {}: {}",
                status, body
            )));
        }

        let list: FileList = response.json().await?;
        debug!("Drive folder contains {} file(s)", list.files.len());
        Ok(list.files)
    }

    async fn download(&self, id: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/files/{}?alt=media", DRIVE_API, id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PensumError::Drive(format!(
                "Drive download of {} failed with {}",
                id, status
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!("Downloaded {} to {}", id, dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_file_parsing() {
        let parsed: TokenFile =
            serde_json::from_str(r#"{"access_token": "ya29.test", "expires_in": 3599}"#).unwrap();
        assert_eq!(parsed.access_token, "ya29.test");
    }

    #[test]
    fn test_file_list_parsing() {
        let list: FileList = serde_json::from_str(
            r#"{"files": [{"id": "abc", "name": "20240304093000.wav"}], "kind": "drive#fileList"}"#,
        )
        .unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "20240304093000.wav");
    }

    #[test]
    fn test_empty_file_list_default() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }

    #[test]
    fn test_missing_credentials_is_drive_error() {
        // Only meaningful when the env var is absent, which is the normal
        // test environment.
        if std::env::var("GOOGLE_DRIVE_TOKEN").is_ok() {
            return;
        }
        let result = DriveStore::new("folder", None);
        assert!(matches!(result, Err(PensumError::Drive(_))));
    }
}
