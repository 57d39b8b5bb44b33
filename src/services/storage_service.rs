use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::{
    config::AppConfig,
    database::FileStore,
    models::{StorageKind, StoredFile},
    services::metadata_store::validate_filename,
    utils::{AppError, AppResult},
};

const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Destination for generated PDFs
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    async fn upload(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredFile>;
}

/// Writes PDFs under `<DATA_DIR>/pdfs/`
pub struct LocalStorage {
    store: FileStore,
}

impl LocalStorage {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.store.pdf_dir().join(filename)
    }

    pub async fn read(&self, filename: &str) -> AppResult<Vec<u8>> {
        validate_filename(filename)?;
        match tokio::fs::read(self.path_for(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("PDF {} not stored locally", filename)))
            }
            Err(e) => Err(AppError::Storage(format!("Failed to read {}: {}", filename, e))),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        validate_filename(filename)?;
        let path = self.path_for(filename);
        self.store.write_bytes(&path, bytes).await?;

        Ok(StoredFile {
            backend: StorageKind::Local,
            location: path.to_string_lossy().to_string(),
            file_id: None,
            web_link: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Google Drive v3 REST upload: media upload, then a metadata PATCH that sets
/// the name and moves the file into the configured folder.
pub struct GoogleDriveStorage {
    client: reqwest::Client,
    access_token: String,
    folder_id: Option<String>,
}

impl GoogleDriveStorage {
    pub fn new(access_token: String, folder_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            access_token,
            folder_id,
        }
    }
}

#[async_trait]
impl StorageBackend for GoogleDriveStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::GoogleDrive
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        log::info!("☁️  Uploading {} to Google Drive ({} bytes)", filename, bytes.len());

        let response = self
            .client
            .post(format!("{}?uploadType=media", DRIVE_UPLOAD_URL))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Drive upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upload(format!("Drive upload error: {}", response.status())));
        }

        let created: DriveFile = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to parse Drive response: {}", e)))?;

        let mut url = format!("{}/{}?fields=id,webViewLink", DRIVE_FILES_URL, created.id);
        if let Some(folder) = &self.folder_id {
            url.push_str(&format!("&addParents={}", urlencoding::encode(folder)));
        }

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "name": filename }))
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Drive metadata update failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upload(format!(
                "Drive metadata update error: {}",
                response.status()
            )));
        }

        let updated: DriveFile = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to parse Drive response: {}", e)))?;

        log::info!("✅ Uploaded to Google Drive: {}", updated.id);

        Ok(StoredFile {
            backend: StorageKind::GoogleDrive,
            location: filename.to_string(),
            file_id: Some(updated.id),
            web_link: updated.web_view_link,
        })
    }
}

/// Primary backend (Drive when configured) with local fallback
pub struct DocumentStorage {
    primary: Option<Box<dyn StorageBackend>>,
    local: LocalStorage,
}

impl DocumentStorage {
    pub fn new(primary: Option<Box<dyn StorageBackend>>, local: LocalStorage) -> Self {
        Self { primary, local }
    }

    pub fn from_config(config: &AppConfig, store: FileStore) -> Self {
        let primary: Option<Box<dyn StorageBackend>> = config.google_drive_access_token.clone().map(|token| {
            log::info!("☁️  Google Drive storage enabled");
            Box::new(GoogleDriveStorage::new(token, config.google_drive_folder_id.clone()))
                as Box<dyn StorageBackend>
        });
        if primary.is_none() {
            log::info!("💾 Google Drive not configured, PDFs stored locally");
        }
        Self::new(primary, LocalStorage::new(store))
    }

    pub async fn store(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        if let Some(primary) = &self.primary {
            match primary.upload(filename, bytes).await {
                Ok(stored) => return Ok(stored),
                Err(e) => {
                    log::warn!("⚠️  {:?} upload failed, falling back to local storage: {}", primary.kind(), e);
                }
            }
        }
        self.local.upload(filename, bytes).await
    }

    pub async fn read_local(&self, filename: &str) -> AppResult<Vec<u8>> {
        self.local.read(filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingBackend;

    #[async_trait]
    impl StorageBackend for FailingBackend {
        fn kind(&self) -> StorageKind {
            StorageKind::GoogleDrive
        }

        async fn upload(&self, _filename: &str, _bytes: &[u8]) -> AppResult<StoredFile> {
            Err(AppError::Upload("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn falls_back_to_local() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let storage = DocumentStorage::new(Some(Box::new(FailingBackend)), LocalStorage::new(store.clone()));

        let stored = storage.store("intake_a.pdf", b"%PDF-1.3").await.unwrap();
        assert_eq!(stored.backend, StorageKind::Local);
        assert_eq!(storage.read_local("intake_a.pdf").await.unwrap(), b"%PDF-1.3");
    }

    #[tokio::test]
    async fn local_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let storage = DocumentStorage::new(None, LocalStorage::new(store));

        assert!(matches!(storage.read_local("nope.pdf").await, Err(AppError::NotFound(_))));
        assert!(matches!(storage.read_local("../users.pdf").await, Err(AppError::InvalidRequest(_))));
    }
}
