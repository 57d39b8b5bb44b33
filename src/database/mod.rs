use crate::models::FormType;
use crate::utils::{AppError, AppResult};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const METADATA_DIR: &str = "metadata";
const PDF_DIR: &str = "pdfs";
const DRAFTS_DIR: &str = "drafts";
const USERS_FILE: &str = "users.json";

/// Flat-file store rooted at `DATA_DIR`.
///
/// Layout:
/// - `metadata/<stem>.json` one record per submission
/// - `pdfs/` local PDFs plus `master_intakes.json` / `master_feedback.json`
/// - `drafts/<id>.json` wizard autosave
/// - `users.json` dashboard accounts
///
/// Every write goes through a temp file + rename. Read-modify-write cycles on
/// the shared arrays (masters, users) must hold the matching lock.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    masters_lock: Arc<Mutex<()>>,
    users_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let store = Self {
            root: root.into(),
            masters_lock: Arc::new(Mutex::new(())),
            users_lock: Arc::new(Mutex::new(())),
        };

        store.ensure_directories().await?;

        Ok(store)
    }

    /// Creates the directory layout if it is missing
    async fn ensure_directories(&self) -> AppResult<()> {
        log::info!("🔧 Preparing data directory {}", self.root.display());

        for dir in [self.metadata_dir(), self.pdf_dir(), self.drafts_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        log::info!("✅ Data directory ready");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join(PDF_DIR)
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.root.join(DRAFTS_DIR)
    }

    pub fn users_path(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    pub fn master_path(&self, form_type: FormType) -> PathBuf {
        self.pdf_dir().join(form_type.master_file_name())
    }

    pub fn masters_lock(&self) -> &Mutex<()> {
        &self.masters_lock
    }

    pub fn users_lock(&self) -> &Mutex<()> {
        &self.users_lock
    }

    /// Reads and parses a JSON file. A missing file is `Ok(None)`.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> AppResult<Option<T>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage(format!("Failed to read {}: {}", path.display(), e)))
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| AppError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Serializes `value` as pretty JSON and replaces `path` atomically.
    pub async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    pub async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> AppResult<()> {
        let tmp = tmp_path(path);

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Storage(format!(
                "Failed to replace {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }

    /// Copies `path` to `<path>.backup`. Returns false when there was nothing to copy.
    pub async fn backup(&self, path: &Path) -> AppResult<bool> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(false);
        }

        let backup = backup_path(path);
        tokio::fs::copy(path, &backup).await.map_err(|e| {
            AppError::Storage(format!("Failed to back up {}: {}", path.display(), e))
        })?;

        Ok(true)
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".backup");
    path.with_file_name(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp-{}", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(store.metadata_dir().is_dir());
        assert!(store.pdf_dir().is_dir());
        assert!(store.drafts_dir().is_dir());
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let value: Option<Vec<String>> = store.read_json(&dir.path().join("nope.json")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn write_then_backup() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let path = store.pdf_dir().join("master_intakes.json");

        assert!(!store.backup(&path).await.unwrap());

        store.write_json(&path, &vec!["a"]).await.unwrap();
        assert!(store.backup(&path).await.unwrap());
        store.write_json(&path, &vec!["a", "b"]).await.unwrap();

        let current: Vec<String> = store.read_json(&path).await.unwrap().unwrap();
        let previous: Vec<String> = store.read_json(&backup_path(&path)).await.unwrap().unwrap();
        assert_eq!(current, vec!["a", "b"]);
        assert_eq!(previous, vec!["a"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let result: AppResult<Option<Vec<String>>> = store.read_json(&path).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
