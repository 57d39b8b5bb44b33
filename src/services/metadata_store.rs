use std::path::PathBuf;

use crate::{
    database::FileStore,
    models::{file_stem, MetadataRecord},
    utils::{AppError, AppResult},
};

/// Rejects anything that could escape the data directory.
pub fn validate_filename(filename: &str) -> AppResult<()> {
    let bad = filename.is_empty()
        || filename.len() > 200
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.contains('\0')
        || !filename.ends_with(".pdf");
    if bad {
        return Err(AppError::InvalidRequest(format!("Invalid filename: {}", filename)));
    }
    Ok(())
}

fn record_path(store: &FileStore, filename: &str) -> PathBuf {
    store.metadata_dir().join(format!("{}.json", file_stem(filename)))
}

pub async fn save(store: &FileStore, record: &MetadataRecord) -> AppResult<PathBuf> {
    validate_filename(&record.filename)?;
    let path = record_path(store, &record.filename);
    store.write_json(&path, record).await?;
    log::info!("📝 Metadata saved: {}", path.display());
    Ok(path)
}

pub async fn load(store: &FileStore, filename: &str) -> AppResult<MetadataRecord> {
    validate_filename(filename)?;
    store
        .read_json::<MetadataRecord>(&record_path(store, filename))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", filename)))
}

/// Every parseable record in `metadata/`, plus the names of files that could
/// not be read.
pub async fn list_all(store: &FileStore) -> AppResult<(Vec<MetadataRecord>, Vec<String>)> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    let mut entries = tokio::fs::read_dir(store.metadata_dir()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();

        match store.read_json::<MetadataRecord>(&path).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                log::warn!("⚠️  Skipping metadata file {}: {}", name, e);
                skipped.push(name);
            }
        }
    }

    skipped.sort();
    Ok((records, skipped))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{FormType, MetadataRecord, StorageKind, StoredFile};
    use chrono::{DateTime, Utc};

    /// Minimal record for store/master tests
    pub fn record(filename: &str, form_type: FormType, submitted_at: DateTime<Utc>) -> MetadataRecord {
        MetadataRecord {
            filename: filename.to_string(),
            form_type,
            client_name: "Test Client".to_string(),
            email: Some("client@example.com".to_string()),
            phone: None,
            submitted_at,
            storage: StoredFile {
                backend: StorageKind::Local,
                location: filename.to_string(),
                file_id: None,
                web_link: None,
            },
            intake: None,
            feedback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use crate::models::FormType;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn filename_rules() {
        assert!(validate_filename("intake_ana_20261019_101500_ab12cd34.pdf").is_ok());
        assert!(validate_filename("../users.pdf").is_err());
        assert!(validate_filename("a/b.pdf").is_err());
        assert!(validate_filename("intake.json").is_err());
        assert!(validate_filename("").is_err());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let rec = record("intake_ana_1.pdf", FormType::Intake, Utc::now());

        let path = save(&store, &rec).await.unwrap();
        assert!(path.ends_with("metadata/intake_ana_1.json"));
        assert_eq!(load(&store, "intake_ana_1.pdf").await.unwrap(), rec);
        assert!(matches!(load(&store, "missing.pdf").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_all_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        save(&store, &record("intake_a.pdf", FormType::Intake, Utc::now())).await.unwrap();
        save(&store, &record("feedback_b.pdf", FormType::Feedback, Utc::now())).await.unwrap();
        tokio::fs::write(store.metadata_dir().join("broken.json"), b"[").await.unwrap();
        tokio::fs::write(store.metadata_dir().join("notes.txt"), b"ignored").await.unwrap();

        let (records, skipped) = list_all(&store).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, vec!["broken.json".to_string()]);
    }
}
