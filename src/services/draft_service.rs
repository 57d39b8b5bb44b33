use chrono::{Duration, Utc};
use std::path::PathBuf;

use crate::{
    database::FileStore,
    models::{Draft, SaveDraftRequest},
    services::wizard_service,
    utils::{AppError, AppResult},
};

/// Draft ids come from the browser; keep them filename-safe.
pub fn validate_draft_id(draft_id: &str) -> AppResult<()> {
    let ok_len = (8..=64).contains(&draft_id.len());
    let ok_chars = draft_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok_len && ok_chars {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Draft id must be 8-64 characters of letters, digits, '-' or '_'".to_string(),
        ))
    }
}

fn draft_path(store: &FileStore, draft_id: &str) -> PathBuf {
    store.drafts_dir().join(format!("{}.json", draft_id))
}

pub async fn save_draft(store: &FileStore, draft_id: &str, request: SaveDraftRequest) -> AppResult<Draft> {
    validate_draft_id(draft_id)?;
    if !request.data.is_object() {
        return Err(AppError::InvalidRequest("Draft data must be a JSON object".to_string()));
    }
    // step fora do intervalo vira erro 400
    wizard_service::step(request.form_type, request.current_step)?;

    let draft = Draft {
        draft_id: draft_id.to_string(),
        form_type: request.form_type,
        current_step: request.current_step,
        data: request.data,
        updated_at: Utc::now(),
    };

    store.write_json(&draft_path(store, draft_id), &draft).await?;
    log::debug!("💾 Draft {} saved at step {}", draft_id, draft.current_step);

    Ok(draft)
}

pub async fn load_draft(store: &FileStore, draft_id: &str) -> AppResult<Draft> {
    validate_draft_id(draft_id)?;
    store
        .read_json::<Draft>(&draft_path(store, draft_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Draft not found".to_string()))
}

pub async fn delete_draft(store: &FileStore, draft_id: &str) -> AppResult<()> {
    validate_draft_id(draft_id)?;
    match tokio::fs::remove_file(draft_path(store, draft_id)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::NotFound("Draft not found".to_string()))
        }
        Err(e) => Err(AppError::Storage(format!("Failed to delete draft {}: {}", draft_id, e))),
    }
}

/// Removes drafts not touched for `max_age`. Unreadable drafts are removed too.
pub async fn purge_stale(store: &FileStore, max_age: Duration) -> AppResult<usize> {
    let cutoff = Utc::now() - max_age;
    let mut removed = 0;

    let mut entries = tokio::fs::read_dir(store.drafts_dir()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let stale = match store.read_json::<Draft>(&path).await {
            Ok(Some(draft)) => draft.updated_at < cutoff,
            Ok(None) => false,
            Err(e) => {
                log::warn!("⚠️  Removing unreadable draft {}: {}", path.display(), e);
                true
            }
        };

        if stale {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("⚠️  Failed to remove draft {}: {}", path.display(), e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormType;
    use serde_json::json;
    use tempfile::TempDir;

    fn request(step: usize) -> SaveDraftRequest {
        SaveDraftRequest {
            form_type: FormType::Intake,
            current_step: step,
            data: json!({ "full_name": "Ana Souza" }),
        }
    }

    #[tokio::test]
    async fn save_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        save_draft(&store, "draft-0001", request(2)).await.unwrap();
        let loaded = load_draft(&store, "draft-0001").await.unwrap();
        assert_eq!(loaded.current_step, 2);
        assert_eq!(loaded.data["full_name"], "Ana Souza");

        delete_draft(&store, "draft-0001").await.unwrap();
        assert!(matches!(load_draft(&store, "draft-0001").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_bad_ids_and_steps() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(save_draft(&store, "../../etc", request(1)).await.is_err());
        assert!(save_draft(&store, "short", request(1)).await.is_err());
        assert!(save_draft(&store, "draft-0002", request(9)).await.is_err());
    }

    #[tokio::test]
    async fn purge_removes_only_old_drafts() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        save_draft(&store, "fresh-draft", request(1)).await.unwrap();
        let old = Draft {
            draft_id: "old-draft-1".into(),
            form_type: FormType::Feedback,
            current_step: 1,
            data: json!({}),
            updated_at: Utc::now() - Duration::days(45),
        };
        store
            .write_json(&store.drafts_dir().join("old-draft-1.json"), &old)
            .await
            .unwrap();

        let removed = purge_stale(&store, Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(load_draft(&store, "fresh-draft").await.is_ok());
    }
}
