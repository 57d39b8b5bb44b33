use serde::Serialize;
use std::collections::HashSet;

use crate::{
    database::FileStore,
    models::{FormType, MetadataRecord},
    services::metadata_store,
    utils::AppResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    Duplicate,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct RebuildReport {
    pub intake_count: usize,
    pub feedback_count: usize,
    pub duplicates_removed: usize,
    /// Metadata files that could not be parsed
    pub skipped: Vec<String>,
}

/// Records of one category. A missing master file is an empty list.
pub async fn load(store: &FileStore, form_type: FormType) -> AppResult<Vec<MetadataRecord>> {
    Ok(store
        .read_json::<Vec<MetadataRecord>>(&store.master_path(form_type))
        .await?
        .unwrap_or_default())
}

/// Appends `record` to its category's master file unless a record with the
/// same filename is already there. The previous file is kept as `.backup`.
pub async fn append(store: &FileStore, record: &MetadataRecord) -> AppResult<AppendOutcome> {
    let _guard = store.masters_lock().lock().await;

    let path = store.master_path(record.form_type);
    let mut records = load(store, record.form_type).await?;

    if records.iter().any(|r| r.filename == record.filename) {
        log::info!("ℹ️  {} already in {}", record.filename, record.form_type.master_file_name());
        return Ok(AppendOutcome::Duplicate);
    }

    records.push(record.clone());
    store.backup(&path).await?;
    store.write_json(&path, &records).await?;

    log::info!(
        "📚 {} updated ({} records)",
        record.form_type.master_file_name(),
        records.len()
    );
    Ok(AppendOutcome::Appended)
}

/// Rebuilds both master files from the per-submission metadata files
/// ("update-data"). Records are de-duplicated by filename and sorted by
/// submission time.
pub async fn rebuild(store: &FileStore) -> AppResult<RebuildReport> {
    // lock antes de listar: um append concorrente não pode ser sobrescrito
    let _guard = store.masters_lock().lock().await;
    let (records, skipped) = metadata_store::list_all(store).await?;
    let total = records.len();

    let mut intakes = Vec::new();
    let mut feedback = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.filename.clone()) {
            continue;
        }
        match record.form_type {
            FormType::Intake => intakes.push(record),
            FormType::Feedback => feedback.push(record),
        }
    }
    intakes.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
    feedback.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

    for (form_type, list) in [(FormType::Intake, &intakes), (FormType::Feedback, &feedback)] {
        let path = store.master_path(form_type);
        store.backup(&path).await?;
        store.write_json(&path, list).await?;
    }

    let report = RebuildReport {
        intake_count: intakes.len(),
        feedback_count: feedback.len(),
        duplicates_removed: total - intakes.len() - feedback.len(),
        skipped,
    };
    log::info!(
        "🔄 Master files rebuilt: {} intakes, {} feedback, {} skipped",
        report.intake_count,
        report.feedback_count,
        report.skipped.len()
    );
    Ok(report)
}
