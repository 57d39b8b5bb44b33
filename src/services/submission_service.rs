use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    database::FileStore,
    models::{FeedbackForm, FormSubmission, FormType, IntakeForm, MetadataRecord, StorageKind, StoredFile},
    services::{
        analytics_service::AnalyticsCache,
        master_file_service::{self, AppendOutcome},
        metadata_store, pdf_service,
        storage_service::DocumentStorage,
        wizard_service,
    },
    utils::{AppError, AppResult},
};

const MAX_NAME_LEN: usize = 40;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub form_type: FormType,
    pub storage: StoredFile,
    /// Per-submission metadata file written
    pub metadata_saved: bool,
    /// Record added to (or already present in) the master file
    pub master_updated: bool,
}

enum TypedForm {
    Intake(IntakeForm),
    Feedback(FeedbackForm),
}

impl TypedForm {
    fn client_name(&self) -> &str {
        match self {
            TypedForm::Intake(f) => &f.full_name,
            TypedForm::Feedback(f) => &f.client_name,
        }
    }
}

/// `Ana  Souza-Lima!` -> `ana_souza_lima`
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::new();
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let mut out: String = out.trim_end_matches('_').chars().take(MAX_NAME_LEN).collect();
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        "client".to_string()
    } else {
        out
    }
}

/// `<type>_<name>_<YYYYMMDD_HHMMSS>_<8 hex>.pdf`
pub fn build_filename(form_type: FormType, client_name: &str, at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}.pdf",
        form_type.as_str(),
        sanitize_name(client_name),
        at.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

fn parse_form(form_type: FormType, data: serde_json::Value) -> AppResult<TypedForm> {
    let invalid = |e: serde_json::Error| AppError::InvalidRequest(format!("Invalid {} form data: {}", form_type, e));
    Ok(match form_type {
        FormType::Intake => TypedForm::Intake(serde_json::from_value(data).map_err(invalid)?),
        FormType::Feedback => TypedForm::Feedback(serde_json::from_value(data).map_err(invalid)?),
    })
}

/// Validates, renders, stores and indexes one form submission.
/// The stored PDF is the success signal; metadata and master file
/// failures are logged and reported in the response flags.
pub async fn submit(
    store: &FileStore,
    storage: &DocumentStorage,
    cache: &AnalyticsCache,
    submission: &FormSubmission,
) -> AppResult<SubmitResponse> {
    let form_type = submission.form_type;
    let data = wizard_service::normalize(form_type, &submission.data)?;

    let errors = wizard_service::validate_all(form_type, &data)?;
    if !errors.is_empty() {
        log::info!("📝 {} submission rejected: {} invalid field(s)", form_type, errors.len());
        return Err(AppError::Validation(errors));
    }

    let form = parse_form(form_type, data)?;
    let submitted_at = Utc::now();
    let filename = build_filename(form_type, form.client_name(), submitted_at);

    let (bytes, form) = {
        let filename = filename.clone();
        pdf_service::render(move || {
            let bytes = match &form {
                TypedForm::Intake(f) => pdf_service::render_intake(f, &filename, submitted_at),
                TypedForm::Feedback(f) => pdf_service::render_feedback(f, &filename, submitted_at),
            }?;
            Ok((bytes, form))
        })
        .await?
    };
    log::info!("📄 Rendered {} ({} bytes)", filename, bytes.len());

    let stored = storage.store(&filename, &bytes).await?;

    let record = match &form {
        TypedForm::Intake(f) => MetadataRecord::for_intake(filename.clone(), f, stored.clone(), submitted_at),
        TypedForm::Feedback(f) => MetadataRecord::for_feedback(filename.clone(), f, stored.clone(), submitted_at),
    };

    let metadata_saved = match metadata_store::save(store, &record).await {
        Ok(_) => true,
        Err(e) => {
            log::warn!("⚠️  Metadata for {} not saved: {}", filename, e);
            false
        }
    };

    let master_updated = match master_file_service::append(store, &record).await {
        Ok(AppendOutcome::Appended) => true,
        Ok(AppendOutcome::Duplicate) => {
            log::warn!("⚠️  {} already present in {}", filename, form_type.master_file_name());
            true
        }
        Err(e) => {
            log::warn!("⚠️  Master file not updated for {}: {}", filename, e);
            false
        }
    };

    cache.invalidate();
    log::info!("✅ {} submission stored as {} ({:?})", form_type, filename, stored.backend);

    Ok(SubmitResponse {
        success: true,
        message: format!("{} submitted successfully", form_type.title()),
        filename,
        form_type,
        storage: stored,
        metadata_saved,
        master_updated,
    })
}

/// PDF bytes for a locally stored submission
pub async fn download_pdf(store: &FileStore, storage: &DocumentStorage, filename: &str) -> AppResult<Vec<u8>> {
    match storage.read_local(filename).await {
        Err(AppError::NotFound(msg)) => {
            // Arquivo pode estar no Drive
            if let Ok(record) = metadata_store::load(store, filename).await {
                if record.storage.backend == StorageKind::GoogleDrive {
                    let link = record.storage.web_link.unwrap_or(record.storage.location);
                    return Err(AppError::NotFound(format!("{} is stored in Google Drive: {}", filename, link)));
                }
            }
            Err(AppError::NotFound(msg))
        }
        other => other,
    }
}
