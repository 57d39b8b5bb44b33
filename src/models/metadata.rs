use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::form::{FeedbackForm, FormType, IntakeForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Local,
    GoogleDrive,
}

/// Where the generated PDF ended up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredFile {
    pub backend: StorageKind,
    /// Local path or Drive file name
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

/// Health and preference fields kept from an intake submission.
/// Signature and emergency contact are left in the PDF only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct IntakeSnapshot {
    pub age: Option<u32>,
    pub preferred_contact: Option<String>,
    pub reason_for_visit: String,
    pub primary_concerns: Vec<String>,
    pub pain_areas: Vec<String>,
    pub pain_level: u8,
    pub pressure_preference: String,
    pub areas_to_avoid: Option<String>,
    pub first_visit: bool,
    pub referral_source: Option<String>,
    pub has_medical_conditions: bool,
    pub medical_conditions: Option<String>,
    pub taking_medications: bool,
    pub medications: Option<String>,
    pub has_allergies: bool,
    pub allergies: Option<String>,
    pub is_pregnant: bool,
    pub recent_injuries: Option<String>,
}

impl IntakeSnapshot {
    pub fn from_form(form: &IntakeForm, today: NaiveDate) -> Self {
        Self {
            age: form.age_on(today),
            preferred_contact: form.preferred_contact.clone(),
            reason_for_visit: form.reason_for_visit.clone(),
            primary_concerns: form.primary_concerns.clone(),
            pain_areas: form.pain_areas.clone(),
            pain_level: form.pain_level,
            pressure_preference: form.pressure_preference.clone(),
            areas_to_avoid: form.areas_to_avoid.clone(),
            first_visit: !form.previous_massage,
            referral_source: form.referral_source.clone(),
            has_medical_conditions: form.has_medical_conditions,
            medical_conditions: form.medical_conditions.clone(),
            taking_medications: form.taking_medications,
            medications: form.medications.clone(),
            has_allergies: form.has_allergies,
            allergies: form.allergies.clone(),
            is_pregnant: form.is_pregnant,
            recent_injuries: form.recent_injuries.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FeedbackSnapshot {
    pub session_date: NaiveDate,
    pub therapist_name: Option<String>,
    pub overall_rating: u8,
    pub pressure_rating: String,
    pub comfort_rating: Option<u8>,
    pub pain_level_before: Option<u8>,
    pub pain_level_after: Option<u8>,
    pub pain_change: Option<i16>,
    pub areas_improved: Vec<String>,
    pub would_recommend: bool,
    pub would_return: bool,
    pub comments: Option<String>,
    pub testimonial_consent: bool,
}

impl From<&FeedbackForm> for FeedbackSnapshot {
    fn from(form: &FeedbackForm) -> Self {
        Self {
            session_date: form.session_date,
            therapist_name: form.therapist_name.clone(),
            overall_rating: form.overall_rating,
            pressure_rating: form.pressure_rating.clone(),
            comfort_rating: form.comfort_rating,
            pain_level_before: form.pain_level_before,
            pain_level_after: form.pain_level_after,
            pain_change: form.pain_change(),
            areas_improved: form.areas_improved.clone(),
            would_recommend: form.would_recommend,
            would_return: form.would_return,
            comments: form.comments.clone(),
            testimonial_consent: form.testimonial_consent,
        }
    }
}

/// One JSON file per submission under `metadata/`, also the element type of
/// the master arrays. `filename` is the de-duplication key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetadataRecord {
    pub filename: String,
    pub form_type: FormType,
    pub client_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub storage: StoredFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake: Option<IntakeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackSnapshot>,
}

impl MetadataRecord {
    pub fn for_intake(filename: String, form: &IntakeForm, storage: StoredFile, submitted_at: DateTime<Utc>) -> Self {
        Self {
            filename,
            form_type: FormType::Intake,
            client_name: form.full_name.trim().to_string(),
            email: Some(form.email.trim().to_string()),
            phone: Some(form.phone.trim().to_string()),
            submitted_at,
            storage,
            intake: Some(IntakeSnapshot::from_form(form, submitted_at.date_naive())),
            feedback: None,
        }
    }

    pub fn for_feedback(filename: String, form: &FeedbackForm, storage: StoredFile, submitted_at: DateTime<Utc>) -> Self {
        Self {
            filename,
            form_type: FormType::Feedback,
            client_name: form.client_name.trim().to_string(),
            email: form.email.as_ref().map(|e| e.trim().to_string()),
            phone: None,
            submitted_at,
            storage,
            intake: None,
            feedback: Some(FeedbackSnapshot::from(form)),
        }
    }

    /// Identity used to group submissions by client: email when present, else name
    pub fn client_key(&self) -> String {
        match self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => email.to_lowercase(),
            None => self.client_name.trim().to_lowercase(),
        }
    }
}

pub fn file_stem(filename: &str) -> &str {
    filename.strip_suffix(".pdf").unwrap_or(filename)
}
