use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Therapist input for a SOAP note
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct SoapRequest {
    /// Intake submission the note is about
    pub intake_filename: String,
    #[serde(default)]
    pub feedback_filename: Option<String>,
    #[serde(default)]
    pub session_date: Option<NaiveDate>,
    #[serde(default)]
    pub session_minutes: Option<u32>,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub areas_treated: Vec<String>,
    #[serde(default)]
    pub pressure_used: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SoapNote {
    pub client_name: String,
    pub session_date: NaiveDate,
    pub intake_filename: String,
    pub feedback_filename: Option<String>,
    pub subjective: Vec<String>,
    pub objective: Vec<String>,
    pub assessment: Vec<String>,
    pub plan: Vec<String>,
    pub precautions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
