use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categoria do formulário (define o master file e o wizard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Intake,
    Feedback,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Intake => "intake",
            FormType::Feedback => "feedback",
        }
    }

    pub fn master_file_name(&self) -> &'static str {
        match self {
            FormType::Intake => "master_intakes.json",
            FormType::Feedback => "master_feedback.json",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FormType::Intake => "Client Intake Form",
            FormType::Feedback => "Session Feedback Form",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intake" | "intakes" => Ok(FormType::Intake),
            "feedback" => Ok(FormType::Feedback),
            other => Err(format!("Unknown form type: {}", other)),
        }
    }
}

/// Request body for `POST /api/submit-form`
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FormSubmission {
    pub form_type: FormType,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Intake questionnaire, filled before the first session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeForm {
    // Step 1
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub preferred_contact: Option<String>,

    // Step 2
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    #[serde(default)]
    pub emergency_contact_relationship: Option<String>,

    // Step 3
    #[serde(default)]
    pub has_medical_conditions: bool,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub taking_medications: bool,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub has_allergies: bool,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub is_pregnant: bool,
    #[serde(default)]
    pub pregnancy_weeks: Option<u32>,
    #[serde(default)]
    pub recent_injuries: Option<String>,

    // Step 4
    pub reason_for_visit: String,
    #[serde(default)]
    pub primary_concerns: Vec<String>,
    #[serde(default)]
    pub pain_areas: Vec<String>,
    pub pain_level: u8,
    pub pressure_preference: String,
    #[serde(default)]
    pub areas_to_avoid: Option<String>,
    #[serde(default)]
    pub previous_massage: bool,
    #[serde(default)]
    pub last_massage_date: Option<NaiveDate>,
    #[serde(default)]
    pub referral_source: Option<String>,
    #[serde(default)]
    pub referral_details: Option<String>,

    // Step 5
    pub consent_given: bool,
    pub signature: String,
}

impl IntakeForm {
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        age_on(self.date_of_birth, today)
    }
}

/// Post-session questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackForm {
    // Step 1
    pub client_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub session_date: NaiveDate,
    #[serde(default)]
    pub therapist_name: Option<String>,

    // Step 2
    pub overall_rating: u8,
    pub pressure_rating: String,
    #[serde(default)]
    pub comfort_rating: Option<u8>,
    #[serde(default)]
    pub pain_level_before: Option<u8>,
    #[serde(default)]
    pub pain_level_after: Option<u8>,
    #[serde(default)]
    pub areas_improved: Vec<String>,

    // Step 3
    #[serde(default)]
    pub would_recommend: bool,
    #[serde(default)]
    pub would_return: bool,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub testimonial_consent: bool,
    #[serde(default)]
    pub testimonial: Option<String>,
}

impl FeedbackForm {
    /// Positive = pain went down
    pub fn pain_change(&self) -> Option<i16> {
        match (self.pain_level_before, self.pain_level_after) {
            (Some(before), Some(after)) => Some(before as i16 - after as i16),
            _ => None,
        }
    }
}

/// Full years between `birth` and `today`; None when birth is in the future
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
