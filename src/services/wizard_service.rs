//! Multi-step wizard definitions for the intake and feedback forms.
//!
//! Each step is a list of fields with a kind, a required flag and an optional
//! visibility condition on another field. Hidden fields are never validated
//! and are dropped before a submission is deserialized.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::FormType;
use crate::utils::{AppError, AppResult, FieldError};

pub const PAIN_AREAS: &[&str] = &[
    "head", "neck", "shoulders", "upper_back", "lower_back", "arms", "hands", "hips", "legs", "feet",
];

pub const CONCERNS: &[&str] = &[
    "stress",
    "muscle_tension",
    "chronic_pain",
    "injury_recovery",
    "sports_performance",
    "relaxation",
    "headaches",
    "mobility",
];

pub const PRESSURE_PREFERENCES: &[&str] = &["light", "medium", "firm", "deep"];

pub const PRESSURE_RATINGS: &[&str] = &["too_light", "just_right", "too_firm"];

pub const REFERRAL_SOURCES: &[&str] = &[
    "friend",
    "online_search",
    "social_media",
    "doctor",
    "returning_client",
    "other",
];

const CONTACT_METHODS: &[&str] = &["email", "phone", "text"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text { max_len: usize },
    Email,
    Phone,
    /// `YYYY-MM-DD`, today or earlier
    Date,
    Integer { min: i64, max: i64 },
    Boolean,
    Choice { options: &'static [&'static str] },
    MultiChoice { options: &'static [&'static str] },
    /// Checkbox that must be ticked
    Consent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Expected {
    Bool(bool),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Condition {
    pub field: &'static str,
    pub equals: Expected,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub visible_when: Option<Condition>,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> Self {
        Self {
            name,
            label,
            kind,
            required,
            visible_when: None,
        }
    }

    const fn when(self, field: &'static str, equals: Expected) -> Self {
        Self {
            visible_when: Some(Condition { field, equals }),
            ..self
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepSpec {
    pub index: usize,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn text(max_len: usize) -> FieldKind {
    FieldKind::Text { max_len }
}

const fn int(min: i64, max: i64) -> FieldKind {
    FieldKind::Integer { min, max }
}

const YES: Expected = Expected::Bool(true);

const INTAKE_STEPS: &[StepSpec] = &[
    StepSpec {
        index: 1,
        title: "Personal Information",
        fields: &[
            FieldSpec::new("full_name", "Full name", text(100), true),
            FieldSpec::new("email", "Email", FieldKind::Email, true),
            FieldSpec::new("phone", "Phone", FieldKind::Phone, true),
            FieldSpec::new("date_of_birth", "Date of birth", FieldKind::Date, true),
            FieldSpec::new("preferred_contact", "Preferred contact method", FieldKind::Choice { options: CONTACT_METHODS }, false),
        ],
    },
    StepSpec {
        index: 2,
        title: "Emergency Contact",
        fields: &[
            FieldSpec::new("emergency_contact_name", "Emergency contact name", text(100), true),
            FieldSpec::new("emergency_contact_phone", "Emergency contact phone", FieldKind::Phone, true),
            FieldSpec::new("emergency_contact_relationship", "Relationship", text(50), false),
        ],
    },
    StepSpec {
        index: 3,
        title: "Health History",
        fields: &[
            FieldSpec::new("has_medical_conditions", "Any medical conditions", FieldKind::Boolean, true),
            FieldSpec::new("medical_conditions", "Medical conditions", text(1000), true).when("has_medical_conditions", YES),
            FieldSpec::new("taking_medications", "Currently taking medications", FieldKind::Boolean, true),
            FieldSpec::new("medications", "Medications", text(1000), true).when("taking_medications", YES),
            FieldSpec::new("has_allergies", "Any allergies", FieldKind::Boolean, true),
            FieldSpec::new("allergies", "Allergies", text(500), true).when("has_allergies", YES),
            FieldSpec::new("is_pregnant", "Pregnant", FieldKind::Boolean, false),
            FieldSpec::new("pregnancy_weeks", "Weeks of pregnancy", int(1, 42), false).when("is_pregnant", YES),
            FieldSpec::new("recent_injuries", "Recent injuries or surgeries", text(1000), false),
        ],
    },
    StepSpec {
        index: 4,
        title: "Session Preferences",
        fields: &[
            FieldSpec::new("reason_for_visit", "Reason for visit", text(500), true),
            FieldSpec::new("primary_concerns", "Primary concerns", FieldKind::MultiChoice { options: CONCERNS }, false),
            FieldSpec::new("pain_areas", "Areas of pain", FieldKind::MultiChoice { options: PAIN_AREAS }, false),
            FieldSpec::new("pain_level", "Pain level", int(0, 10), true),
            FieldSpec::new("pressure_preference", "Pressure preference", FieldKind::Choice { options: PRESSURE_PREFERENCES }, true),
            FieldSpec::new("areas_to_avoid", "Areas to avoid", text(500), false),
            FieldSpec::new("previous_massage", "Had a professional massage before", FieldKind::Boolean, true),
            FieldSpec::new("last_massage_date", "Date of last massage", FieldKind::Date, false).when("previous_massage", YES),
            FieldSpec::new("referral_source", "How did you hear about us", FieldKind::Choice { options: REFERRAL_SOURCES }, false),
            FieldSpec::new("referral_details", "Referral details", text(200), true).when("referral_source", Expected::Str("other")),
        ],
    },
    StepSpec {
        index: 5,
        title: "Consent",
        fields: &[
            FieldSpec::new("consent_given", "Consent to treatment", FieldKind::Consent, true),
            FieldSpec::new("signature", "Signature", text(100), true),
        ],
    },
];

const FEEDBACK_STEPS: &[StepSpec] = &[
    StepSpec {
        index: 1,
        title: "Session Details",
        fields: &[
            FieldSpec::new("client_name", "Your name", text(100), true),
            FieldSpec::new("email", "Email", FieldKind::Email, false),
            FieldSpec::new("session_date", "Session date", FieldKind::Date, true),
            FieldSpec::new("therapist_name", "Therapist", text(100), false),
        ],
    },
    StepSpec {
        index: 2,
        title: "Your Experience",
        fields: &[
            FieldSpec::new("overall_rating", "Overall rating", int(1, 5), true),
            FieldSpec::new("pressure_rating", "Pressure", FieldKind::Choice { options: PRESSURE_RATINGS }, true),
            FieldSpec::new("comfort_rating", "Comfort rating", int(1, 5), false),
            FieldSpec::new("pain_level_before", "Pain before session", int(0, 10), false),
            FieldSpec::new("pain_level_after", "Pain after session", int(0, 10), false),
            FieldSpec::new("areas_improved", "Areas that improved", FieldKind::MultiChoice { options: PAIN_AREAS }, false),
        ],
    },
    StepSpec {
        index: 3,
        title: "Follow-up",
        fields: &[
            FieldSpec::new("would_recommend", "Would recommend us", FieldKind::Boolean, true),
            FieldSpec::new("would_return", "Would book again", FieldKind::Boolean, true),
            FieldSpec::new("comments", "Comments", text(2000), false),
            FieldSpec::new("testimonial_consent", "May we share your feedback", FieldKind::Boolean, false),
            FieldSpec::new("testimonial", "Testimonial", text(1000), true).when("testimonial_consent", YES),
        ],
    },
];

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StepValidation {
    pub step: usize,
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub visible_fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "step", rename_all = "snake_case")]
pub enum WizardAdvance {
    Next(usize),
    ReadyToSubmit,
}

pub fn steps(form_type: FormType) -> &'static [StepSpec] {
    match form_type {
        FormType::Intake => INTAKE_STEPS,
        FormType::Feedback => FEEDBACK_STEPS,
    }
}

pub fn step(form_type: FormType, index: usize) -> AppResult<&'static StepSpec> {
    let all = steps(form_type);
    index
        .checked_sub(1)
        .and_then(|i| all.get(i))
        .ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "Step {} does not exist for the {} form (1-{})",
                index,
                form_type,
                all.len()
            ))
        })
}

fn all_fields(form_type: FormType) -> impl Iterator<Item = &'static FieldSpec> {
    steps(form_type).iter().flat_map(|s| s.fields.iter())
}

fn find_field(form_type: FormType, name: &str) -> Option<&'static FieldSpec> {
    all_fields(form_type).find(|f| f.name == name)
}

fn as_object(data: &Value) -> AppResult<&Map<String, Value>> {
    data.as_object()
        .ok_or_else(|| AppError::InvalidRequest("Form data must be a JSON object".to_string()))
}

/// A field is visible when its condition holds and the controlling field is
/// itself visible.
fn is_visible(form_type: FormType, field: &FieldSpec, data: &Map<String, Value>) -> bool {
    match field.visible_when {
        None => true,
        Some(cond) => {
            let controller_visible = find_field(form_type, cond.field)
                .map(|controller| is_visible(form_type, controller, data))
                .unwrap_or(true);
            controller_visible && condition_met(cond, data.get(cond.field))
        }
    }
}

fn condition_met(cond: Condition, value: Option<&Value>) -> bool {
    match cond.equals {
        Expected::Bool(expected) => value.and_then(coerce_bool) == Some(expected),
        Expected::Str(expected) => value.and_then(Value::as_str).map(str::trim) == Some(expected),
    }
}

pub fn visible_fields(form_type: FormType, data: &Value) -> AppResult<Vec<&'static str>> {
    let map = as_object(data)?;
    Ok(all_fields(form_type)
        .filter(|f| is_visible(form_type, f, map))
        .map(|f| f.name)
        .collect())
}

pub fn validate_step(form_type: FormType, index: usize, data: &Value) -> AppResult<StepValidation> {
    let spec = step(form_type, index)?;
    let map = as_object(data)?;

    let mut errors = Vec::new();
    let mut visible = Vec::new();
    for field in spec.fields.iter().filter(|f| is_visible(form_type, f, map)) {
        visible.push(field.name.to_string());
        if let Some(err) = check_field(field, map.get(field.name)) {
            errors.push(err);
        }
    }

    Ok(StepValidation {
        step: index,
        valid: errors.is_empty(),
        errors,
        visible_fields: visible,
    })
}

/// Validates `index` and moves to the next step that has something visible.
pub fn advance(form_type: FormType, index: usize, data: &Value) -> AppResult<WizardAdvance> {
    let validation = validate_step(form_type, index, data)?;
    if !validation.valid {
        return Err(AppError::Validation(validation.errors));
    }

    let map = as_object(data)?;
    let next = steps(form_type)
        .iter()
        .skip(index)
        .find(|s| s.fields.iter().any(|f| is_visible(form_type, f, map)));

    Ok(match next {
        Some(s) => WizardAdvance::Next(s.index),
        None => WizardAdvance::ReadyToSubmit,
    })
}

pub fn validate_all(form_type: FormType, data: &Value) -> AppResult<Vec<FieldError>> {
    let mut errors = Vec::new();
    for spec in steps(form_type) {
        errors.extend(validate_step(form_type, spec.index, data)?.errors);
    }
    Ok(errors)
}

/// Drops hidden conditional fields and keys the wizard does not know about.
pub fn strip_hidden(form_type: FormType, data: &Value) -> AppResult<Value> {
    let map = as_object(data)?;
    let kept: Map<String, Value> = all_fields(form_type)
        .filter(|f| is_visible(form_type, f, map))
        .filter_map(|f| map.get(f.name).map(|v| (f.name.to_string(), v.clone())))
        .collect();
    Ok(Value::Object(kept))
}

/// `strip_hidden` plus trimming, removal of empty answers and coercion of
/// checkbox/number strings so the payload deserializes into the typed form.
pub fn normalize(form_type: FormType, data: &Value) -> AppResult<Value> {
    let stripped = strip_hidden(form_type, data)?;
    let mut out = Map::new();

    if let Value::Object(map) = stripped {
        for (name, value) in map {
            if is_empty(&value) {
                continue;
            }
            let kind = find_field(form_type, &name).map(|f| f.kind);
            let value = match kind {
                Some(FieldKind::Boolean | FieldKind::Consent) => {
                    coerce_bool(&value).map(Value::Bool).unwrap_or(value)
                }
                Some(FieldKind::Integer { .. }) => coerce_int(&value).map(Value::from).unwrap_or(value),
                Some(FieldKind::MultiChoice { .. }) => normalize_choices(value),
                _ => trim_string(value),
            };
            out.insert(name, value);
        }
    }

    Ok(Value::Object(out))
}

/// Single string -> one-item list; items trimmed, blanks and repeats dropped
fn normalize_choices(value: Value) -> Value {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items.into_iter().map(trim_string) {
        if is_empty(&item) || out.contains(&item) {
            continue;
        }
        out.push(item);
    }
    Value::Array(out)
}

fn trim_string(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_field(field: &FieldSpec, value: Option<&Value>) -> Option<FieldError> {
    let value = match value {
        Some(v) if !is_empty(v) => v,
        _ => {
            return field
                .required
                .then(|| FieldError::new(field.name, format!("{} is required", field.label)))
        }
    };

    let fail = |msg: String| Some(FieldError::new(field.name, msg));

    match field.kind {
        FieldKind::Text { max_len } => match value.as_str() {
            Some(s) if s.trim().chars().count() > max_len => {
                fail(format!("{} must be at most {} characters", field.label, max_len))
            }
            Some(_) => None,
            None => fail(format!("{} must be text", field.label)),
        },
        FieldKind::Email => match value.as_str() {
            Some(s) if is_valid_email(s) => None,
            _ => fail("Please enter a valid email address".to_string()),
        },
        FieldKind::Phone => match value.as_str() {
            Some(s) if is_valid_phone(s) => None,
            _ => fail("Please enter a valid phone number".to_string()),
        },
        FieldKind::Date => match value.as_str().map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")) {
            Some(Ok(date)) if date <= Utc::now().date_naive() => None,
            Some(Ok(_)) => fail(format!("{} cannot be in the future", field.label)),
            _ => fail(format!("{} must be a date (YYYY-MM-DD)", field.label)),
        },
        FieldKind::Integer { min, max } => match coerce_int(value) {
            Some(n) if (min..=max).contains(&n) => None,
            _ => fail(format!("{} must be a number between {} and {}", field.label, min, max)),
        },
        FieldKind::Boolean => match coerce_bool(value) {
            Some(_) => None,
            None => fail(format!("{} must be yes or no", field.label)),
        },
        FieldKind::Choice { options } => match value.as_str() {
            Some(s) if options.contains(&s.trim()) => None,
            _ => fail(format!("{} must be one of: {}", field.label, options.join(", "))),
        },
        FieldKind::MultiChoice { options } => {
            let valid = match value {
                Value::Array(items) => items
                    .iter()
                    .all(|i| i.as_str().map(|s| options.contains(&s.trim())).unwrap_or(false)),
                Value::String(s) => options.contains(&s.trim()),
                _ => false,
            };
            if valid {
                None
            } else {
                fail(format!("{} contains an unknown option", field.label))
            }
        }
        FieldKind::Consent => match coerce_bool(value) {
            Some(true) => None,
            _ => fail("You must give consent to continue".to_string()),
        },
    }
}

pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

pub fn is_valid_phone(raw: &str) -> bool {
    let allowed = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    allowed && (10..=15).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intake_step1() -> Value {
        json!({
            "full_name": "Ana Souza",
            "email": "ana@example.com",
            "phone": "(555) 123-4567",
            "date_of_birth": "1990-04-12"
        })
    }

    #[test]
    fn step_numbers_are_one_based() {
        assert!(step(FormType::Intake, 0).is_err());
        assert_eq!(step(FormType::Intake, 1).unwrap().title, "Personal Information");
        assert!(step(FormType::Intake, 6).is_err());
        assert!(step(FormType::Feedback, 3).is_ok());
    }

    #[test]
    fn valid_first_step() {
        let result = validate_step(FormType::Intake, 1, &intake_step1()).unwrap();
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn reports_each_bad_field() {
        let data = json!({ "full_name": "", "email": "ana@", "phone": "12", "date_of_birth": "12/04/1990" });
        let result = validate_step(FormType::Intake, 1, &data).unwrap();
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["full_name", "email", "phone", "date_of_birth"]);
    }

    #[test]
    fn conditional_field_only_checked_when_visible() {
        let hidden = json!({
            "has_medical_conditions": false,
            "taking_medications": "no",
            "has_allergies": false
        });
        let result = validate_step(FormType::Intake, 3, &hidden).unwrap();
        assert!(result.valid, "{:?}", result.errors);
        assert!(!result.visible_fields.contains(&"medical_conditions".to_string()));

        let shown = json!({
            "has_medical_conditions": "yes",
            "taking_medications": false,
            "has_allergies": false
        });
        let result = validate_step(FormType::Intake, 3, &shown).unwrap();
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "medical_conditions");
    }

    #[test]
    fn string_condition_controls_referral_details() {
        let data = json!({ "referral_source": "other" });
        let visible = visible_fields(FormType::Intake, &data).unwrap();
        assert!(visible.contains(&"referral_details"));

        let data = json!({ "referral_source": "friend" });
        let visible = visible_fields(FormType::Intake, &data).unwrap();
        assert!(!visible.contains(&"referral_details"));
    }

    #[test]
    fn consent_must_be_true() {
        let data = json!({ "consent_given": false, "signature": "Ana Souza" });
        let result = validate_step(FormType::Intake, 5, &data).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "You must give consent to continue");
    }

    #[test]
    fn future_dates_rejected() {
        let data = json!({
            "client_name": "Ana",
            "session_date": (Utc::now().date_naive() + chrono::Duration::days(3)).format("%Y-%m-%d").to_string()
        });
        let result = validate_step(FormType::Feedback, 1, &data).unwrap();
        assert_eq!(result.errors[0].field, "session_date");
    }

    #[test]
    fn advance_moves_forward_and_finishes() {
        assert_eq!(
            advance(FormType::Intake, 1, &intake_step1()).unwrap(),
            WizardAdvance::Next(2)
        );

        let last = json!({ "would_recommend": true, "would_return": true });
        assert_eq!(
            advance(FormType::Feedback, 3, &last).unwrap(),
            WizardAdvance::ReadyToSubmit
        );

        let err = advance(FormType::Intake, 1, &json!({})).unwrap_err();
        assert!(matches!(err, AppError::Validation(errors) if errors.len() == 4));
    }

    #[test]
    fn normalize_strips_hidden_and_coerces() {
        let data = json!({
            "has_medical_conditions": "no",
            "medical_conditions": "leftover text",
            "pain_level": "7",
            "pain_areas": "neck",
            "full_name": "  Ana  ",
            "referral_source": "",
            "unknown_field": "x"
        });
        let out = normalize(FormType::Intake, &data).unwrap();

        assert_eq!(out["has_medical_conditions"], json!(false));
        assert!(out.get("medical_conditions").is_none());
        assert_eq!(out["pain_level"], json!(7));
        assert_eq!(out["pain_areas"], json!(["neck"]));
        assert_eq!(out["full_name"], json!("Ana"));
        assert!(out.get("referral_source").is_none());
        assert!(out.get("unknown_field").is_none());
    }

    #[test]
    fn multi_choice_items_are_trimmed_and_deduplicated() {
        let data = json!({ "pain_areas": [" neck", "neck", "shoulders ", "", "shoulders"] });
        let out = normalize(FormType::Intake, &data).unwrap();
        assert_eq!(out["pain_areas"], json!(["neck", "shoulders"]));

        let errors = validate_all(FormType::Intake, &out).unwrap();
        assert!(errors.iter().all(|e| e.field != "pain_areas"), "{:?}", errors);
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(matches!(
            validate_step(FormType::Intake, 1, &json!([1, 2])),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn email_and_phone_rules() {
        assert!(is_valid_email("client@clinic.co"));
        assert!(!is_valid_email("client@clinic"));
        assert!(!is_valid_email("cli ent@clinic.co"));
        assert!(is_valid_phone("+1 555-123-4567"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("555-123-4567 ext"));
    }
}
