use chrono::{DateTime, Utc};

use crate::{
    database::FileStore,
    models::{FeedbackSnapshot, FormType, IntakeSnapshot, MetadataRecord, SoapNote, SoapRequest},
    services::{metadata_store, pdf_service::humanize},
    utils::{AppError, AppResult},
};

/// Loads the referenced submissions and drafts a SOAP note from them.
pub async fn generate(store: &FileStore, request: &SoapRequest) -> AppResult<SoapNote> {
    let intake = metadata_store::load(store, &request.intake_filename).await?;
    if intake.form_type != FormType::Intake || intake.intake.is_none() {
        return Err(AppError::InvalidRequest(format!(
            "{} is not an intake submission",
            request.intake_filename
        )));
    }

    let feedback = match &request.feedback_filename {
        Some(name) => {
            let record = metadata_store::load(store, name).await?;
            if record.form_type != FormType::Feedback || record.feedback.is_none() {
                return Err(AppError::InvalidRequest(format!("{} is not a feedback submission", name)));
            }
            if !same_client(&intake, &record) {
                return Err(AppError::InvalidRequest(
                    "Feedback belongs to a different client".to_string(),
                ));
            }
            Some(record)
        }
        None => None,
    };

    let note = compose(&intake, feedback.as_ref(), request, Utc::now())?;
    log::info!("🩺 SOAP note drafted for {}", note.client_name);
    Ok(note)
}

fn same_client(a: &MetadataRecord, b: &MetadataRecord) -> bool {
    let email = |r: &MetadataRecord| {
        r.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    };
    match (email(a), email(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.client_name.trim().eq_ignore_ascii_case(b.client_name.trim()),
    }
}

fn join_human(items: &[String]) -> String {
    items.iter().map(|i| humanize(i)).collect::<Vec<_>>().join(", ")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn compose(
    intake_record: &MetadataRecord,
    feedback_record: Option<&MetadataRecord>,
    request: &SoapRequest,
    now: DateTime<Utc>,
) -> AppResult<SoapNote> {
    let intake = intake_record
        .intake
        .as_ref()
        .ok_or_else(|| AppError::InvalidRequest("Intake details missing".to_string()))?;
    let feedback = feedback_record.and_then(|r| r.feedback.as_ref());

    let session_date = request
        .session_date
        .or_else(|| feedback.map(|f| f.session_date))
        .unwrap_or_else(|| now.date_naive());

    Ok(SoapNote {
        client_name: intake_record.client_name.clone(),
        session_date,
        intake_filename: intake_record.filename.clone(),
        feedback_filename: feedback_record.map(|r| r.filename.clone()),
        subjective: subjective(intake, feedback),
        objective: objective(request),
        assessment: assessment(feedback),
        plan: plan(intake, feedback),
        precautions: precautions(intake),
        generated_at: now,
    })
}

fn subjective(intake: &IntakeSnapshot, feedback: Option<&FeedbackSnapshot>) -> Vec<String> {
    let mut lines = vec![format!("Reason for visit: {}", intake.reason_for_visit)];

    if !intake.primary_concerns.is_empty() {
        lines.push(format!("Primary concerns: {}", join_human(&intake.primary_concerns)));
    }
    if intake.pain_areas.is_empty() {
        lines.push(format!("Reported pain level {}/10", intake.pain_level));
    } else {
        lines.push(format!(
            "Reported pain {}/10 in: {}",
            intake.pain_level,
            join_human(&intake.pain_areas)
        ));
    }
    lines.push(format!("Pressure preference: {}", humanize(&intake.pressure_preference)));
    if intake.first_visit {
        lines.push("First professional massage".to_string());
    }

    if let Some(fb) = feedback {
        if let (Some(before), Some(after)) = (fb.pain_level_before, fb.pain_level_after) {
            lines.push(format!("Post-session report: pain {}/10 before, {}/10 after", before, after));
        }
        if let Some(comments) = non_empty(&fb.comments) {
            lines.push(format!("Client comments: {}", comments));
        }
    }

    lines
}

fn objective(request: &SoapRequest) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(minutes) = request.session_minutes {
        lines.push(format!("Session length: {} minutes", minutes));
    }
    if !request.techniques.is_empty() {
        lines.push(format!("Techniques: {}", join_human(&request.techniques)));
    }
    if !request.areas_treated.is_empty() {
        lines.push(format!("Areas treated: {}", join_human(&request.areas_treated)));
    }
    if let Some(pressure) = non_empty(&request.pressure_used) {
        lines.push(format!("Pressure used: {}", humanize(pressure)));
    }
    if let Some(observations) = non_empty(&request.observations) {
        lines.push(format!("Observations: {}", observations));
    }

    if lines.is_empty() {
        lines.push("No therapist observations recorded".to_string());
    }
    lines
}

/// Pain change in points, positive = improvement
pub fn pain_change_label(change: i16) -> String {
    match change {
        c if c >= 3 => format!("Significant pain reduction ({} points)", c),
        c if c >= 1 => format!("Moderate pain reduction ({} point{})", c, if c == 1 { "" } else { "s" }),
        0 => "No change in reported pain".to_string(),
        c => format!("Pain increased by {} points; review technique and pressure", -c),
    }
}

fn assessment(feedback: Option<&FeedbackSnapshot>) -> Vec<String> {
    let Some(fb) = feedback else {
        return vec!["No post-session feedback yet; assessment based on intake only".to_string()];
    };

    let mut lines = Vec::new();
    if let Some(change) = fb.pain_change {
        lines.push(pain_change_label(change));
    }

    lines.push(format!("Client satisfaction {}/5", fb.overall_rating));
    if fb.overall_rating <= 2 {
        lines.push("Low satisfaction; follow up with the client".to_string());
    }

    match fb.pressure_rating.as_str() {
        "too_light" => lines.push("Client found the pressure too light".to_string()),
        "too_firm" => lines.push("Client found the pressure too firm".to_string()),
        _ => {}
    }

    if !fb.areas_improved.is_empty() {
        lines.push(format!("Improvement reported in: {}", join_human(&fb.areas_improved)));
    }
    if !fb.would_return {
        lines.push("Client does not plan to rebook".to_string());
    }

    lines
}

fn home_care(area: &str) -> Option<&'static str> {
    match area {
        "neck" | "shoulders" => Some("Gentle neck and shoulder stretches twice daily"),
        "upper_back" | "lower_back" => Some("Heat application and gentle back mobility exercises"),
        "hips" | "legs" => Some("Hip flexor and hamstring stretching"),
        "arms" | "hands" => Some("Wrist and forearm stretches; regular breaks from repetitive tasks"),
        "head" => Some("Hydration and screen breaks to reduce tension headaches"),
        "feet" => Some("Rolling the foot over a ball; supportive footwear"),
        _ => None,
    }
}

fn plan(intake: &IntakeSnapshot, feedback: Option<&FeedbackSnapshot>) -> Vec<String> {
    let current_pain = feedback
        .and_then(|f| f.pain_level_after)
        .unwrap_or(intake.pain_level);

    let mut lines = vec![match current_pain {
        p if p >= 7 => "Recommend weekly sessions until pain is below 7/10".to_string(),
        p if p >= 4 => "Recommend sessions every two weeks".to_string(),
        _ => "Recommend monthly maintenance sessions".to_string(),
    }];

    match feedback.map(|f| f.pressure_rating.as_str()) {
        Some("too_light") => lines.push("Increase pressure next session".to_string()),
        Some("too_firm") => lines.push("Reduce pressure next session".to_string()),
        _ => {}
    }

    for advice in intake.pain_areas.iter().filter_map(|a| home_care(a)) {
        let advice = format!("Home care: {}", advice);
        if !lines.contains(&advice) {
            lines.push(advice);
        }
    }
    lines.push("Drink water and rest after the session".to_string());

    lines
}

fn precautions(intake: &IntakeSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    if intake.is_pregnant {
        lines.push("Pregnant: side-lying positioning, no deep abdominal work".to_string());
    }
    if intake.has_medical_conditions {
        if let Some(conditions) = non_empty(&intake.medical_conditions) {
            lines.push(format!("Medical conditions: {}", conditions));
        }
    }
    if intake.taking_medications {
        if let Some(meds) = non_empty(&intake.medications) {
            lines.push(format!("Medications: {}", meds));
        }
    }
    if intake.has_allergies {
        if let Some(allergies) = non_empty(&intake.allergies) {
            lines.push(format!("Allergies: {} (check oils and lotions)", allergies));
        }
    }
    if let Some(avoid) = non_empty(&intake.areas_to_avoid) {
        lines.push(format!("Avoid: {}", avoid));
    }
    if let Some(injuries) = non_empty(&intake.recent_injuries) {
        lines.push(format!("Recent injuries: {}", injuries));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metadata_store::test_support::record;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn intake_snapshot() -> IntakeSnapshot {
        IntakeSnapshot {
            age: Some(36),
            preferred_contact: None,
            reason_for_visit: "Desk work tension".into(),
            primary_concerns: vec!["muscle_tension".into()],
            pain_areas: vec!["neck".into(), "shoulders".into(), "lower_back".into()],
            pain_level: 8,
            pressure_preference: "firm".into(),
            areas_to_avoid: Some("Left knee".into()),
            first_visit: true,
            referral_source: None,
            has_medical_conditions: false,
            medical_conditions: None,
            taking_medications: true,
            medications: Some("Ibuprofen".into()),
            has_allergies: true,
            allergies: Some("Almond oil".into()),
            is_pregnant: false,
            recent_injuries: None,
        }
    }

    fn feedback_snapshot(before: u8, after: u8) -> FeedbackSnapshot {
        FeedbackSnapshot {
            session_date: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            therapist_name: Some("Marta".into()),
            overall_rating: 5,
            pressure_rating: "too_firm".into(),
            comfort_rating: Some(4),
            pain_level_before: Some(before),
            pain_level_after: Some(after),
            pain_change: Some(before as i16 - after as i16),
            areas_improved: vec!["neck".into()],
            would_recommend: true,
            would_return: true,
            comments: None,
            testimonial_consent: false,
        }
    }

    fn intake_record() -> MetadataRecord {
        let mut rec = record("intake_ana.pdf", FormType::Intake, Utc::now());
        rec.intake = Some(intake_snapshot());
        rec
    }

    fn feedback_record(before: u8, after: u8) -> MetadataRecord {
        let mut rec = record("feedback_ana.pdf", FormType::Feedback, Utc::now());
        rec.feedback = Some(feedback_snapshot(before, after));
        rec
    }

    #[test]
    fn pain_labels() {
        assert_eq!(pain_change_label(4), "Significant pain reduction (4 points)");
        assert_eq!(pain_change_label(1), "Moderate pain reduction (1 point)");
        assert_eq!(pain_change_label(0), "No change in reported pain");
        assert!(pain_change_label(-2).starts_with("Pain increased by 2 points"));
    }

    #[test]
    fn intake_only_note() {
        let note = compose(&intake_record(), None, &SoapRequest::default(), Utc::now()).unwrap();

        assert_eq!(note.plan[0], "Recommend weekly sessions until pain is below 7/10");
        assert!(note.assessment[0].starts_with("No post-session feedback"));
        assert_eq!(note.objective, vec!["No therapist observations recorded".to_string()]);
        assert!(note.precautions.contains(&"Allergies: Almond oil (check oils and lotions)".to_string()));
        assert!(note.precautions.contains(&"Avoid: Left knee".to_string()));
        // neck and shoulders share one piece of advice
        let home_care = note.plan.iter().filter(|l| l.starts_with("Home care")).count();
        assert_eq!(home_care, 2);
    }

    #[test]
    fn feedback_drives_plan_and_assessment() {
        let fb = feedback_record(8, 3);
        let request = SoapRequest {
            session_minutes: Some(60),
            techniques: vec!["swedish".into(), "trigger_point".into()],
            ..SoapRequest::default()
        };
        let note = compose(&intake_record(), Some(&fb), &request, Utc::now()).unwrap();

        assert_eq!(note.session_date, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(note.assessment[0], "Significant pain reduction (5 points)");
        assert_eq!(note.plan[0], "Recommend monthly maintenance sessions");
        assert!(note.plan.contains(&"Reduce pressure next session".to_string()));
        assert_eq!(note.objective[1], "Techniques: Swedish, Trigger point");
    }

    #[tokio::test]
    async fn generate_checks_form_types_and_client() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        metadata_store::save(&store, &intake_record()).await.unwrap();
        metadata_store::save(&store, &feedback_record(5, 4)).await.unwrap();

        let mut other = feedback_record(5, 4);
        other.filename = "feedback_other.pdf".into();
        other.email = Some("someone.else@example.com".into());
        metadata_store::save(&store, &other).await.unwrap();

        let ok = SoapRequest {
            intake_filename: "intake_ana.pdf".into(),
            feedback_filename: Some("feedback_ana.pdf".into()),
            ..SoapRequest::default()
        };
        assert!(generate(&store, &ok).await.is_ok());

        let swapped = SoapRequest {
            intake_filename: "feedback_ana.pdf".into(),
            ..SoapRequest::default()
        };
        assert!(matches!(generate(&store, &swapped).await, Err(AppError::InvalidRequest(_))));

        let mismatched = SoapRequest {
            feedback_filename: Some("feedback_other.pdf".into()),
            ..ok
        };
        assert!(matches!(generate(&store, &mismatched).await, Err(AppError::InvalidRequest(_))));
    }
}
