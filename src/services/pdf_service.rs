use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::{
    models::{FeedbackForm, FormType, IntakeForm, SoapNote},
    utils::{thread_pool::spawn_pdf_blocking, AppError, AppResult},
};

// A4 em milímetros
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const PT_TO_MM: f32 = 0.3528;

const BODY_SIZE: f32 = 10.5;
const HEADING_SIZE: f32 = 13.0;
const TITLE_SIZE: f32 = 18.0;

fn pdf_err(e: impl std::fmt::Display) -> AppError {
    AppError::Pdf(e.to_string())
}

/// Line-oriented writer over a printpdf document with automatic page breaks.
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> AppResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.45
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Page {}", self.pages),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn write(&mut self, text: &str, size: f32, bold: bool) {
        let height = Self::line_height(size);
        for line in wrap_text(text, max_chars(size)) {
            self.ensure_space(height);
            self.y -= height;
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), font);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn title(&mut self, text: &str) {
        self.write(text, TITLE_SIZE, true);
        self.gap(2.0);
    }

    fn heading(&mut self, text: &str) {
        self.gap(4.0);
        // título não fica sozinho no fim da página
        self.ensure_space(Self::line_height(HEADING_SIZE) + 2.0 * Self::line_height(BODY_SIZE));
        self.write(text, HEADING_SIZE, true);
        self.gap(1.0);
    }

    fn text(&mut self, text: &str) {
        self.write(text, BODY_SIZE, false);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.write(&format!("{}: {}", label, value), BODY_SIZE, false);
    }

    fn bullets(&mut self, items: &[String]) {
        if items.is_empty() {
            self.text("None recorded");
        }
        for item in items {
            self.text(&format!("- {}", item));
        }
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

fn max_chars(size: f32) -> usize {
    // Helvetica média ~0.5em por caractere
    ((CONTENT_WIDTH / (size * PT_TO_MM * 0.5)) as usize).max(10)
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// `upper_back` -> `Upper back`
pub fn humanize(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn or_none(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Not provided".to_string())
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "None selected".to_string()
    } else {
        items.iter().map(|i| humanize(i)).collect::<Vec<_>>().join(", ")
    }
}

fn header(writer: &mut PdfWriter, form_type: FormType, filename: &str, submitted_at: DateTime<Utc>) {
    writer.title(form_type.title());
    writer.field("Submitted", &submitted_at.format("%Y-%m-%d %H:%M UTC").to_string());
    writer.field("Reference", filename);
}

pub fn render_intake(form: &IntakeForm, filename: &str, submitted_at: DateTime<Utc>) -> AppResult<Vec<u8>> {
    let mut w = PdfWriter::new(&format!("Intake - {}", form.full_name))?;
    header(&mut w, FormType::Intake, filename, submitted_at);

    w.heading("Personal Information");
    w.field("Name", &form.full_name);
    w.field("Email", &form.email);
    w.field("Phone", &form.phone);
    w.field("Date of birth", &form.date_of_birth.format("%Y-%m-%d").to_string());
    if let Some(age) = form.age_on(submitted_at.date_naive()) {
        w.field("Age", &age.to_string());
    }
    w.field("Preferred contact", &or_none(form.preferred_contact.as_deref()).replace('_', " "));

    w.heading("Emergency Contact");
    w.field("Name", &form.emergency_contact_name);
    w.field("Phone", &form.emergency_contact_phone);
    w.field("Relationship", &or_none(form.emergency_contact_relationship.as_deref()));

    w.heading("Health History");
    w.field("Medical conditions", yes_no(form.has_medical_conditions));
    if form.has_medical_conditions {
        w.field("Details", &or_none(form.medical_conditions.as_deref()));
    }
    w.field("Taking medications", yes_no(form.taking_medications));
    if form.taking_medications {
        w.field("Medications", &or_none(form.medications.as_deref()));
    }
    w.field("Allergies", yes_no(form.has_allergies));
    if form.has_allergies {
        w.field("Allergy details", &or_none(form.allergies.as_deref()));
    }
    if form.is_pregnant {
        let weeks = form
            .pregnancy_weeks
            .map(|wk| format!("Yes ({} weeks)", wk))
            .unwrap_or_else(|| "Yes".to_string());
        w.field("Pregnant", &weeks);
    }
    w.field("Recent injuries", &or_none(form.recent_injuries.as_deref()));

    w.heading("Session Preferences");
    w.field("Reason for visit", &form.reason_for_visit);
    w.field("Primary concerns", &list(&form.primary_concerns));
    w.field("Areas of pain", &list(&form.pain_areas));
    w.field("Pain level", &format!("{}/10", form.pain_level));
    w.field("Pressure preference", &humanize(&form.pressure_preference));
    w.field("Areas to avoid", &or_none(form.areas_to_avoid.as_deref()));
    w.field("Previous massage", yes_no(form.previous_massage));
    if let Some(date) = form.last_massage_date {
        w.field("Last massage", &date.format("%Y-%m-%d").to_string());
    }
    if let Some(source) = &form.referral_source {
        let mut referral = humanize(source);
        if let Some(details) = form.referral_details.as_deref() {
            referral.push_str(&format!(" ({})", details));
        }
        w.field("Referral", &referral);
    }

    w.heading("Consent");
    w.text(
        "I confirm the information above is accurate and consent to massage therapy treatment. \
         I will inform my therapist of any changes to my health.",
    );
    w.field("Consent given", yes_no(form.consent_given));
    w.field("Signature", &form.signature);

    w.finish()
}

pub fn render_feedback(form: &FeedbackForm, filename: &str, submitted_at: DateTime<Utc>) -> AppResult<Vec<u8>> {
    let mut w = PdfWriter::new(&format!("Feedback - {}", form.client_name))?;
    header(&mut w, FormType::Feedback, filename, submitted_at);

    w.heading("Session Details");
    w.field("Client", &form.client_name);
    w.field("Email", &or_none(form.email.as_deref()));
    w.field("Session date", &form.session_date.format("%Y-%m-%d").to_string());
    w.field("Therapist", &or_none(form.therapist_name.as_deref()));

    w.heading("Experience");
    w.field("Overall rating", &format!("{}/5", form.overall_rating));
    w.field("Pressure", &humanize(&form.pressure_rating));
    if let Some(comfort) = form.comfort_rating {
        w.field("Comfort", &format!("{}/5", comfort));
    }
    if let (Some(before), Some(after)) = (form.pain_level_before, form.pain_level_after) {
        w.field("Pain before / after", &format!("{}/10 -> {}/10", before, after));
    }
    w.field("Areas improved", &list(&form.areas_improved));

    w.heading("Follow-up");
    w.field("Would recommend", yes_no(form.would_recommend));
    w.field("Would book again", yes_no(form.would_return));
    w.field("Comments", &or_none(form.comments.as_deref()));
    if form.testimonial_consent {
        w.field("Testimonial", &or_none(form.testimonial.as_deref()));
    }

    w.finish()
}

pub fn render_soap(note: &SoapNote) -> AppResult<Vec<u8>> {
    let mut w = PdfWriter::new(&format!("SOAP Note - {}", note.client_name))?;
    w.title("SOAP Note");
    w.field("Client", &note.client_name);
    w.field("Session date", &note.session_date.format("%Y-%m-%d").to_string());
    w.field("Intake reference", &note.intake_filename);
    if let Some(feedback) = &note.feedback_filename {
        w.field("Feedback reference", feedback);
    }

    if !note.precautions.is_empty() {
        w.heading("Precautions");
        w.bullets(&note.precautions);
    }
    w.heading("Subjective");
    w.bullets(&note.subjective);
    w.heading("Objective");
    w.bullets(&note.objective);
    w.heading("Assessment");
    w.bullets(&note.assessment);
    w.heading("Plan");
    w.bullets(&note.plan);

    w.gap(6.0);
    w.text(&format!(
        "Generated {} as a drafting aid. Review before adding to the client record.",
        note.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    w.finish()
}

/// Runs a renderer on the PDF pool
pub async fn render<F, R>(job: F) -> AppResult<R>
where
    F: FnOnce() -> AppResult<R> + Send + 'static,
    R: Send + 'static,
{
    spawn_pdf_blocking(job)
        .await
        .map_err(|e| AppError::Pdf(format!("PDF worker failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn feedback() -> FeedbackForm {
        serde_json::from_value(serde_json::json!({
            "client_name": "Ana Souza",
            "session_date": "2026-10-10",
            "overall_rating": 5,
            "pressure_rating": "just_right",
            "pain_level_before": 6,
            "pain_level_after": 2,
            "would_recommend": true,
            "would_return": true,
            "comments": "Great session"
        }))
        .unwrap()
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
    }

    #[test]
    fn wrap_splits_long_words_and_keeps_paragraphs() {
        let lines = wrap_text("abcdefghijkl\nxy", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl", "xy"]);
        assert_eq!(wrap_text("", 5), vec![String::new()]);
    }

    #[test]
    fn humanize_labels() {
        assert_eq!(humanize("upper_back"), "Upper back");
        assert_eq!(humanize("just_right"), "Just right");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn feedback_pdf_is_a_pdf() {
        let bytes = render_feedback(&feedback(), "feedback_ana.pdf", Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_content_breaks_pages() {
        let mut w = PdfWriter::new("test").unwrap();
        for i in 0..120 {
            w.text(&format!("Line {}", i));
        }
        assert!(w.pages > 1);
        assert!(w.finish().unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn soap_pdf_renders_on_pool() {
        let note = SoapNote {
            client_name: "Ana Souza".into(),
            session_date: NaiveDate::from_ymd_opt(2026, 10, 10).unwrap(),
            intake_filename: "intake_ana.pdf".into(),
            feedback_filename: None,
            subjective: vec!["Neck tension".into()],
            objective: vec![],
            assessment: vec!["Improving".into()],
            plan: vec!["Return in two weeks".into()],
            precautions: vec!["Allergic to nut oils".into()],
            generated_at: Utc::now(),
        };
        let bytes = render(move || render_soap(&note)).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
