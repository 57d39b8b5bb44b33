use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::FormType;

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static INTAKE_SUBMISSIONS: AtomicU64 = AtomicU64::new(0);
static FEEDBACK_SUBMISSIONS: AtomicU64 = AtomicU64::new(0);
static REJECTED_SUBMISSIONS: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_submission(form_type: FormType) {
    let counter = match form_type {
        FormType::Intake => &INTAKE_SUBMISSIONS,
        FormType::Feedback => &FEEDBACK_SUBMISSIONS,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rejected_submission() {
    REJECTED_SUBMISSIONS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub form_submissions_intake_total: u64,
    pub form_submissions_feedback_total: u64,
    pub form_submissions_rejected_total: u64,
}

impl MetricsResponse {
    fn snapshot() -> Self {
        Self {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            form_submissions_intake_total: INTAKE_SUBMISSIONS.load(Ordering::Relaxed),
            form_submissions_feedback_total: FEEDBACK_SUBMISSIONS.load(Ordering::Relaxed),
            form_submissions_rejected_total: REJECTED_SUBMISSIONS.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition format
    fn render(&self) -> String {
        format!(
            "# HELP http_requests_total Total number of HTTP requests\n\
             # TYPE http_requests_total counter\n\
             http_requests_total {}\n\
             \n\
             # HELP http_errors_total Total number of HTTP errors\n\
             # TYPE http_errors_total counter\n\
             http_errors_total {}\n\
             \n\
             # HELP form_submissions_total Accepted form submissions\n\
             # TYPE form_submissions_total counter\n\
             form_submissions_total{{form_type=\"intake\"}} {}\n\
             form_submissions_total{{form_type=\"feedback\"}} {}\n\
             \n\
             # HELP form_submissions_rejected_total Submissions that failed validation\n\
             # TYPE form_submissions_rejected_total counter\n\
             form_submissions_rejected_total {}\n",
            self.http_requests_total,
            self.http_errors_total,
            self.form_submissions_intake_total,
            self.form_submissions_feedback_total,
            self.form_submissions_rejected_total,
        )
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "System metrics", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().render())
}
