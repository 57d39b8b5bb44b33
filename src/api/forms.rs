use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    api::metrics,
    models::{FormSubmission, FormType},
    services::{
        submission_service::{self, SubmitResponse},
        wizard_service::{self, StepValidation, WizardAdvance},
    },
    state::AppState,
    utils::{AppError, AppResult},
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StepRequest {
    /// 1-based step number
    pub step: usize,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VisibleFieldsRequest {
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

pub(crate) fn parse_form_type(raw: &str) -> AppResult<FormType> {
    raw.parse().map_err(AppError::InvalidRequest)
}

#[utoipa::path(
    get,
    path = "/api/forms/{form_type}/steps",
    tag = "Forms",
    params(("form_type" = String, Path, description = "intake or feedback")),
    responses(
        (status = 200, description = "Wizard steps with field definitions"),
        (status = 400, description = "Unknown form type")
    )
)]
pub async fn get_steps(path: web::Path<String>) -> AppResult<HttpResponse> {
    let form_type = parse_form_type(&path)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "form_type": form_type,
        "title": form_type.title(),
        "steps": wizard_service::steps(form_type),
    })))
}

#[utoipa::path(
    post,
    path = "/api/forms/{form_type}/validate-step",
    tag = "Forms",
    params(("form_type" = String, Path, description = "intake or feedback")),
    request_body = StepRequest,
    responses(
        (status = 200, description = "Validation result for the step", body = StepValidation),
        (status = 400, description = "Unknown form type or step")
    )
)]
pub async fn validate_step(path: web::Path<String>, request: web::Json<StepRequest>) -> AppResult<HttpResponse> {
    let form_type = parse_form_type(&path)?;
    let result = wizard_service::validate_step(form_type, request.step, &request.data)?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/forms/{form_type}/visible-fields",
    tag = "Forms",
    params(("form_type" = String, Path, description = "intake or feedback")),
    request_body = VisibleFieldsRequest,
    responses(
        (status = 200, description = "Fields shown for the current answers"),
        (status = 400, description = "Unknown form type")
    )
)]
pub async fn visible_fields(
    path: web::Path<String>,
    request: web::Json<VisibleFieldsRequest>,
) -> AppResult<HttpResponse> {
    let form_type = parse_form_type(&path)?;
    let fields = wizard_service::visible_fields(form_type, &request.data)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "visible_fields": fields,
    })))
}

#[utoipa::path(
    post,
    path = "/api/forms/{form_type}/advance",
    tag = "Forms",
    params(("form_type" = String, Path, description = "intake or feedback")),
    request_body = StepRequest,
    responses(
        (status = 200, description = "Next step number or ready_to_submit"),
        (status = 400, description = "Step has invalid fields")
    )
)]
pub async fn advance(path: web::Path<String>, request: web::Json<StepRequest>) -> AppResult<HttpResponse> {
    let form_type = parse_form_type(&path)?;
    let outcome = wizard_service::advance(form_type, request.step, &request.data)?;

    let next_step = match outcome {
        WizardAdvance::Next(step) => Some(step),
        WizardAdvance::ReadyToSubmit => None,
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "outcome": outcome,
        "next_step": next_step,
        "total_steps": wizard_service::steps(form_type).len(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/submit-form",
    tag = "Forms",
    request_body = FormSubmission,
    responses(
        (status = 200, description = "Submission stored", body = SubmitResponse),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "PDF generation or storage failed")
    )
)]
pub async fn submit_form(
    state: web::Data<AppState>,
    submission: web::Json<FormSubmission>,
) -> AppResult<HttpResponse> {
    log::info!("📨 POST /submit-form - {}", submission.form_type);

    match submission_service::submit(&state.store, &state.storage, &state.analytics_cache, &submission).await {
        Ok(response) => {
            metrics::record_submission(response.form_type);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            if matches!(e, AppError::Validation(_)) {
                metrics::record_rejected_submission();
            }
            Err(e)
        }
    }
}
