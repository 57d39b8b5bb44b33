use actix_web::{http::header, web, HttpResponse};

use crate::{
    middleware::auth::Claims,
    models::{SoapNote, SoapRequest},
    services::{pdf_service, soap_service, submission_service::sanitize_name},
    state::AppState,
    utils::AppResult,
};

#[utoipa::path(
    post,
    path = "/api/soap/generate",
    tag = "SOAP",
    request_body = SoapRequest,
    responses(
        (status = 200, description = "Drafted SOAP note", body = SoapNote),
        (status = 400, description = "Submissions do not match"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    request: web::Json<SoapRequest>,
) -> AppResult<HttpResponse> {
    log::info!("🩺 POST /soap/generate - {} by {}", request.intake_filename, user.email);

    let note = soap_service::generate(&state.store, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "note": note,
    })))
}

/// Renders a (possibly edited) note to PDF
#[utoipa::path(
    post,
    path = "/api/soap/export",
    tag = "SOAP",
    request_body = SoapNote,
    responses(
        (status = 200, description = "SOAP note PDF", content_type = "application/pdf"),
        (status = 500, description = "PDF generation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export(user: web::ReqData<Claims>, note: web::Json<SoapNote>) -> AppResult<HttpResponse> {
    let note = note.into_inner();
    log::info!("📄 POST /soap/export - {} by {}", note.client_name, user.email);

    let filename = format!(
        "soap_{}_{}.pdf",
        sanitize_name(&note.client_name),
        note.session_date.format("%Y%m%d")
    );
    let bytes = pdf_service::render(move || pdf_service::render_soap(&note)).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes))
}
