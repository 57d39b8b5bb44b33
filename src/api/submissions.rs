use actix_web::{http::header, web, HttpResponse};

use crate::{
    middleware::auth::Claims,
    services::submission_service,
    state::AppState,
    utils::AppResult,
};

#[utoipa::path(
    get,
    path = "/api/submissions/{filename}/pdf",
    tag = "Submissions",
    params(("filename" = String, Path, description = "Submission file name")),
    responses(
        (status = 200, description = "Submission PDF", content_type = "application/pdf"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "PDF not stored locally")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_pdf(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let filename = path.into_inner();
    log::info!("📥 GET /submissions/{}/pdf by {}", filename, user.email);

    let bytes = submission_service::download_pdf(&state.store, &state.storage, &filename).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        ))
        .body(bytes))
}
