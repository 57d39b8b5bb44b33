use actix_web::{web, HttpResponse};

use crate::{
    models::{Draft, SaveDraftRequest},
    services::draft_service,
    state::AppState,
    utils::AppResult,
};

#[utoipa::path(
    put,
    path = "/api/drafts/{draft_id}",
    tag = "Drafts",
    params(("draft_id" = String, Path, description = "Client-generated draft id")),
    request_body = SaveDraftRequest,
    responses(
        (status = 200, description = "Draft saved", body = Draft),
        (status = 400, description = "Invalid id, step or payload")
    )
)]
pub async fn save_draft(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<SaveDraftRequest>,
) -> AppResult<HttpResponse> {
    let draft = draft_service::save_draft(&state.store, &path, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(draft))
}

#[utoipa::path(
    get,
    path = "/api/drafts/{draft_id}",
    tag = "Drafts",
    params(("draft_id" = String, Path, description = "Client-generated draft id")),
    responses(
        (status = 200, description = "Saved draft", body = Draft),
        (status = 404, description = "No draft with this id")
    )
)]
pub async fn get_draft(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let draft = draft_service::load_draft(&state.store, &path).await?;
    Ok(HttpResponse::Ok().json(draft))
}

#[utoipa::path(
    delete,
    path = "/api/drafts/{draft_id}",
    tag = "Drafts",
    params(("draft_id" = String, Path, description = "Client-generated draft id")),
    responses(
        (status = 200, description = "Draft removed"),
        (status = 404, description = "No draft with this id")
    )
)]
pub async fn delete_draft(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    draft_service::delete_draft(&state.store, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Draft deleted"
    })))
}
