use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    jobs::master_sync,
    middleware::auth::Claims,
    models::{UserInfo, UserStatus},
    services::{analytics_service, auth_service, master_file_service::RebuildReport},
    state::AppState,
    utils::AppResult,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UsersQuery {
    /// pending, approved or rejected
    pub status: Option<UserStatus>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(UsersQuery),
    responses(
        (status = 200, description = "Dashboard accounts, newest first", body = [UserInfo]),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(state: web::Data<AppState>, query: web::Query<UsersQuery>) -> AppResult<HttpResponse> {
    let users = auth_service::list_users(&state.store, query.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": users.len(),
        "users": users,
    })))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/approve",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User approved", body = UserInfo),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_user(
    state: web::Data<AppState>,
    admin: web::ReqData<Claims>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("✅ POST /admin/users/{}/approve by {}", path, admin.email);
    let user = auth_service::approve(&state.store, &path, &admin.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user })))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/reject",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User rejected", body = UserInfo),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_user(
    state: web::Data<AppState>,
    admin: web::ReqData<Claims>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("⛔ POST /admin/users/{}/reject by {}", path, admin.email);
    let user = auth_service::reject(&state.store, &path, &admin.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user })))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Admins cannot delete themselves"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    state: web::Data<AppState>,
    admin: web::ReqData<Claims>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🗑️ DELETE /admin/users/{} by {}", path, admin.email);
    auth_service::delete_user(&state.store, &path, &admin.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User deleted"
    })))
}

/// Rebuilds the master files from the metadata records
#[utoipa::path(
    post,
    path = "/api/admin/update-data",
    tag = "Admin",
    responses(
        (status = 200, description = "Master files rebuilt", body = RebuildReport),
        (status = 500, description = "Rebuild failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_data(state: web::Data<AppState>, admin: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("🔄 POST /admin/update-data by {}", admin.email);
    let report = master_sync::sync_masters(&state.store, &state.analytics_cache).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "report": report,
    })))
}

#[utoipa::path(
    post,
    path = "/api/admin/analytics/refresh",
    tag = "Admin",
    responses(
        (status = 200, description = "Analytics recomputed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_analytics(state: web::Data<AppState>, admin: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("📊 POST /admin/analytics/refresh by {}", admin.email);
    state.analytics_cache.invalidate();
    let snapshot = analytics_service::snapshot(&state.store, &state.analytics_cache).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": snapshot.summary,
        "computed_at": snapshot.computed_at,
    })))
}
