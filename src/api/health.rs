use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
    /// `google_drive` or `local`
    pub pdf_storage: String,
    pub data_dir_available: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Data directory unavailable", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let data_dir_available = tokio::fs::metadata(state.store.root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let body = HealthResponse {
        status: if data_dir_available { "healthy" } else { "degraded" }.to_string(),
        service: "clinic-intake-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        pdf_storage: if state.config.google_drive_access_token.is_some() {
            "google_drive"
        } else {
            "local"
        }
        .to_string(),
        data_dir_available,
    };

    if data_dir_available {
        HttpResponse::Ok().json(body)
    } else {
        log::error!("❌ Data directory {} unavailable", state.store.root().display());
        HttpResponse::ServiceUnavailable().json(body)
    }
}
