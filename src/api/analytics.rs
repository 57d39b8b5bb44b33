use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    api::forms::parse_form_type,
    models::{AnalyticsSummary, ChartData, TrendBucket, TrendPeriod},
    services::analytics_service::{self, SubmissionPage},
    state::AppState,
    utils::AppResult,
};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TrendsQuery {
    /// day, week or month (default)
    pub period: Option<TrendPeriod>,
    /// Keep only the most recent buckets
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SubmissionsQuery {
    /// intake or feedback; both when omitted
    pub form_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "Analytics",
    responses(
        (status = 200, description = "Headline numbers", body = AnalyticsSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_summary(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let snapshot = analytics_service::snapshot(&state.store, &state.analytics_cache).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": snapshot.summary,
        "computed_at": snapshot.computed_at,
    })))
}

#[utoipa::path(
    get,
    path = "/api/analytics/trends",
    tag = "Analytics",
    params(TrendsQuery),
    responses(
        (status = 200, description = "Submissions per period, oldest first", body = [TrendBucket]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_trends(state: web::Data<AppState>, query: web::Query<TrendsQuery>) -> AppResult<HttpResponse> {
    let period = query.period.unwrap_or_default();
    let snapshot = analytics_service::snapshot(&state.store, &state.analytics_cache).await?;
    let buckets = analytics_service::trends(&snapshot, period, query.limit);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "period": period,
        "trends": buckets,
    })))
}

#[utoipa::path(
    get,
    path = "/api/analytics/charts",
    tag = "Analytics",
    responses(
        (status = 200, description = "Chart distributions", body = ChartData),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_charts(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let snapshot = analytics_service::snapshot(&state.store, &state.analytics_cache).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "charts": snapshot.charts,
    })))
}

#[utoipa::path(
    get,
    path = "/api/analytics/submissions",
    tag = "Analytics",
    params(SubmissionsQuery),
    responses(
        (status = 200, description = "Newest submissions first", body = SubmissionPage),
        (status = 400, description = "Unknown form type"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_submissions(
    state: web::Data<AppState>,
    query: web::Query<SubmissionsQuery>,
) -> AppResult<HttpResponse> {
    let form_type = query.form_type.as_deref().map(parse_form_type).transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let snapshot = analytics_service::snapshot(&state.store, &state.analytics_cache).await?;
    Ok(HttpResponse::Ok().json(analytics_service::submissions(&snapshot, form_type, limit, offset)))
}
