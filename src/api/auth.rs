use actix_web::{web, HttpRequest, HttpResponse};

use crate::{
    middleware::auth::{bearer_token, Claims},
    services::auth_service::{self, AuthResponse, LoginRequest, RegisterRequest, RegisterResponse, VerifyTokenResponse},
    models::{UserInfo, UserStatus},
    state::AppState,
    utils::{AppError, AppResult},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account pending approval or rejected")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&state.store, &state.config, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration received", body = RegisterResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    let user = auth_service::register(&state.store, &state.config, &request).await?;
    let message = match user.status {
        UserStatus::Approved => "Account created. You can sign in now.",
        _ => "Registration received. An administrator must approve your account before you can sign in.",
    };

    Ok(HttpResponse::Created().json(RegisterResponse {
        success: true,
        message: message.to_string(),
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token", body = VerifyTokenResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    log::info!("✓ GET /auth/verify");

    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::InvalidRequest("No valid Authorization header".to_string()))?;

    match auth_service::authorize(&state.store, &state.config, token).await {
        Ok(claims) => {
            let user = auth_service::current_user(&state.store, &claims.sub).await?;
            Ok(HttpResponse::Ok().json(VerifyTokenResponse {
                valid: true,
                user: Some(user),
            }))
        }
        Err(e) => {
            log::warn!("❌ Invalid token: {}", e);
            Ok(HttpResponse::Unauthorized().json(VerifyTokenResponse { valid: false, user: None }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "User information retrieved", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(state: web::Data<AppState>, user: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("👤 GET /auth/me - {}", user.email);

    let info = auth_service::current_user(&state.store, &user.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": info
    })))
}
