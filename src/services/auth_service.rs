use crate::{
    config::AppConfig,
    database::FileStore,
    models::{Role, User, UserInfo, UserStatus},
    services::wizard_service::is_valid_email,
    utils::{AppError, AppResult},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user_id
    pub email: String,
    pub role: Role,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    /// Requested role, defaults to manager
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub user: Option<UserInfo>,
}

async fn load_users(store: &FileStore) -> AppResult<Vec<User>> {
    Ok(store.read_json(&store.users_path()).await?.unwrap_or_default())
}

async fn save_users(store: &FileStore, users: &[User]) -> AppResult<()> {
    store.write_json(&store.users_path(), users).await
}

fn find_by_email<'a>(users: &'a [User], email: &str) -> Option<&'a User> {
    users.iter().find(|u| u.email.eq_ignore_ascii_case(email))
}

// Generate JWT token
pub fn generate_jwt(config: &AppConfig, user: &User) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.user_id.clone(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.jwt_ttl_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token (signature, expiry, issuer, audience)
pub fn verify_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.as_str()]);
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Token rejected: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })
}

/// Verifies the token and checks the account is still approved.
/// The role is taken from the store so demotions apply immediately.
pub async fn authorize(store: &FileStore, config: &AppConfig, token: &str) -> AppResult<Claims> {
    let mut claims = verify_token(config, token)?;

    let users = load_users(store).await?;
    let user = users
        .iter()
        .find(|u| u.user_id == claims.sub)
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    if user.status != UserStatus::Approved {
        return Err(AppError::Unauthorized("Account is not approved".to_string()));
    }

    claims.role = user.role;
    Ok(claims)
}

// User registration
pub async fn register(store: &FileStore, config: &AppConfig, request: &RegisterRequest) -> AppResult<UserInfo> {
    let email = request.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::InvalidRequest("A valid email is required".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash(&request.password, config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    let _guard = store.users_lock().lock().await;
    let mut users = load_users(store).await?;

    if find_by_email(&users, email).is_some() {
        return Err(AppError::Conflict("An account with this email already exists".to_string()));
    }

    let now = Utc::now();
    // Primeiro usuário vira admin aprovado
    let first_user = users.is_empty();
    let user = User {
        user_id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(String::from),
        password_hash,
        role: if first_user { Role::Admin } else { request.role.unwrap_or(Role::Manager) },
        status: if first_user { UserStatus::Approved } else { UserStatus::Pending },
        created_at: now,
        updated_at: now,
        approved_at: first_user.then_some(now),
        approved_by: first_user.then(|| "system".to_string()),
        last_login: None,
    };

    users.push(user.clone());
    save_users(store, &users).await?;

    log::info!("✅ User registered: {} (role: {}, status: {})", user.email, user.role, user.status);
    Ok(UserInfo::from(&user))
}

// User login
pub async fn login(store: &FileStore, config: &AppConfig, request: &LoginRequest) -> AppResult<AuthResponse> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    // bcrypt roda sem segurar o lock de usuários
    let users = load_users(store).await?;
    let user = find_by_email(&users, request.email.trim()).ok_or_else(invalid)?;

    let valid = verify(&request.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;
    if !valid {
        return Err(invalid());
    }

    match user.status {
        UserStatus::Approved => {}
        UserStatus::Pending => {
            return Err(AppError::Forbidden("Account pending approval by an administrator".to_string()))
        }
        UserStatus::Rejected => {
            return Err(AppError::Forbidden("Account registration was rejected".to_string()))
        }
    }
    let user_id = user.user_id.clone();

    let user = {
        let _guard = store.users_lock().lock().await;
        let mut users = load_users(store).await?;
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(invalid)?;
        // status may have changed while the password was checked
        if user.status != UserStatus::Approved {
            return Err(AppError::Forbidden("Account is not approved".to_string()));
        }

        let now = Utc::now();
        user.last_login = Some(now);
        user.updated_at = now;
        let user = user.clone();
        save_users(store, &users).await?;
        user
    };

    Ok(AuthResponse {
        success: true,
        token: generate_jwt(config, &user)?,
        expires_in: config.jwt_ttl_hours * 3600,
        user: UserInfo::from(&user),
    })
}

// Get current user
pub async fn current_user(store: &FileStore, user_id: &str) -> AppResult<UserInfo> {
    load_users(store)
        .await?
        .iter()
        .find(|u| u.user_id == user_id)
        .map(UserInfo::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_users(store: &FileStore, status: Option<UserStatus>) -> AppResult<Vec<UserInfo>> {
    let mut users: Vec<UserInfo> = load_users(store)
        .await?
        .iter()
        .filter(|u| status.map_or(true, |s| u.status == s))
        .map(UserInfo::from)
        .collect();
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(users)
}

async fn set_status(store: &FileStore, user_id: &str, status: UserStatus, admin_id: &str) -> AppResult<UserInfo> {
    let _guard = store.users_lock().lock().await;
    let mut users = load_users(store).await?;

    let user = users
        .iter_mut()
        .find(|u| u.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let now = Utc::now();
    user.status = status;
    user.updated_at = now;
    match status {
        UserStatus::Approved => {
            user.approved_at = Some(now);
            user.approved_by = Some(admin_id.to_string());
        }
        _ => {
            user.approved_at = None;
            user.approved_by = None;
        }
    }
    let info = UserInfo::from(&*user);

    save_users(store, &users).await?;
    log::info!("👤 User {} set to {} by {}", info.email, status, admin_id);
    Ok(info)
}

pub async fn approve(store: &FileStore, user_id: &str, admin_id: &str) -> AppResult<UserInfo> {
    set_status(store, user_id, UserStatus::Approved, admin_id).await
}

pub async fn reject(store: &FileStore, user_id: &str, admin_id: &str) -> AppResult<UserInfo> {
    if user_id == admin_id {
        return Err(AppError::InvalidRequest("You cannot reject your own account".to_string()));
    }
    set_status(store, user_id, UserStatus::Rejected, admin_id).await
}

/// 🗑️ Remove a user account
pub async fn delete_user(store: &FileStore, user_id: &str, admin_id: &str) -> AppResult<()> {
    if user_id == admin_id {
        return Err(AppError::InvalidRequest("You cannot delete your own account".to_string()));
    }

    let _guard = store.users_lock().lock().await;
    let mut users = load_users(store).await?;

    let before = users.len();
    users.retain(|u| u.user_id != user_id);
    if users.len() == before {
        log::warn!("⚠️ User {} not found", user_id);
        return Err(AppError::NotFound("User not found".to_string()));
    }

    save_users(store, &users).await?;
    log::info!("🗑️ User {} deleted by {}", user_id, admin_id);
    Ok(())
}

/// Creates the configured admin account if no user has that email yet.
/// Returns true when a new account was written.
pub async fn seed_admin(store: &FileStore, config: &AppConfig) -> AppResult<bool> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(false);
    };
    let email = email.trim();

    let _guard = store.users_lock().lock().await;
    let mut users = load_users(store).await?;
    if find_by_email(&users, email).is_some() {
        return Ok(false);
    }

    let password_hash = hash(password, config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    let now = Utc::now();
    users.push(User {
        user_id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: Some("Administrator".to_string()),
        password_hash,
        role: Role::Admin,
        status: UserStatus::Approved,
        created_at: now,
        updated_at: now,
        approved_at: Some(now),
        approved_by: Some("system".to_string()),
        last_login: None,
    });
    save_users(store, &users).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, FileStore, AppConfig) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let config = AppConfig::for_tests(dir.path());
        (dir, store, config)
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            name: Some("Test".to_string()),
            role: None,
        }
    }

    fn login_req(email: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: "correct-horse".to_string(),
        }
    }

    #[tokio::test]
    async fn first_user_is_approved_admin() {
        let (_dir, store, config) = setup().await;

        let admin = register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.status, UserStatus::Approved);

        let manager = register(&store, &config, &register_req("staff@clinic.com")).await.unwrap();
        assert_eq!(manager.role, Role::Manager);
        assert_eq!(manager.status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (_dir, store, config) = setup().await;
        register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();

        let dup = register(&store, &config, &register_req("OWNER@clinic.com")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let mut short = register_req("new@clinic.com");
        short.password = "short".to_string();
        assert!(matches!(register(&store, &config, &short).await, Err(AppError::InvalidRequest(_))));

        let bad_email = register(&store, &config, &register_req("not-an-email")).await;
        assert!(matches!(bad_email, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn login_requires_approval() {
        let (_dir, store, config) = setup().await;
        let admin = register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();
        let staff = register(&store, &config, &register_req("staff@clinic.com")).await.unwrap();

        let pending = login(&store, &config, &login_req("staff@clinic.com")).await;
        assert!(matches!(pending, Err(AppError::Forbidden(_))));

        approve(&store, &staff.id, &admin.id).await.unwrap();
        let response = login(&store, &config, &login_req("staff@clinic.com")).await.unwrap();
        assert!(response.success);
        assert!(response.user.last_login.is_some());

        let claims = verify_token(&config, &response.token).unwrap();
        assert_eq!(claims.sub, staff.id);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.iss, config.jwt_issuer);

        let mut wrong = login_req("staff@clinic.com");
        wrong.password = "wrong-password".to_string();
        assert!(matches!(login(&store, &config, &wrong).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn rejected_user_token_is_refused() {
        let (_dir, store, config) = setup().await;
        let admin = register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();
        let staff = register(&store, &config, &register_req("staff@clinic.com")).await.unwrap();
        approve(&store, &staff.id, &admin.id).await.unwrap();

        let token = login(&store, &config, &login_req("staff@clinic.com")).await.unwrap().token;
        assert!(authorize(&store, &config, &token).await.is_ok());

        reject(&store, &staff.id, &admin.id).await.unwrap();
        assert!(matches!(authorize(&store, &config, &token).await, Err(AppError::Unauthorized(_))));
        let forbidden = login(&store, &config, &login_req("staff@clinic.com")).await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn token_from_other_issuer_is_invalid() {
        let (_dir, store, config) = setup().await;
        register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();
        let token = login(&store, &config, &login_req("owner@clinic.com")).await.unwrap().token;

        let other = AppConfig {
            jwt_issuer: "someone-else".to_string(),
            ..config.clone()
        };
        assert!(verify_token(&other, &token).is_err());
        assert!(verify_token(&config, "garbage").is_err());
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let (_dir, store, config) = setup().await;
        let admin = register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();
        let staff = register(&store, &config, &register_req("staff@clinic.com")).await.unwrap();

        assert!(matches!(
            delete_user(&store, &admin.id, &admin.id).await,
            Err(AppError::InvalidRequest(_))
        ));
        delete_user(&store, &staff.id, &admin.id).await.unwrap();
        assert!(matches!(
            delete_user(&store, &staff.id, &admin.id).await,
            Err(AppError::NotFound(_))
        ));

        let remaining = list_users(&store, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(list_users(&store, Some(UserStatus::Pending)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn seed_admin_runs_once() {
        let (_dir, store, mut config) = setup().await;
        assert!(!seed_admin(&store, &config).await.unwrap());

        config.admin_email = Some("admin@clinic.com".to_string());
        config.admin_password = Some("super-secret".to_string());
        assert!(seed_admin(&store, &config).await.unwrap());
        assert!(!seed_admin(&store, &config).await.unwrap());

        let users = list_users(&store, Some(UserStatus::Approved)).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn seed_admin_trims_configured_email() {
        let (_dir, store, mut config) = setup().await;
        config.admin_email = Some("  admin@clinic.com ".to_string());
        config.admin_password = Some("super-secret".to_string());

        assert!(seed_admin(&store, &config).await.unwrap());
        assert!(!seed_admin(&store, &config).await.unwrap());

        let users = list_users(&store, None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "admin@clinic.com");
    }

    #[tokio::test]
    async fn password_check_does_not_wait_for_users_lock() {
        let (_dir, store, config) = setup().await;
        register(&store, &config, &register_req("owner@clinic.com")).await.unwrap();

        let _guard = store.users_lock().lock().await;
        let mut wrong = login_req("owner@clinic.com");
        wrong.password = "wrong-password".to_string();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), login(&store, &config, &wrong))
            .await
            .expect("login blocked on the users lock");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
