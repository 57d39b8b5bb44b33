use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuração carregada do ambiente (.env via dotenv)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    /// 0 = cache until explicitly invalidated
    pub analytics_cache_ttl_secs: u64,
    /// 0 = background sync disabled
    pub master_sync_interval_secs: u64,
    pub google_drive_access_token: Option<String>,
    pub google_drive_folder_id: Option<String>,
    pub allowed_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            jwt_secret: "default-secret-change-me".to_string(),
            jwt_issuer: "clinic-intake-service".to_string(),
            jwt_audience: "clinic-dashboard".to_string(),
            jwt_ttl_hours: 12,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            analytics_cache_ttl_secs: 300,
            master_sync_interval_secs: 0,
            google_drive_access_token: None,
            google_drive_folder_id: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            admin_email: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        if env::var("JWT_SECRET").is_err() {
            log::warn!("⚠️  JWT_SECRET not set, using default secret (do not use in production)");
        }

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            jwt_ttl_hours: parse_var("JWT_TTL_HOURS", defaults.jwt_ttl_hours),
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost),
            analytics_cache_ttl_secs: parse_var("ANALYTICS_CACHE_TTL_SECS", defaults.analytics_cache_ttl_secs),
            master_sync_interval_secs: parse_var("MASTER_SYNC_INTERVAL_SECS", defaults.master_sync_interval_secs),
            google_drive_access_token: non_empty_var("GOOGLE_DRIVE_ACCESS_TOKEN"),
            google_drive_folder_id: non_empty_var("GOOGLE_DRIVE_FOLDER_ID"),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_origins),
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
        }
    }

    /// Config for tests: everything under `data_dir`, cheap bcrypt
    #[cfg(test)]
    pub fn for_tests(data_dir: &std::path::Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            jwt_secret: "test-secret".to_string(),
            bcrypt_cost: 4,
            ..Self::default()
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_var<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("⚠️  Invalid value for {}: '{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
