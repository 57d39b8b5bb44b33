use crate::{config::AppConfig, database::FileStore, services::auth_service};

/// Cria o admin configurado em ADMIN_EMAIL / ADMIN_PASSWORD, se ainda não existir.
pub async fn seed_admin(store: &FileStore, config: &AppConfig) {
    if config.admin_email.is_none() || config.admin_password.is_none() {
        log::info!("👤 ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seed");
        return;
    }

    match auth_service::seed_admin(store, config).await {
        Ok(true) => log::info!("   ✅ Admin account created"),
        Ok(false) => log::info!("👤 Admin account already present, skipping seed"),
        Err(e) => log::error!("   ❌ Failed to seed admin account: {}", e),
    }
}
