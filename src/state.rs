use std::sync::Arc;

use crate::{
    config::AppConfig,
    database::FileStore,
    services::{analytics_service::AnalyticsCache, storage_service::DocumentStorage},
};

/// Shared by every worker through `web::Data<AppState>`
pub struct AppState {
    pub config: AppConfig,
    pub store: FileStore,
    pub storage: DocumentStorage,
    pub analytics_cache: Arc<AnalyticsCache>,
}

impl AppState {
    pub fn new(config: AppConfig, store: FileStore) -> Self {
        let storage = DocumentStorage::from_config(&config, store.clone());
        let analytics_cache = Arc::new(AnalyticsCache::new(config.analytics_cache_ttl_secs));
        Self {
            config,
            store,
            storage,
            analytics_cache,
        }
    }
}
