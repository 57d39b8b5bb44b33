// ==================== MASTER FILE SYNC ====================
// Job periódico que reconstrói os master files a partir dos metadados,
// invalida o cache de analytics e limpa drafts abandonados

use crate::{
    database::FileStore,
    services::{
        analytics_service::AnalyticsCache,
        draft_service,
        master_file_service::{self, RebuildReport},
    },
    utils::AppResult,
};
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Drafts untouched for longer than this are removed
pub const DRAFT_MAX_AGE_DAYS: i64 = 30;

/// Rebuilds both master files and drops the cached analytics
pub async fn sync_masters(store: &FileStore, cache: &AnalyticsCache) -> AppResult<RebuildReport> {
    let report = master_file_service::rebuild(store).await?;
    cache.invalidate();
    Ok(report)
}

/// One maintenance pass: master sync plus stale draft purge
pub async fn run_once(store: &FileStore, cache: &AnalyticsCache) -> AppResult<(RebuildReport, usize)> {
    let report = sync_masters(store, cache).await?;
    let purged = draft_service::purge_stale(store, chrono::Duration::days(DRAFT_MAX_AGE_DAYS)).await?;
    if purged > 0 {
        log::info!("🧹 Removed {} stale draft(s)", purged);
    }
    Ok((report, purged))
}

/// Inicia o job de sincronização (desligado quando `interval_secs == 0`)
pub fn start_master_sync(store: FileStore, cache: Arc<AnalyticsCache>, interval_secs: u64) {
    if interval_secs == 0 {
        log::info!("⏸️  Master sync job disabled (MASTER_SYNC_INTERVAL_SECS=0)");
        return;
    }

    log::info!("📅 Starting master sync job (every {}s)", interval_secs);

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        loop {
            // primeiro tick é imediato
            ticker.tick().await;

            match run_once(&store, &cache).await {
                Ok((report, purged)) => log::debug!(
                    "✅ Master sync: {} intakes, {} feedback, {} drafts purged",
                    report.intake_count,
                    report.feedback_count,
                    purged
                ),
                Err(e) => log::error!("❌ Master sync failed: {}", e),
            }
        }
    });
}
