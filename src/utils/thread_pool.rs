//! Thread pool dedicado para geração de PDF
//!
//! Rendering is CPU-bound and synchronous, so it runs here instead of on the
//! actix workers. Size comes from `PDF_WORKERS` (default 2).

use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::runtime::Runtime;

lazy_static! {
    pub static ref PDF_POOL: Arc<Runtime> = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(crate::config::parse_var("PDF_WORKERS", 2usize).max(1))
            .max_blocking_threads(crate::config::parse_var("PDF_WORKERS", 2usize).max(1))
            .thread_name("pdf-worker")
            .enable_all()
            .build()
            .expect("Failed to create PDF thread pool")
    );
}

/// Runs a blocking closure on the PDF pool
pub async fn spawn_pdf_blocking<F, R>(f: F) -> Result<R, tokio::task::JoinError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    PDF_POOL.spawn_blocking(f).await
}
