//! Application setup and initialization
//!
//! All application initialization logic lives here rather than in main.rs,
//! which keeps the wiring testable.

pub mod routes;
pub mod server;

use crate::middleware::UploadRateLimiter;
use crate::state::AppState;
use anyhow::Result;
use pixbin_core::Config;
use pixbin_storage::S3Storage;
use std::sync::Arc;
use std::time::Duration;

/// Initialize the entire application
pub fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_tracing();

    tracing::info!(
        environment = %config.base.environment,
        bucket = %config.storage.s3_bucket,
        "Configuration loaded"
    );

    let storage = Arc::new(S3Storage::new(&config.storage)?);
    let state = Arc::new(AppState::new(config.clone(), storage));

    let rate_limiter = Arc::new(UploadRateLimiter::new(&config.rate_limit));
    spawn_bucket_cleanup(rate_limiter.clone(), config.rate_limit.window_seconds());

    let router = routes::setup_routes(&config, state.clone(), rate_limiter)?;

    Ok((state, router))
}

/// Periodically sweep expired rate-limit buckets so idle clients do not
/// accumulate memory.
fn spawn_bucket_cleanup(rate_limiter: Arc<UploadRateLimiter>, window_seconds: u64) {
    let interval = Duration::from_secs(window_seconds.max(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            rate_limiter.cleanup_expired_buckets().await;
        }
    });
}
