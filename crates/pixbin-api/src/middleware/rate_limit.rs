//! In-memory rate limiting for upload requests.
//!
//! Fixed-window counting per client IP, sharded across several mutex-guarded
//! maps to reduce lock contention. Windows and limits come from
//! `RateLimitConfig`, so the 15-minute/30-request production defaults and the
//! tight windows used in tests go through the same code path.

use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pixbin_core::{AppError, RateLimitConfig};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_SHARD_COUNT: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

#[derive(Clone)]
struct RequestBucket {
    count: u32,
    reset_at: Instant,
}

impl RequestBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    /// Count this request against the window, resetting first if the window
    /// has elapsed. Returns whether the request is allowed and how many
    /// requests remain.
    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded fixed-window rate limiter keyed by client identity.
#[derive(Clone)]
pub struct UploadRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RequestBucket>>>>,
    limit: u32,
    window: Duration,
}

impl UploadRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_shards(config, DEFAULT_SHARD_COUNT)
    }

    /// Shard count should be a power of 2 for best key distribution.
    pub fn with_shards(config: &RateLimitConfig, shard_count: usize) -> Self {
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            limit: config.max_requests_per_window,
            window: Duration::from_secs(config.window_seconds()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_for(&self, key: &str) -> &Arc<Mutex<HashMap<String, RequestBucket>>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Check the limit for a key and count the request if allowed.
    ///
    /// Returns the remaining allowance, or the time until the window resets
    /// when the limit is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard = self.shard_for(key);
        let mut buckets = shard.lock().await;

        // Bound per-shard memory: drop expired buckets when at capacity, then
        // evict the oldest if still full.
        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            let grace = self.window;
            buckets.retain(|_, bucket| bucket.reset_at > now || (now - bucket.reset_at) < grace);

            if buckets.len() >= MAX_BUCKETS_PER_SHARD {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let window = self.window;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RequestBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Remove buckets whose window expired more than one window ago.
    /// Intended to run periodically from a background task.
    pub async fn cleanup_expired_buckets(&self) {
        let now = Instant::now();
        let grace = self.window;
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.reset_at > now || (now - bucket.reset_at) < grace);
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
    }
}

fn trusted_proxy_count() -> usize {
    std::env::var("TRUSTED_PROXY_COUNT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1) // typical single load balancer setup
}

/// Rate limiting middleware keyed by client IP.
///
/// Successful responses carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`.
/// Rejected requests get `429 Too Many Requests` with the standard error body
/// plus `Retry-After` in seconds.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<UploadRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    // Populated by `into_make_service_with_connect_info` in server setup
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        trusted_proxy_count(),
    );
    let key = format!("ip:{}", ip);
    let limit = rate_limiter.limit();

    match rate_limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;

            if let Ok(header_value) = HeaderValue::from_str(&limit.to_string()) {
                response
                    .headers_mut()
                    .insert("X-RateLimit-Limit", header_value);
            }
            if let Ok(header_value) = HeaderValue::from_str(&remaining.to_string()) {
                response
                    .headers_mut()
                    .insert("X-RateLimit-Remaining", header_value);
            }

            response
        }
        Err(reset_in) => {
            let retry_after_secs = reset_in.as_secs().max(1);

            tracing::warn!(
                key = %key,
                limit = limit,
                retry_after_secs = retry_after_secs,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );

            let mut response =
                HttpAppError(AppError::RateLimited { retry_after_secs }).into_response();

            if let Ok(header_value) = HeaderValue::from_str(&limit.to_string()) {
                response
                    .headers_mut()
                    .insert("X-RateLimit-Limit", header_value);
            }
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            if let Ok(header_value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", header_value);
            }

            response
        }
    }
}
