//! Configuration module
//!
//! Explicit, typed configuration structs with documented defaults, loaded from
//! the environment (a `.env` file is honored in development via `dotenvy`).

use std::env;

use crate::constants::{
    DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_RATE_LIMIT_MAX_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_MINUTES,
};

/// Base configuration shared by every binary.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
}

/// Upload admission limits.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Inclusive maximum accepted file size in bytes.
    pub max_file_size_bytes: usize,
}

/// Rate-limit window configuration. These are inputs, not hardcoded contracts:
/// `{ window_minutes, max_requests_per_window }` per client address.
#[derive(Clone, Debug, Copy)]
pub struct RateLimitConfig {
    pub window_minutes: u32,
    pub max_requests_per_window: u32,
}

impl RateLimitConfig {
    pub fn window_seconds(&self) -> u64 {
        u64::from(self.window_minutes) * 60
    }
}

/// Object-store configuration.
///
/// `public_base_url` is the externally reachable prefix under which written
/// keys become readable; returned URLs are `{public_base_url}/{key}`.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, Spaces).
    pub s3_endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub upload: UploadConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment. Every value has a development
    /// default except the S3 bucket, which has no sensible fallback.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; ignore absence in production
        dotenvy::dotenv().ok();

        let s3_bucket = env::var("S3_BUCKET")
            .map_err(|_| anyhow::anyhow!("S3_BUCKET environment variable is required"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            base: BaseConfig {
                server_port: env_or("SERVER_PORT", 3000),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                cors_origins,
            },
            upload: UploadConfig {
                max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES),
            },
            rate_limit: RateLimitConfig {
                window_minutes: env_or(
                    "RATE_LIMIT_WINDOW_MINUTES",
                    DEFAULT_RATE_LIMIT_WINDOW_MINUTES,
                ),
                max_requests_per_window: env_or(
                    "RATE_LIMIT_MAX_REQUESTS",
                    DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                ),
            },
            storage: StorageConfig {
                s3_bucket,
                s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
                public_base_url: env::var("PUBLIC_BASE_URL").ok(),
            },
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
