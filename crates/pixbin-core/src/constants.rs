//! Service-wide constants and defaults.

/// API base path prefix for all versioned routes.
pub const API_PREFIX: &str = "/api/v0";

/// Default maximum accepted upload size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Key prefix under which all stored objects live.
pub const UPLOAD_KEY_PREFIX: &str = "uploads";

/// Cache directive for stored objects. Objects are immutable once written,
/// so clients and CDNs may cache them indefinitely.
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Default rate-limit window length in minutes.
pub const DEFAULT_RATE_LIMIT_WINDOW_MINUTES: u32 = 15;

/// Default maximum requests per address per window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 30;

/// Quality target for lossy re-encoding (JPEG and WebP).
pub const LOSSY_QUALITY: u8 = 85;
