//! Error types module
//!
//! This module provides the core error types used throughout the Pixbin
//! application. All errors are unified under the `AppError` enum which can
//! represent validation, rate-limit, storage, and internal errors.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like rate limiting
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "content_mismatch")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Content mismatch: file content does not match declared type {declared}")]
    ContentMismatch { declared: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, sensitive, log_level). Reduces duplication in the
/// ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        // Validation failures are a 400 in the public API contract; they are
        // expected traffic and logged at debug level.
        AppError::FileTooLarge { .. } => (
            400,
            "file_too_large",
            false,
            Some("Reduce the file size below the limit and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedFormat(_) => (
            400,
            "unsupported_format",
            false,
            Some("Upload a JPEG, PNG, GIF, WebP, or SVG file"),
            false,
            LogLevel::Debug,
        ),
        AppError::ContentMismatch { .. } => (
            400,
            "content_mismatch",
            false,
            Some("Check that the file content matches its declared type"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (400, "invalid_input", false, None, false, LogLevel::Debug),
        AppError::RateLimited { .. } => (
            429,
            "rate_limited",
            true,
            Some("Wait for the window to elapse and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::StorageWrite(_) => (
            500,
            "storage_write_failed",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (500, "internal_error", false, None, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => {
            (500, "internal_error", false, None, true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::FileTooLarge { size, max } => format!(
                "File too large: {} bytes exceeds the {} MB limit",
                size,
                max / 1024 / 1024
            ),
            AppError::UnsupportedFormat(msg) => format!("Unsupported format: {}", msg),
            AppError::ContentMismatch { declared } => format!(
                "File content does not match the declared type '{}'",
                declared
            ),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::RateLimited { .. } => "Too many requests. Please slow down.".to_string(),
            AppError::StorageWrite(_) => "Failed to store the uploaded file".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_400() {
        let err = AppError::FileTooLarge {
            size: 11 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "file_too_large");
        assert!(!err.is_recoverable());

        let err = AppError::ContentMismatch {
            declared: "image/png".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "content_mismatch");
    }

    #[test]
    fn test_rate_limited_is_429_and_recoverable() {
        let err = AppError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.http_status_code(), 429);
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_storage_write_is_500_and_sensitive() {
        let err = AppError::StorageWrite("bucket unreachable".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "storage_write_failed");
        assert!(err.is_sensitive());
        // Internal detail must not leak into the client message
        assert!(!err.client_message().contains("bucket"));
    }

    #[test]
    fn test_client_message_mentions_size_limit() {
        let err = AppError::FileTooLarge {
            size: 11_534_336,
            max: 10 * 1024 * 1024,
        };
        assert!(err.client_message().contains("10 MB"));
    }
}
