//! Client-observed upload errors.

use thiserror::Error;

/// Per-file upload failure kinds as seen from the client.
///
/// `Clone` because failed entries are retained in batch state for explicit
/// retry, alongside the error that caused them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    /// The server rejected the file (validation failure, 4xx).
    #[error("Upload rejected: {message}")]
    Rejected { message: String },

    /// The server throttled the request (429).
    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Opaque server-side failure (5xx).
    #[error("Server error: {0}")]
    Server(String),

    /// Transport-level failure: connection refused, timeout, malformed body.
    #[error("Network error: {0}")]
    Network(String),
}

impl UploadError {
    /// Whether a retry of the same file has a reasonable chance of success.
    /// Validation rejections are deterministic and not worth re-sending.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UploadError::Rejected { .. })
    }
}
