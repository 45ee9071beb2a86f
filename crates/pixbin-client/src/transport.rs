//! Upload transport abstraction and the reqwest-backed implementation.

use crate::error::UploadError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pixbin_core::constants::API_PREFIX;
use pixbin_core::UploadResponse;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Sends a single file to the upload endpoint.
///
/// The orchestrator depends only on this trait, so batch behavior is testable
/// without a network.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, UploadError>;
}

/// Error body returned by the API on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP transport for the Pixbin upload API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create transport from environment: PIXBIN_API_URL (default http://localhost:3000).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PIXBIN_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        Self::new(base_url)
    }

    fn upload_url(&self) -> String {
        format!("{}{}/uploads", self.base_url, API_PREFIX)
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, UploadError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| UploadError::Rejected {
                message: format!("Invalid content type '{}': {}", content_type, e),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return response
                .json::<UploadResponse>()
                .await
                .map_err(|e| UploadError::Network(format!("Malformed response body: {}", e)));
        }

        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(UploadError::RateLimited { retry_after_secs });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP {}", status));

        if status.is_client_error() {
            Err(UploadError::Rejected { message })
        } else {
            Err(UploadError::Server(message))
        }
    }
}
