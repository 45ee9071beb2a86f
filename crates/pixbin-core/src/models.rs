//! Wire and domain models shared between the server and the client crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata recorded alongside a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub original_name: String,
    pub optimized: bool,
}

/// A durable, publicly addressable object written to the store.
/// Immutable once written; keys are never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub metadata: ObjectMetadata,
}

/// Successful upload response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Server-assigned identity for this upload.
    pub id: Uuid,
    /// Public URL under which the object is reachable.
    pub url: String,
    /// Stored object file name (the final key segment).
    pub file_name: String,
    /// Sanitized original file name as submitted by the client.
    pub original_name: String,
    /// Stored size in bytes (after optimization, if any).
    pub size: u64,
    /// Size in bytes as uploaded.
    pub original_size: u64,
    /// Content type of the stored object.
    pub content_type: String,
    /// Whether the stored bytes differ from the uploaded bytes.
    pub optimized: bool,
    pub uploaded_at: DateTime<Utc>,
}
