//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use pixbin_core::{ObjectMetadata, StoredObject};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3-compatible object stores, in-memory for tests)
/// implement this trait, so the upload pipeline never couples to a specific
/// backend.
///
/// **Key format:** callers pass fully-formed keys (`uploads/{timestamp}-{token}-{name}.{ext}`);
/// backends never derive or rewrite keys, which keeps a given key idempotent
/// across backends.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an object and return its stored representation, including the
    /// publicly accessible URL.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> StorageResult<StoredObject>;

    /// Check whether an object exists under the given key.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Delete an object by key.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
