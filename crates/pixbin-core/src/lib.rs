//! Pixbin Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! object-key generation shared across all Pixbin components.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod models;
pub mod object_key;

// Re-export commonly used types
pub use config::{BaseConfig, Config, RateLimitConfig, StorageConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::ImageFormat;
pub use models::{ObjectMetadata, StoredObject, UploadResponse};
pub use object_key::{generate_object_key, sanitize_filename};
