//! Pixbin Storage Library
//!
//! Object storage backends behind a single `Storage` trait: an S3-compatible
//! backend built on `object_store`, and an in-memory backend for tests and
//! local development.

pub mod memory;
pub mod s3;
pub mod traits;

pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
