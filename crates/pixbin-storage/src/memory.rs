//! In-memory storage backend.
//!
//! Used by integration tests and local development, where a real object store
//! is unavailable. Implements the same `Storage` trait as the S3 backend.

use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use pixbin_core::{ObjectMetadata, StoredObject};
use std::collections::HashMap;
use std::sync::Mutex;

struct StoredEntry {
    data: Bytes,
    object: StoredObject,
}

/// In-memory object store keyed by storage key.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the raw bytes stored under a key, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.data.clone())
    }

    /// Fetch the stored object record under a key, if any.
    pub fn get_object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.object.clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> StorageResult<StoredObject> {
        let object = StoredObject {
            key: key.to_string(),
            url: format!("memory://{}", key),
            size_bytes: data.len() as u64,
            content_type: content_type.to_string(),
            uploaded_at: chrono::Utc::now(),
            metadata,
        };

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredEntry {
                data,
                object: object.clone(),
            },
        );

        Ok(object)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
