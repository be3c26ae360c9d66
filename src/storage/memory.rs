//! In-memory content store
//!
//! Keeps the same serialized envelope as the filesystem backend so sizes and
//! corruption behave identically. Useful for tests and dry runs.

use super::{BlobEntry, ContentStore, Metadata, decode_blob, encode_blob, validate_path, validate_prefix};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Process-local content store
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Place raw bytes at `path`, bypassing the envelope
    ///
    /// Lets callers seed the store with blobs written by another tool, or with
    /// deliberately corrupt data.
    pub fn insert_raw(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.write_guard().insert(path.into(), bytes.into());
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    /// Whether the store holds no blobs
    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.blobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.blobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(
        &self,
        path: &str,
        content: &Value,
        metadata: Metadata,
    ) -> Result<String, StorageError> {
        validate_path(path)?;
        let bytes = encode_blob(path, content, metadata)?;
        self.write_guard().insert(path.to_string(), bytes);
        tracing::debug!(path = %path, "stored blob in memory");
        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Value, StorageError> {
        validate_path(path)?;
        let bytes = self
            .read_guard()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })?;
        decode_blob(path, &bytes)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        validate_prefix(prefix)?;
        // BTreeMap iteration is already sorted by path
        Ok(self
            .read_guard()
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, bytes)| BlobEntry {
                path: path.clone(),
                size: bytes.len() as u64,
            })
            .collect())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        validate_path(path)?;
        Ok(self.read_guard().contains_key(path))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
