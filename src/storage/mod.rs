//! Path-addressed blob storage
//!
//! This module provides a capability abstraction over a hierarchical object
//! store. Blobs are addressed by slash-separated paths, carry an envelope of
//! `{content, metadata}`, and can be enumerated by prefix the way a cloud
//! bucket listing works.
//!
//! ## Architecture
//!
//! The core abstraction is the [`ContentStore`] trait. Implementations:
//!
//! - [`FsContentStore`]: blobs as JSON files under a root directory, with
//!   atomic per-path writes
//! - [`MemoryContentStore`]: process-local map, for tests and dry runs
//!
//! A networked object store can be added as another implementation without
//! touching the orchestrator.
//!
//! ## Contract
//!
//! - `put` overwrites wholesale; a reader never observes a half-written blob
//! - `get` on a missing path returns [`StorageError::NotFound`], never an empty blob
//! - `list_by_prefix` on a missing prefix returns an empty list
//! - `exists` agrees with `get`'s not-found semantics

mod fs;
mod memory;

pub use fs::FsContentStore;
pub use memory::MemoryContentStore;

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form blob metadata
pub type Metadata = serde_json::Map<String, Value>;

/// One entry of a prefix listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    /// Full blob path
    pub path: String,
    /// Stored size in bytes (envelope included)
    pub size: u64,
}

/// Trait for path-addressed blob storage
///
/// # Examples
///
/// ```no_run
/// use city_directory::storage::{ContentStore, FsContentStore, Metadata};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FsContentStore::new("./output");
/// store.put("cities/chicago.json", &json!({"appraisers": []}), Metadata::new()).await?;
///
/// let content = store.get("cities/chicago.json").await?;
/// assert_eq!(content, json!({"appraisers": []}));
///
/// for entry in store.list_by_prefix("cities/").await? {
///     println!("{} ({} bytes)", entry.path, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `content` at `path`, replacing any existing blob
    ///
    /// The stored envelope's metadata holds `timestamp`, `contentLength` and
    /// `storagePath`, followed by the caller's entries. Returns the path.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidPath`] if `path` is not a valid blob key
    /// - [`StorageError::Write`] if the backing medium rejects the write
    async fn put(&self, path: &str, content: &Value, metadata: Metadata)
    -> Result<String, StorageError>;

    /// Read the `content` field of the blob at `path`
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no blob exists at `path`
    /// - [`StorageError::Read`] if the blob is unreadable or corrupt
    async fn get(&self, path: &str) -> Result<Value, StorageError>;

    /// Enumerate every blob whose path starts with `prefix`, sorted by path
    ///
    /// Depth is unbounded. A prefix with no blobs yields an empty list.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError>;

    /// Whether a blob exists at `path` (true iff `get` would not return `NotFound`)
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;
}

/// On-disk/in-memory envelope of a stored blob
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredBlob {
    pub(crate) content: Value,
    #[serde(default)]
    pub(crate) metadata: Metadata,
}

/// Serialize the envelope for `content` at `path`
pub(crate) fn encode_blob(
    path: &str,
    content: &Value,
    caller_metadata: Metadata,
) -> Result<Vec<u8>, StorageError> {
    let write_err = |e: serde_json::Error| StorageError::Write {
        path: path.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    };

    let content_length = serde_json::to_string(content).map_err(write_err)?.len();

    let mut metadata = Metadata::new();
    metadata.insert(
        "timestamp".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    metadata.insert("contentLength".to_string(), Value::from(content_length));
    metadata.insert("storagePath".to_string(), Value::String(path.to_string()));
    metadata.extend(caller_metadata);

    let blob = StoredBlob {
        content: content.clone(),
        metadata,
    };
    serde_json::to_vec_pretty(&blob).map_err(write_err)
}

/// Parse a stored envelope and return its content
pub(crate) fn decode_blob(path: &str, bytes: &[u8]) -> Result<Value, StorageError> {
    serde_json::from_slice::<StoredBlob>(bytes)
        .map(|blob| blob.content)
        .map_err(|e| StorageError::read(path, format!("corrupt blob envelope: {e}")))
}

/// Check that `path` is a usable blob key
///
/// Keys are relative, slash-separated, with no empty, `.` or `..` segments.
pub(crate) fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.contains('\\') || path.contains('\0') {
        return Err(invalid("path contains a backslash or NUL byte"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid("path must not start or end with '/'"));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("path contains an empty, '.' or '..' segment"));
    }
    Ok(())
}

/// Check that `prefix` cannot escape the store root
///
/// Unlike paths, prefixes may be empty, end with `/` or stop mid-segment.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }
    let invalid = |reason: &str| StorageError::InvalidPath {
        path: prefix.to_string(),
        reason: reason.to_string(),
    };

    if prefix.contains('\\') || prefix.contains('\0') {
        return Err(invalid("prefix contains a backslash or NUL byte"));
    }
    if prefix.starts_with('/') {
        return Err(invalid("prefix must not start with '/'"));
    }
    if prefix.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(invalid("prefix contains a '.' or '..' segment"));
    }
    Ok(())
}

/// Metadata with a single `type` entry, the most common caller metadata
pub fn typed_metadata(kind: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), Value::String(kind.to_string()));
    metadata
}
