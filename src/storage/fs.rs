//! Filesystem-backed content store
//!
//! Blob paths map to files under a root directory. Writes go to a uniquely
//! named sibling temp file which is then renamed over the target, so a reader
//! (or a process killed mid-write) never sees a partial blob.

use super::{BlobEntry, ContentStore, Metadata, decode_blob, encode_blob, validate_path, validate_prefix};
use crate::config::StorageConfig;
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// File name prefix of in-flight writes; never reported by listings
const TEMP_PREFIX: &str = ".tmp-";

/// Per-process counter making temp file names unique
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content store keeping each blob as a pretty-printed JSON file
#[derive(Clone, Debug)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Create a store rooted at `root`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store from configuration
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone())
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn temp_path_for(target: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!("{TEMP_PREFIX}{}-{n}-{name}", std::process::id()))
    }

    async fn write_atomically(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.full_path(path);
        let write_err = |source: std::io::Error| StorageError::Write {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let temp = Self::temp_path_for(&target);
        if let Err(e) = tokio::fs::write(&temp, bytes).await {
            tokio::fs::remove_file(&temp).await.ok();
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            tokio::fs::remove_file(&temp).await.ok();
            return Err(write_err(e));
        }
        Ok(())
    }

    /// Convert a file under the root back into a blob path
    fn blob_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

/// Whether an I/O error means "nothing stored there"
fn is_absent(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
    )
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(
        &self,
        path: &str,
        content: &Value,
        metadata: Metadata,
    ) -> Result<String, StorageError> {
        validate_path(path)?;
        let bytes = encode_blob(path, content, metadata)?;

        match self.write_atomically(path, &bytes).await {
            Ok(()) => {
                tracing::debug!(path = %path, size = bytes.len(), "stored blob");
                Ok(path.to_string())
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to store blob");
                Err(e)
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Value, StorageError> {
        validate_path(path)?;
        let full = self.full_path(path);

        let bytes = match tokio::fs::read(&full).await {
            Ok(bytes) => bytes,
            Err(e) if is_absent(&e) => {
                return Err(StorageError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(StorageError::read(path, e)),
        };

        let content = decode_blob(path, &bytes)?;
        tracing::debug!(path = %path, size = bytes.len(), "read blob");
        Ok(content)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        validate_prefix(prefix)?;

        // Walk from the deepest directory the prefix fully names, then filter
        // by string prefix so "cities/chi" matches "cities/chicago.json".
        let start_dir = match prefix.rfind('/') {
            Some(idx) => self.full_path(&prefix[..idx]),
            None => self.root.clone(),
        };

        let list_err = |e: std::io::Error| StorageError::List {
            prefix: prefix.to_string(),
            reason: e.to_string(),
        };

        let mut entries = Vec::new();
        let mut pending = vec![start_dir];

        while let Some(dir) = pending.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if is_absent(&e) => continue,
                Err(e) => return Err(list_err(e)),
            };

            while let Some(entry) = read_dir.next_entry().await.map_err(list_err)? {
                let file_type = match entry.file_type().await {
                    Ok(ft) => ft,
                    Err(e) if is_absent(&e) => continue,
                    Err(e) => return Err(list_err(e)),
                };

                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if !file_type.is_file() || entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }

                let Some(blob_path) = self.blob_path(&entry.path()) else {
                    continue;
                };
                if !blob_path.starts_with(prefix) {
                    continue;
                }

                let size = match entry.metadata().await {
                    Ok(m) => m.len(),
                    Err(e) if is_absent(&e) => continue,
                    Err(e) => return Err(list_err(e)),
                };
                entries.push(BlobEntry {
                    path: blob_path,
                    size,
                });
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(prefix = %prefix, count = entries.len(), "listed blobs");
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        validate_path(path)?;
        match tokio::fs::metadata(self.full_path(path)).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(StorageError::read(path, e)),
        }
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
