//! Read-side listing of stored entity records
//!
//! Enumerates what a run (or several) has produced, using only
//! [`ContentStore::list_by_prefix`]. Reports and cache entries live under
//! other prefixes and never show up here.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::idempotency::region_segment;
use crate::storage::ContentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One stored record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Entity slug, taken from the blob's file name
    pub slug: String,
    /// Full blob path
    pub path: String,
    /// Stored size in bytes
    pub size: u64,
}

/// Lists records written under the configured prefixes
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn ContentStore>,
    entity_prefix: String,
    region_prefix: String,
}

impl Catalog {
    /// Create a catalog over the prefixes in `config`
    pub fn new(store: Arc<dyn ContentStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            entity_prefix: config.entity_prefix.clone(),
            region_prefix: config.region_prefix.clone(),
        }
    }

    /// Every per-entity record, sorted by path
    pub async fn list_entity_records(&self) -> Result<Vec<RecordEntry>> {
        self.list_records(&format!("{}/", self.entity_prefix)).await
    }

    /// Every region-grouped record for `region`, sorted by path
    ///
    /// The region is matched case-insensitively, the same way the
    /// idempotency gate resolves region paths. A region that cannot form a
    /// path segment has no records.
    pub async fn list_region_records(&self, region: &str) -> Result<Vec<RecordEntry>> {
        let Some(segment) = region_segment(region) else {
            return Ok(Vec::new());
        };
        self.list_records(&format!("{}/{segment}/", self.region_prefix))
            .await
    }

    async fn list_records(&self, prefix: &str) -> Result<Vec<RecordEntry>> {
        let entries = self.store.list_by_prefix(prefix).await?;
        let records: Vec<RecordEntry> = entries
            .into_iter()
            .filter_map(|entry| {
                let slug = entry.path.rsplit('/').next()?.strip_suffix(".json")?.to_string();
                Some(RecordEntry {
                    slug,
                    path: entry.path,
                    size: entry.size,
                })
            })
            .collect();

        tracing::debug!(prefix = %prefix, count = records.len(), "listed records");
        Ok(records)
    }
}
