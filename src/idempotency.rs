//! Idempotency gate
//!
//! Decides, before spending a provider call, whether usable output already
//! exists for an entity. Candidate locations are an ordered list of
//! [`PathStrategy`] values evaluated in priority order; the first hit wins.
//!
//! A missing blob at a candidate is a normal miss. Any other storage error
//! (a corrupt blob, an unreadable file) is propagated: it is a real problem,
//! not a cache miss.

use crate::config::PipelineConfig;
use crate::error::{Result, StorageError};
use crate::storage::ContentStore;
use crate::types::Entity;
use serde_json::Value;
use std::sync::Arc;

/// One way of resolving an entity to a storage path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStrategy {
    /// `{prefix}/{slug}.json`
    EntityRecord {
        /// Path prefix without trailing slash
        prefix: String,
    },
    /// `{prefix}/{region in lowercase}/{slug}.json`
    RegionRecord {
        /// Path prefix without trailing slash
        prefix: String,
    },
}

impl PathStrategy {
    /// Resolve the storage path of `entity` under this strategy
    ///
    /// Returns `None` when the entity lacks a usable path component for this
    /// strategy, e.g. a region-grouped record for an entity with no region.
    pub fn resolve(&self, entity: &Entity) -> Option<String> {
        if !is_usable_segment(&entity.slug) {
            return None;
        }
        match self {
            PathStrategy::EntityRecord { prefix } => Some(format!("{prefix}/{}.json", entity.slug)),
            PathStrategy::RegionRecord { prefix } => {
                let region = region_segment(&entity.region)?;
                Some(format!("{prefix}/{region}/{}.json", entity.slug))
            }
        }
    }
}

/// Path segment for a region: lowercase, with `/` replaced so it stays one segment
///
/// `None` for regions that cannot form a segment (empty, `.` or `..`).
pub(crate) fn region_segment(region: &str) -> Option<String> {
    let segment = region.to_lowercase().replace('/', "-");
    is_usable_segment(&segment).then_some(segment)
}

fn is_usable_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

/// Checks candidate locations for existing output
///
/// The pipeline only asks [`has_existing`](Self::has_existing).
/// [`find_existing`](Self::find_existing) and
/// [`fetch_existing`](Self::fetch_existing) are for callers that want the
/// stored record itself, such as a report that shows skipped entities' data.
#[derive(Clone)]
pub struct IdempotencyChecker {
    store: Arc<dyn ContentStore>,
    strategies: Vec<PathStrategy>,
}

impl IdempotencyChecker {
    /// Create a checker evaluating `strategies` in order
    pub fn new(store: Arc<dyn ContentStore>, strategies: Vec<PathStrategy>) -> Self {
        Self { store, strategies }
    }

    /// Per-entity record first, then the region-grouped record
    pub fn from_config(store: Arc<dyn ContentStore>, config: &PipelineConfig) -> Self {
        Self::new(
            store,
            vec![
                PathStrategy::EntityRecord {
                    prefix: config.entity_prefix.clone(),
                },
                PathStrategy::RegionRecord {
                    prefix: config.region_prefix.clone(),
                },
            ],
        )
    }

    /// Strategies in evaluation order
    pub fn strategies(&self) -> &[PathStrategy] {
        &self.strategies
    }

    /// Candidate paths for `entity`, highest priority first
    ///
    /// Strategies that do not apply to the entity are left out.
    pub fn candidate_paths(&self, entity: &Entity) -> Vec<String> {
        self.strategies.iter().filter_map(|s| s.resolve(entity)).collect()
    }

    /// Whether any candidate location holds a readable blob
    ///
    /// # Errors
    ///
    /// Propagates every storage error other than "not found".
    pub async fn has_existing(&self, entity: &Entity) -> Result<bool> {
        Ok(self.find_existing(entity).await?.is_some())
    }

    /// Path of the first candidate holding a readable blob
    pub async fn find_existing(&self, entity: &Entity) -> Result<Option<String>> {
        Ok(self.first_hit(entity).await?.map(|(path, _)| path))
    }

    /// Content at the first candidate location that hits
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] (naming the first candidate) when no
    /// candidate holds a blob, for example because another writer removed it
    /// after [`has_existing`](Self::has_existing) returned true. Falls back to
    /// the slug when no strategy resolves a path for the entity.
    pub async fn fetch_existing(&self, entity: &Entity) -> Result<Value> {
        match self.first_hit(entity).await? {
            Some((_, content)) => Ok(content),
            None => Err(StorageError::NotFound {
                path: self
                    .candidate_paths(entity)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| entity.slug.clone()),
            }
            .into()),
        }
    }

    async fn first_hit(&self, entity: &Entity) -> Result<Option<(String, Value)>> {
        for path in self.candidate_paths(entity) {
            match self.store.get(&path).await {
                Ok(content) => {
                    tracing::debug!(slug = %entity.slug, path = %path, "existing output found");
                    return Ok(Some((path, content)));
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    tracing::warn!(slug = %entity.slug, path = %path, error = %e, "existing output unreadable");
                    return Err(e.into());
                }
            }
        }
        tracing::debug!(slug = %entity.slug, "no existing output");
        Ok(None)
    }
}
