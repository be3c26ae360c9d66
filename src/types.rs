//! Core types for city-directory

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One unit of work: a named city and the region (state) it belongs to
///
/// Entities are read-only configuration; the pipeline only reads `name`,
/// `region` and `slug`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Human-readable name (e.g. "Chicago")
    pub name: String,
    /// Region or grouping key (e.g. "Illinois")
    #[serde(alias = "state")]
    pub region: String,
    /// Normalized key used as a storage path component and idempotency key
    #[serde(default)]
    pub slug: String,
}

impl Entity {
    /// Create an entity, deriving its slug from the name
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self {
            name,
            region: region.into(),
            slug,
        }
    }

    /// Create an entity with an explicit slug
    pub fn with_slug(
        name: impl Into<String>,
        region: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            slug: slug.into(),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.name, self.region)
    }
}

/// Derive the normalized key for a name
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and strips leading/trailing separators.
///
/// # Examples
///
/// ```
/// use city_directory::types::slugify;
///
/// assert_eq!(slugify("St. Louis"), "st-louis");
/// assert_eq!(slugify("  Winston--Salem "), "winston-salem");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[derive(Deserialize)]
struct EntityListDocument {
    cities: Vec<Entity>,
}

/// Parse an entity list document
///
/// Accepts `{"cities": [{"name", "state", "slug"?}]}`. A missing or empty slug
/// is derived from the name with [`slugify`].
pub fn parse_entities(json: &str) -> Result<Vec<Entity>> {
    let doc: EntityListDocument = serde_json::from_str(json)?;
    Ok(doc
        .cities
        .into_iter()
        .map(|mut entity| {
            if entity.slug.is_empty() {
                entity.slug = slugify(&entity.name);
            }
            entity
        })
        .collect())
}

/// Load an entity list document from disk
pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<Entity>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| crate::error::file_context(path, e))?;
    let entities = parse_entities(&raw)?;
    if entities.is_empty() {
        return Err(Error::EmptyEntityList);
    }
    Ok(entities)
}

/// Which part of the entity list a run covered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunScope {
    /// The whole list
    Full,
    /// The contiguous subrange `[start, end)`
    Range {
        /// First index processed
        start: usize,
        /// Number of entities requested
        count: usize,
        /// One past the last index processed (clamped to the list length)
        end: usize,
    },
}

/// Per-entity terminal result of a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Outcome {
    /// Usable output already existed; no provider call was made
    Skipped {
        /// The entity
        entity: Entity,
        /// Why it was skipped
        reason: String,
    },
    /// The entity was fetched, transformed and persisted
    Succeeded {
        /// The entity
        entity: Entity,
        /// Path of the persisted record
        result_ref: String,
    },
    /// Something went wrong while handling this entity
    Failed {
        /// The entity
        entity: Entity,
        /// Human-readable failure message
        error_message: String,
        /// Machine-readable error code (see [`Error::error_code`])
        error_kind: String,
    },
}

impl Outcome {
    /// The entity this outcome belongs to
    pub fn entity(&self) -> &Entity {
        match self {
            Outcome::Skipped { entity, .. }
            | Outcome::Succeeded { entity, .. }
            | Outcome::Failed { entity, .. } => entity,
        }
    }

    /// Whether usable output exists for the entity after the run
    pub fn has_data(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }

    /// Whether the entity consumed a provider call slot (and therefore pacing)
    pub fn consumed_call(&self) -> bool {
        !matches!(self, Outcome::Skipped { .. })
    }
}

/// Event emitted while a run progresses
///
/// Published on the orchestrator's broadcast channel; see
/// [`Pipeline::subscribe`](crate::pipeline::Pipeline::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run started
    RunStarted {
        /// Which part of the list is being processed
        scope: RunScope,
        /// Number of entities in this run
        total: usize,
    },

    /// An entity was skipped by the idempotency gate
    EntitySkipped {
        /// Entity slug
        slug: String,
    },

    /// An entity's record was persisted
    EntitySucceeded {
        /// Entity slug
        slug: String,
        /// Path of the persisted record
        path: String,
    },

    /// An entity failed
    EntityFailed {
        /// Entity slug
        slug: String,
        /// Error message
        error: String,
    },

    /// The run finished and its report was persisted
    RunFinished {
        /// Path of the persisted report
        report_path: String,
        /// Number of entities that succeeded
        succeeded: usize,
        /// Number of entities that were skipped
        skipped: usize,
        /// Number of entities that failed
        failed: usize,
    },
}
