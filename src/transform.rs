//! Raw text to structured record
//!
//! The domain-specific structuring step is a collaborator of the pipeline,
//! reached through the [`Transformer`] trait. [`RecordBuilder`] is the default:
//! it wraps the raw text in a record with entity and provenance fields.

use crate::error::TransformError;
use serde_json::{Value, json};

/// Turns raw provider text into the record persisted for an entity
///
/// Implementations must be pure: same input, same record (timestamps aside).
pub trait Transformer: Send + Sync {
    /// Structure `raw` for the entity `(name, region)`
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when `raw` cannot be structured. The
    /// orchestrator records it as a per-entity failure.
    fn transform(&self, raw: &str, name: &str, region: &str) -> Result<Value, TransformError>;
}

/// Default transformer producing a provenance-tagged record
///
/// ```json
/// {
///   "city": "Chicago",
///   "state": "Illinois",
///   "content": "<raw text>",
///   "timestamp": "2024-01-01T00:00:00Z",
///   "metadata": {"type": "antique_appraiser_data", "source": "perplexity", "processedAt": "..."}
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RecordBuilder {
    record_type: String,
    source: String,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new("antique_appraiser_data", "perplexity")
    }
}

impl RecordBuilder {
    /// Create a builder tagging records with `record_type` and `source`
    pub fn new(record_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            source: source.into(),
        }
    }
}

impl Transformer for RecordBuilder {
    fn transform(&self, raw: &str, name: &str, region: &str) -> Result<Value, TransformError> {
        if raw.trim().is_empty() {
            return Err(TransformError::new(format!(
                "no content to structure for {name}, {region}"
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        Ok(json!({
            "city": name,
            "state": region,
            "content": raw,
            "timestamp": now,
            "metadata": {
                "type": self.record_type,
                "source": self.source,
                "processedAt": now,
            },
        }))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_wraps_raw_text_with_provenance() {
        let record = RecordBuilder::default()
            .transform("some appraiser text", "Chicago", "Illinois")
            .unwrap();

        assert_eq!(record["city"], "Chicago");
        assert_eq!(record["state"], "Illinois");
        assert_eq!(record["content"], "some appraiser text");
        assert_eq!(record["metadata"]["type"], "antique_appraiser_data");
        assert_eq!(record["metadata"]["source"], "perplexity");
        assert_eq!(record["timestamp"], record["metadata"]["processedAt"]);
    }

    #[test]
    fn blank_text_is_a_transform_error() {
        let err = RecordBuilder::default()
            .transform("  \n", "Chicago", "Illinois")
            .unwrap_err();
        assert!(err.to_string().contains("Chicago"));
    }
}
