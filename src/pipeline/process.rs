//! Per-entity state machine and run sequencing.

use super::Pipeline;
use crate::error::{Error, Result, StorageError};
use crate::idempotency::PathStrategy;
use crate::report::RunReport;
use crate::storage::Metadata;
use crate::types::{Entity, Outcome, PipelineEvent, RunScope};
use serde_json::Value;

/// `type` metadata of persisted entity records
const RECORD_METADATA_TYPE: &str = "antique_appraiser_data";

/// Reason recorded for entities skipped by the idempotency gate
const SKIP_REASON: &str = "already present";

impl Pipeline {
    /// Drive one run over `batch`, then persist and return the report
    pub(super) async fn execute(
        &self,
        scope: RunScope,
        batch: &[Entity],
        skip_existing: bool,
        next_start: Option<usize>,
    ) -> Result<RunReport> {
        let total = batch.len();
        tracing::info!(
            ?scope,
            total,
            skip_existing,
            source = self.source.name(),
            store = self.store.name(),
            "run started"
        );
        self.emit_event(PipelineEvent::RunStarted { scope, total });

        let delay = self.config.inter_call_delay;
        let mut outcomes = Vec::with_capacity(total);

        for (index, entity) in batch.iter().enumerate() {
            let outcome = self.process_entity(entity, skip_existing).await;
            self.record_outcome(&outcome);

            let pace = outcome.consumed_call() && index + 1 < total;
            outcomes.push(outcome);

            if pace && !delay.is_zero() {
                tracing::debug!(?delay, "pacing before next entity");
                tokio::time::sleep(delay).await;
            }
        }

        let report = RunReport::new(scope, outcomes, next_start);
        let report_path = self.reporter.persist(&report).await?;

        tracing::info!(
            report_path = %report_path,
            succeeded = report.succeeded_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "run finished"
        );
        self.emit_event(PipelineEvent::RunFinished {
            report_path,
            succeeded: report.succeeded_count,
            skipped: report.skipped_count,
            failed: report.failed_count,
        });

        Ok(report)
    }

    /// Take one entity to a terminal outcome; never fails
    async fn process_entity(&self, entity: &Entity, skip_existing: bool) -> Outcome {
        if skip_existing {
            match self.checker.has_existing(entity).await {
                Ok(true) => {
                    return Outcome::Skipped {
                        entity: entity.clone(),
                        reason: SKIP_REASON.to_string(),
                    };
                }
                Ok(false) => {}
                Err(e) => return failed(entity, "failed to check existing result", &e),
            }
        }

        let raw = match self.source.fetch(&entity.name, &entity.region).await {
            Ok(raw) => raw,
            Err(e) => return failed(entity, "failed to fetch data", &Error::Fetch(e)),
        };

        let record = match self
            .transformer
            .transform(&raw, &entity.name, &entity.region)
        {
            Ok(record) => record,
            Err(e) => return failed(entity, "failed to transform data", &Error::Transform(e)),
        };

        match self.persist_record(entity, &record).await {
            Ok(path) => Outcome::Succeeded {
                entity: entity.clone(),
                result_ref: path,
            },
            Err(e) => failed(entity, "failed to persist result", &e),
        }
    }

    /// Write the record at the entity's canonical path (and the region mirror, if enabled)
    ///
    /// The mirror is skipped for entities whose region cannot form a path segment.
    async fn persist_record(&self, entity: &Entity, record: &Value) -> Result<String> {
        let path = PathStrategy::EntityRecord {
            prefix: self.config.entity_prefix.clone(),
        }
        .resolve(entity)
        .ok_or_else(|| StorageError::InvalidPath {
            path: entity.slug.clone(),
            reason: "slug cannot form a path segment".to_string(),
        })?;
        let path = self
            .store
            .put(&path, record, record_metadata(entity))
            .await?;

        if self.config.mirror_to_region {
            let mirror = PathStrategy::RegionRecord {
                prefix: self.config.region_prefix.clone(),
            }
            .resolve(entity);
            match mirror {
                Some(mirror) => {
                    if let Err(e) = self
                        .store
                        .put(&mirror, record, record_metadata(entity))
                        .await
                    {
                        tracing::warn!(slug = %entity.slug, path = %mirror, error = %e, "failed to write region mirror");
                    }
                }
                None => {
                    tracing::debug!(slug = %entity.slug, region = %entity.region, "no region path, skipping mirror");
                }
            }
        }

        Ok(path)
    }

    fn record_outcome(&self, outcome: &Outcome) {
        let slug = outcome.entity().slug.clone();
        match outcome {
            Outcome::Skipped { reason, .. } => {
                tracing::info!(slug = %slug, reason = %reason, "entity skipped");
                self.emit_event(PipelineEvent::EntitySkipped { slug });
            }
            Outcome::Succeeded { result_ref, .. } => {
                tracing::info!(slug = %slug, path = %result_ref, "entity succeeded");
                self.emit_event(PipelineEvent::EntitySucceeded {
                    slug,
                    path: result_ref.clone(),
                });
            }
            Outcome::Failed {
                error_message,
                error_kind,
                ..
            } => {
                tracing::warn!(slug = %slug, kind = %error_kind, error = %error_message, "entity failed");
                self.emit_event(PipelineEvent::EntityFailed {
                    slug,
                    error: error_message.clone(),
                });
            }
        }
    }
}

fn record_metadata(entity: &Entity) -> Metadata {
    let mut metadata = crate::storage::typed_metadata(RECORD_METADATA_TYPE);
    metadata.insert("slug".to_string(), Value::String(entity.slug.clone()));
    metadata.insert("region".to_string(), Value::String(entity.region.clone()));
    metadata
}

/// Failed outcome whose message names the stage, e.g. "failed to fetch data: ..."
fn failed(entity: &Entity, stage: &str, error: &Error) -> Outcome {
    let detail = match error {
        Error::Storage(e) => e.to_string(),
        Error::Fetch(e) => e.to_string(),
        Error::Transform(e) => e.to_string(),
        other => other.to_string(),
    };
    Outcome::Failed {
        entity: entity.clone(),
        error_message: format!("{stage}: {detail}"),
        error_kind: error.error_code().to_string(),
    }
}
