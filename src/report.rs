//! Aggregate run reporting
//!
//! Folds the ordered outcome sequence of a run into counts and persists:
//! - the full [`RunReport`] (one blob per run, at a canonical path per scope)
//! - optionally a [`RunSummary`] with counts and a per-entity hit/miss flag,
//!   overwritten on every run

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::storage::{ContentStore, typed_metadata};
use crate::types::{Outcome, RunScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable record of one orchestrator invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Which part of the entity list was processed
    pub scope: RunScope,
    /// Number of entities attempted in this run
    pub total_entities: usize,
    /// Entities skipped by the idempotency gate
    pub skipped_count: usize,
    /// Entities fetched and persisted
    pub succeeded_count: usize,
    /// Entities that failed
    pub failed_count: usize,
    /// Start index of the next contiguous batch (range runs only; `None` once the list is exhausted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_start: Option<usize>,
    /// Per-entity outcomes, in entity-list order
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    /// Build a report, folding `outcomes` into counts
    pub fn new(scope: RunScope, outcomes: Vec<Outcome>, next_start: Option<usize>) -> Self {
        let (mut skipped, mut succeeded, mut failed) = (0, 0, 0);
        for outcome in &outcomes {
            match outcome {
                Outcome::Skipped { .. } => skipped += 1,
                Outcome::Succeeded { .. } => succeeded += 1,
                Outcome::Failed { .. } => failed += 1,
            }
        }

        Self {
            generated_at: Utc::now(),
            scope,
            total_entities: outcomes.len(),
            skipped_count: skipped,
            succeeded_count: succeeded,
            failed_count: failed,
            next_start,
            outcomes,
        }
    }

    /// Whether every entity in the run failed
    pub fn all_failed(&self) -> bool {
        self.total_entities > 0 && self.failed_count == self.total_entities
    }

    /// Counts and hit/miss flags only, no payloads
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            generated_at: self.generated_at,
            scope: self.scope,
            total_entities: self.total_entities,
            succeeded_count: self.succeeded_count,
            failed_count: self.failed_count,
            skipped_count: self.skipped_count,
            entities: self
                .outcomes
                .iter()
                .map(|o| {
                    let e = o.entity();
                    SummaryEntry {
                        name: e.name.clone(),
                        region: e.region.clone(),
                        slug: e.slug.clone(),
                        has_data: o.has_data(),
                    }
                })
                .collect(),
        }
    }
}

/// Small summary blob for cheap inspection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Which part of the entity list was processed
    pub scope: RunScope,
    /// Number of entities attempted
    pub total_entities: usize,
    /// Entities fetched and persisted
    pub succeeded_count: usize,
    /// Entities that failed
    pub failed_count: usize,
    /// Entities skipped by the idempotency gate
    pub skipped_count: usize,
    /// Per-entity hit/miss flags, in run order
    pub entities: Vec<SummaryEntry>,
}

/// One entity's line in a [`RunSummary`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    /// Entity name
    pub name: String,
    /// Entity region
    pub region: String,
    /// Entity slug
    pub slug: String,
    /// Whether usable output exists after the run
    pub has_data: bool,
}

/// Persists run reports to the content store
#[derive(Clone)]
pub struct Reporter {
    store: Arc<dyn ContentStore>,
    prefix: String,
    write_summary: bool,
}

impl Reporter {
    /// Create a reporter writing under `prefix`
    pub fn new(store: Arc<dyn ContentStore>, prefix: impl Into<String>, write_summary: bool) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            write_summary,
        }
    }

    /// Create a reporter from pipeline configuration
    pub fn from_config(store: Arc<dyn ContentStore>, config: &PipelineConfig) -> Self {
        Self::new(store, config.report_prefix.clone(), config.write_summary)
    }

    /// Canonical path of the full report for `scope`
    ///
    /// Full runs write `directory.json`; range runs write
    /// `batch-{start}-{last index}.json`.
    pub fn report_path(&self, scope: &RunScope) -> String {
        match scope {
            RunScope::Full => format!("{}/directory.json", self.prefix),
            RunScope::Range { start, end, .. } => {
                format!("{}/batch-{}-{}.json", self.prefix, start, end.saturating_sub(1))
            }
        }
    }

    /// Canonical path of the summary blob
    pub fn summary_path(&self) -> String {
        format!("{}/directory-summary.json", self.prefix)
    }

    /// Persist `report` (and the summary, if enabled); returns the report path
    ///
    /// # Errors
    ///
    /// Fails if the full report cannot be written. A failed summary write is
    /// logged and does not fail the call.
    pub async fn persist(&self, report: &RunReport) -> Result<String> {
        let path = self.report_path(&report.scope);
        let content = serde_json::to_value(report)?;

        if let Err(e) = self
            .store
            .put(&path, &content, typed_metadata("run_report"))
            .await
        {
            tracing::error!(path = %path, error = %e, "failed to persist run report");
            return Err(e.into());
        }
        tracing::info!(
            path = %path,
            succeeded = report.succeeded_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "run report persisted"
        );

        if self.write_summary {
            let summary_path = self.summary_path();
            let summary = serde_json::to_value(report.summary())?;
            if let Err(e) = self
                .store
                .put(&summary_path, &summary, typed_metadata("run_summary"))
                .await
            {
                tracing::warn!(path = %summary_path, error = %e, "failed to persist run summary");
            }
        }

        Ok(path)
    }
}
