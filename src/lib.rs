//! # city-directory
//!
//! Batch generation pipeline for a directory of antique appraisers by city.
//!
//! ## Design Philosophy
//!
//! city-directory is designed to be:
//! - **Resumable** - Every run re-reads persisted state; an interrupted run picks up where it stopped
//! - **Failure-tolerant** - One entity's failure never aborts the run; every run yields a report
//! - **Polite** - Entities are processed one at a time with a fixed delay between provider calls
//! - **Backend-agnostic** - Storage, provider and transformation sit behind traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use city_directory::{Config, FsContentStore, PerplexityClient, Pipeline, RecordBuilder};
//! use city_directory::config::ProviderConfig;
//! use city_directory::storage::ContentStore;
//! use city_directory::types::load_entities;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         provider: ProviderConfig::from_env()?,
//!         ..Default::default()
//!     };
//!
//!     let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::from_config(&config.storage));
//!     let client = PerplexityClient::new(config.provider.clone())?.with_cache(store.clone());
//!     let pipeline = Pipeline::new(
//!         store,
//!         Arc::new(client),
//!         Arc::new(RecordBuilder::default()),
//!         load_entities("cities.json")?,
//!         config.pipeline,
//!     );
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = pipeline.run_full(true).await?;
//!     println!(
//!         "{} succeeded, {} skipped, {} failed",
//!         report.succeeded_count, report.skipped_count, report.failed_count
//!     );
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Read-side listing of stored records
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Idempotency gate
pub mod idempotency;
/// Batch orchestrator
pub mod pipeline;
/// External data source client
pub mod provider;
/// Run report aggregation and persistence
pub mod report;
/// Path-addressed blob storage
pub mod storage;
/// Raw text to structured record
pub mod transform;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::{Catalog, RecordEntry};
pub use config::{Config, PipelineConfig, ProviderConfig, StorageConfig};
pub use error::{Error, FetchError, Result, StorageError, TransformError};
pub use idempotency::{IdempotencyChecker, PathStrategy};
pub use pipeline::Pipeline;
pub use provider::{DataSource, PerplexityClient};
pub use report::{Reporter, RunReport, RunSummary, SummaryEntry};
pub use storage::{BlobEntry, ContentStore, FsContentStore, MemoryContentStore, Metadata};
pub use transform::{RecordBuilder, Transformer};
pub use types::{Entity, Outcome, PipelineEvent, RunScope};
