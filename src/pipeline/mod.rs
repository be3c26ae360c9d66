//! Batch orchestration -- one end-to-end run over an ordered entity list.
//!
//! Split into focused submodules:
//! - [`process`] - Per-entity state machine, pacing and report emission
//!
//! A run walks the entity list (or a contiguous subrange of it) strictly one
//! entity at a time, in list order. For each entity it consults the
//! [`IdempotencyChecker`], then fetches, transforms and persists, folding
//! every per-entity problem into a [`Failed`](crate::types::Outcome::Failed)
//! outcome. The run report is always persisted, even at 100% failure.
//!
//! Only two classes of error escape a run: an invalid or empty request
//! (checked before storage or the provider is touched) and failure to
//! persist the run report.

mod process;


use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::idempotency::IdempotencyChecker;
use crate::provider::DataSource;
use crate::report::{Reporter, RunReport};
use crate::storage::ContentStore;
use crate::transform::Transformer;
use crate::types::{Entity, PipelineEvent, RunScope};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lag rather than block the run
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Batch orchestrator
///
/// Owns its collaborators behind trait objects so tests and alternative
/// backends can be swapped in without touching the run logic.
///
/// # Examples
///
/// ```no_run
/// use city_directory::config::Config;
/// use city_directory::pipeline::Pipeline;
/// use city_directory::provider::PerplexityClient;
/// use city_directory::storage::{ContentStore, FsContentStore};
/// use city_directory::transform::RecordBuilder;
/// use city_directory::types::load_entities;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.provider = city_directory::config::ProviderConfig::from_env()?;
///
/// let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::from_config(&config.storage));
/// let client = PerplexityClient::new(config.provider.clone())?.with_cache(store.clone());
/// let pipeline = Pipeline::new(
///     store,
///     Arc::new(client),
///     Arc::new(RecordBuilder::default()),
///     load_entities("cities.json")?,
///     config.pipeline,
/// );
///
/// let report = pipeline.run_range(0, 10, true).await?;
/// println!("next batch starts at {:?}", report.next_start);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    store: Arc<dyn ContentStore>,
    source: Arc<dyn DataSource>,
    transformer: Arc<dyn Transformer>,
    entities: Vec<Entity>,
    config: PipelineConfig,
    checker: IdempotencyChecker,
    reporter: Reporter,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl Pipeline {
    /// Create an orchestrator over `entities`
    pub fn new(
        store: Arc<dyn ContentStore>,
        source: Arc<dyn DataSource>,
        transformer: Arc<dyn Transformer>,
        entities: Vec<Entity>,
        config: PipelineConfig,
    ) -> Self {
        let checker = IdempotencyChecker::from_config(store.clone(), &config);
        let reporter = Reporter::from_config(store.clone(), &config);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            store,
            source,
            transformer,
            entities,
            config,
            checker,
            reporter,
            event_tx,
        }
    }

    /// The ordered entity list
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The orchestrator's configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The idempotency gate used by this orchestrator
    pub fn checker(&self) -> &IdempotencyChecker {
        &self.checker
    }

    /// Subscribe to run events
    ///
    /// Events published before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub(crate) fn emit_event(&self, event: PipelineEvent) {
        self.event_tx.send(event).ok();
    }

    /// Process every entity in the list
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyEntityList`] if there is nothing to process
    /// - a storage error if the run report cannot be persisted
    pub async fn run_full(&self, skip_existing: bool) -> Result<RunReport> {
        if self.entities.is_empty() {
            return Err(Error::EmptyEntityList);
        }
        self.execute(RunScope::Full, &self.entities, skip_existing, None)
            .await
    }

    /// Process the contiguous subrange `[start, min(start + count, total))`
    ///
    /// The report's `next_start` holds the index the following batch should
    /// start at, or `None` once the list is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyEntityList`] if the list is empty or `count` is zero
    /// - [`Error::InvalidRange`] if `start` is past the last entity
    /// - a storage error if the run report cannot be persisted
    ///
    /// Range errors are raised before storage or the provider is touched.
    pub async fn run_range(
        &self,
        start: usize,
        count: usize,
        skip_existing: bool,
    ) -> Result<RunReport> {
        let total = self.entities.len();
        if total == 0 || count == 0 {
            return Err(Error::EmptyEntityList);
        }
        if start >= total {
            return Err(Error::InvalidRange { start, total });
        }

        let end = start.saturating_add(count).min(total);
        let next_start = (end < total).then_some(end);
        let scope = RunScope::Range { start, count, end };

        self.execute(scope, &self.entities[start..end], skip_existing, next_start)
            .await
    }
}
