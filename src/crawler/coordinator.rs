//! Crawl coordinator - one step of the crawl per call
//!
//! A cycle loads the checkpoint, fetches the next catalog page and then
//! either appends the page to the raw store or, at the end of the catalog,
//! runs the reorganization and starts a new pass. The coordinator never
//! loops on its own; the scheduler or a manual trigger drives it.
//!
//! ```text
//! IDLE -> FETCHING -> APPENDING  -> IDLE
//!                  -> ORGANIZING -> IDLE
//!                  -> (error)    -> caller
//! ```

use crate::catalog::{CatalogSource, Entity, EntityKeys, HttpCatalog};
use crate::config::Config;
use crate::crawler::retry::RetryPolicy;
use crate::output::{ReorganizeSummary, Reorganizer};
use crate::state::{CheckpointState, CheckpointStore, NO_PAGE};
use crate::storage::RawStore;
use crate::{HarvestError, Result};
use tokio::sync::Mutex;

/// Classification of one catalog fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStep {
    /// The page had entities
    PageFetched(Vec<Entity>),
    /// The page was empty and lies past the known minimum: the pass is complete
    EndOfCatalog,
    /// The page was empty although more pages are known to exist
    PrematureEndOfCatalog,
}

impl FetchStep {
    /// Classifies the entities returned for `page`
    pub fn classify(page: u64, entities: Vec<Entity>, minimum_known_pages: u64) -> Self {
        if !entities.is_empty() {
            Self::PageFetched(entities)
        } else if page < minimum_known_pages {
            Self::PrematureEndOfCatalog
        } else {
            Self::EndOfCatalog
        }
    }
}

/// What a completed cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A page was fetched and its entities appended to the raw store
    PageAppended { page: u64, entities: usize },
    /// The end of the catalog was reached and the dataset republished
    Reorganized {
        page: u64,
        summary: ReorganizeSummary,
    },
}

impl CycleOutcome {
    /// The persisted cursor after this cycle
    pub fn last_scraped_page(&self) -> i64 {
        match self {
            Self::PageAppended { page, .. } => *page as i64,
            Self::Reorganized { .. } => NO_PAGE,
        }
    }
}

/// Drives the incremental crawl of one catalog
///
/// Owns every piece of crawl state. Only one cycle runs at a time: a second
/// call made while a cycle is in flight fails with
/// [`HarvestError::CycleInProgress`] instead of interleaving with it.
pub struct Harvester<C> {
    catalog: C,
    checkpoints: CheckpointStore,
    raw: RawStore,
    reorganizer: Reorganizer,
    minimum_known_pages: u64,
    retry: RetryPolicy,
    in_flight: Mutex<()>,
}

impl Harvester<HttpCatalog> {
    /// Creates a harvester reading the catalog over HTTP
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = HttpCatalog::new(config.catalog.clone())?;
        Ok(Self::new(config, catalog))
    }
}

impl<C: CatalogSource> Harvester<C> {
    /// Creates a harvester over any catalog source
    pub fn new(config: &Config, catalog: C) -> Self {
        Self {
            catalog,
            checkpoints: CheckpointStore::new(&config.storage.checkpoint_path),
            raw: RawStore::new(&config.storage.raw_store_path),
            reorganizer: Reorganizer::new(
                EntityKeys::from_config(&config.harvest),
                config.harvest.page_length,
                &config.storage.published_dir,
            ),
            minimum_known_pages: config.harvest.minimum_known_pages,
            retry: RetryPolicy::from_config(&config.retry),
            in_flight: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn raw_store(&self) -> &RawStore {
        &self.raw
    }

    /// Reads the persisted checkpoint without creating or repairing it
    pub async fn checkpoint(&self) -> CheckpointState {
        self.checkpoints.peek().await
    }

    /// Runs one crawl cycle
    ///
    /// The checkpoint is only written after the raw store mutation it
    /// describes has completed, so a crash in between makes the next cycle
    /// redo the page rather than skip it.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| HarvestError::CycleInProgress)?;

        let mut state = self.checkpoints.load().await?;
        let page = state.next_page();
        tracing::info!("Scraping page {}", page);

        let entities = self.catalog.fetch_page(page).await?;

        match FetchStep::classify(page, entities, self.minimum_known_pages) {
            FetchStep::PageFetched(entities) => {
                self.raw.append(&entities).await?;
                state.last_scraped_page = page as i64;
                self.checkpoints.save(&mut state).await?;

                tracing::info!("Stored {} entities from page {}", entities.len(), page);
                Ok(CycleOutcome::PageAppended {
                    page,
                    entities: entities.len(),
                })
            }
            FetchStep::PrematureEndOfCatalog => Err(HarvestError::PrematureEndOfCatalog {
                page,
                minimum: self.minimum_known_pages,
            }),
            FetchStep::EndOfCatalog => {
                let summary = self
                    .reorganizer
                    .run(&self.raw, &self.checkpoints, &mut state)
                    .await?;
                state.last_scraped_page = NO_PAGE;
                self.checkpoints.save(&mut state).await?;

                Ok(CycleOutcome::Reorganized { page, summary })
            }
        }
    }

    /// Runs one crawl cycle under the configured retry policy
    pub async fn run_cycle_with_retry(&self) -> Result<CycleOutcome> {
        self.retry.run(|| self.run_cycle()).await
    }
}
