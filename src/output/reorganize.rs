//! End-of-pass reorganization
//!
//! Turns the raw store of a completed pass into the published dataset:
//!
//! 1. Stream the raw store, skipping malformed records
//! 2. Deduplicate by entity identity (first occurrence wins)
//! 3. Persist the new totals to the checkpoint
//! 4. Rank by score, descending
//! 5. Split into fixed-size pages
//! 6. Replace the published directory with the new pages
//! 7. Clear the raw store
//!
//! The raw store is only cleared once every page is on disk. Any failure
//! before that leaves the raw store untouched, and rerunning on the same
//! input produces identical pages.

use crate::catalog::{Entity, EntityKeys};
use crate::output::paginate::{page_count, paginate, PageMeta};
use crate::state::{CheckpointState, CheckpointStore};
use crate::storage::{is_blank, RawStore};
use crate::{HarvestError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// Outcome of one reorganization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorganizeSummary {
    /// Unique entities published
    pub total_entities: u64,
    /// Pages published
    pub total_pages: u64,
    /// Raw records that could not be parsed
    pub skipped_records: u64,
    /// Raw records dropped as repeats of an earlier identity
    pub duplicate_records: u64,
}

/// Borrowing form of [`PublishedPage`](crate::output::PublishedPage) used for writing
#[derive(Serialize)]
struct PageDocument<'a> {
    meta: &'a PageMeta,
    data: &'a [Entity],
}

/// Path of a published page file
pub fn published_page_path(dir: &Path, page: u64) -> PathBuf {
    dir.join(format!("{}.json", page))
}

/// Rebuilds the published dataset from the raw store
#[derive(Debug, Clone)]
pub struct Reorganizer {
    keys: EntityKeys,
    page_length: usize,
    published_dir: PathBuf,
}

impl Reorganizer {
    pub fn new(keys: EntityKeys, page_length: usize, published_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys,
            page_length,
            published_dir: published_dir.into(),
        }
    }

    pub fn published_dir(&self) -> &Path {
        &self.published_dir
    }

    /// Runs the full pipeline
    ///
    /// `state` receives the new totals and is saved through `checkpoints`
    /// before anything is published. The cursor in `state` is left as is;
    /// resetting it is the caller's job once this returns successfully.
    pub async fn run(
        &self,
        raw: &RawStore,
        checkpoints: &CheckpointStore,
        state: &mut CheckpointState,
    ) -> Result<ReorganizeSummary> {
        tracing::info!("Reached end of catalog, organising data...");

        let Some((ranked, skipped_records, duplicate_records)) = self.load_unique(raw).await?
        else {
            tracing::warn!(
                "Raw store {} does not exist, keeping the current publication",
                raw.path().display()
            );
            return Ok(ReorganizeSummary {
                total_entities: state.total_entities,
                total_pages: state.total_pages,
                skipped_records: 0,
                duplicate_records: 0,
            });
        };

        let total_entities = ranked.len() as u64;
        let total_pages = page_count(total_entities, self.page_length);
        state.total_entities = total_entities;
        state.total_pages = total_pages;
        checkpoints.save(state).await?;

        let ranked = self.rank(ranked);
        self.publish(&ranked).await?;

        raw.clear().await?;

        tracing::info!(
            "Finished organising data: {} entities on {} pages ({} duplicates, {} skipped)",
            total_entities,
            total_pages,
            duplicate_records,
            skipped_records
        );

        Ok(ReorganizeSummary {
            total_entities,
            total_pages,
            skipped_records,
            duplicate_records,
        })
    }

    /// Streams the raw store, keeping the first occurrence of each identity
    ///
    /// Returns the unique entities in fetch order, with the number of
    /// malformed and duplicate records encountered, or `None` when there is
    /// no raw store at all.
    async fn load_unique(&self, raw: &RawStore) -> Result<Option<(Vec<Entity>, u64, u64)>> {
        let Some(mut records) = raw.records().await? else {
            return Ok(None);
        };

        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped = 0u64;
        let mut duplicates = 0u64;

        let mut line_number = 0u64;
        while let Some(record) = records.next_segment().await.map_err(|e| raw.io_error(e))? {
            line_number += 1;
            if is_blank(&record) {
                continue;
            }

            let entity: Entity = match serde_json::from_slice(&record) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!(
                        "Skipping invalid record on line {} of {}: {}",
                        line_number,
                        raw.path().display(),
                        e
                    );
                    skipped += 1;
                    continue;
                }
            };

            if seen.insert(self.keys.dedup_key(&entity)) {
                unique.push(entity);
            } else {
                duplicates += 1;
            }
        }

        Ok(Some((unique, skipped, duplicates)))
    }

    /// Sorts by score, highest first; equal scores keep fetch order
    fn rank(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let mut scored: Vec<(f64, Entity)> = entities
            .into_iter()
            .map(|entity| (self.keys.score(&entity), entity))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, entity)| entity).collect()
    }

    /// Replaces the published directory with freshly written pages
    ///
    /// Pages are written concurrently; this returns only after every write
    /// has finished, or with the first failure.
    async fn publish(&self, ranked: &[Entity]) -> Result<()> {
        let dir = &self.published_dir;

        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(HarvestError::persistence(dir, e)),
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| HarvestError::persistence(dir, e))?;

        let mut writers = JoinSet::new();
        for (meta, data) in paginate(ranked, self.page_length) {
            let body = serde_json::to_vec(&PageDocument { meta: &meta, data })?;
            let path = published_page_path(dir, meta.page);
            writers.spawn(async move {
                tokio::fs::write(&path, body)
                    .await
                    .map_err(|e| HarvestError::persistence(path, e))
            });
        }

        while let Some(joined) = writers.join_next().await {
            joined.map_err(|e| HarvestError::Join(e.to_string()))??;
        }

        Ok(())
    }
}
