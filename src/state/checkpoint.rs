//! Durable crawl checkpoint
//!
//! The checkpoint is a small JSON document holding the crawl cursor and the
//! totals of the last completed reorganization. It is read at the start of
//! every cycle and rewritten after every successful step.

use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Cursor value meaning "no page of the current pass has been consumed"
pub const NO_PAGE: i64 = -1;

/// Persisted crawl progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    /// Index of the last catalog page consumed in the current pass
    #[serde(default = "no_page")]
    pub last_scraped_page: i64,

    /// Unique entities published by the last reorganization
    #[serde(default)]
    pub total_entities: u64,

    /// Pages published by the last reorganization
    #[serde(default)]
    pub total_pages: u64,

    /// When this checkpoint was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn no_page() -> i64 {
    NO_PAGE
}

impl Default for CheckpointState {
    fn default() -> Self {
        Self {
            last_scraped_page: NO_PAGE,
            total_entities: 0,
            total_pages: 0,
            updated_at: None,
        }
    }
}

impl CheckpointState {
    /// Index of the page the next cycle will fetch
    pub fn next_page(&self) -> u64 {
        (self.last_scraped_page.max(NO_PAGE) + 1) as u64
    }

    /// Returns true if no page of the current pass has been consumed yet
    pub fn is_pass_start(&self) -> bool {
        self.last_scraped_page <= NO_PAGE
    }
}

/// Reads and writes the checkpoint file
///
/// The store holds no lock of its own; callers guarantee a single writer.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, failing open
    ///
    /// A missing, unreadable or corrupt checkpoint is replaced with the
    /// defaults, which are persisted before returning. Only a failure to
    /// write those defaults is reported as an error.
    pub async fn load(&self) -> Result<CheckpointState> {
        if let Some(state) = self.read().await {
            return Ok(state);
        }

        let mut state = CheckpointState::default();
        self.save(&mut state).await?;
        Ok(state)
    }

    /// Reads the checkpoint without ever writing it
    ///
    /// Falls back to the defaults in the same cases as [`load`](Self::load),
    /// but leaves the file system untouched.
    pub async fn peek(&self) -> CheckpointState {
        self.read().await.unwrap_or_default()
    }

    async fn read(&self) -> Option<CheckpointState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<CheckpointState>(&content) {
                Ok(state) if state.last_scraped_page >= NO_PAGE => return Some(state),
                Ok(state) => {
                    tracing::warn!(
                        "Checkpoint {} has invalid cursor {}, resetting",
                        self.path.display(),
                        state.last_scraped_page
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Checkpoint {} is corrupt ({}), resetting",
                        self.path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No checkpoint at {}", self.path.display());
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint {} ({}), resetting",
                    self.path.display(),
                    e
                );
            }
        }
        None
    }

    /// Persists the checkpoint
    ///
    /// The document is written to a sibling temporary file, synced to disk
    /// and renamed over the checkpoint, so a crash or power loss leaves
    /// either the old or the new state.
    pub async fn save(&self, state: &mut CheckpointState) -> Result<()> {
        state.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HarvestError::persistence(parent, e))?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| HarvestError::persistence(&tmp, e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| HarvestError::persistence(&tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| HarvestError::persistence(&tmp, e))?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HarvestError::persistence(&self.path, e))?;

        tracing::debug!(
            "Saved checkpoint: last page {}, {} entities, {} pages",
            state.last_scraped_page,
            state.total_entities,
            state.total_pages
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
