//! Newline-delimited raw entity store
//!
//! Every fetched entity is appended as one JSON line. The file only grows
//! during a pass and is removed once a reorganization has published it.

use crate::catalog::Entity;
use crate::{HarvestError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Split};

/// Append-only JSON-lines file of fetched entities
#[derive(Debug, Clone)]
pub struct RawStore {
    path: PathBuf,
}

impl RawStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the entities to the end of the store
    ///
    /// The whole batch is encoded up front and written with a single append,
    /// then synced, so a page is either fully on disk or the call fails.
    pub async fn append(&self, entities: &[Entity]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for entity in entities {
            serde_json::to_writer(&mut buf, entity)?;
            buf.push(b'\n');
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HarvestError::persistence(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        file.write_all(&buf).await.map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;

        Ok(())
    }

    /// Opens the store for record-by-record reading
    ///
    /// Records are yielded as raw bytes without the trailing newline, so a
    /// line that is not valid UTF-8 surfaces as a malformed record rather
    /// than a read failure. Returns `None` when the store does not exist yet.
    pub async fn records(&self) -> Result<Option<Split<BufReader<File>>>> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(BufReader::new(file).split(b'\n'))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Counts the non-blank records currently in the store
    pub async fn record_count(&self) -> Result<u64> {
        let Some(mut records) = self.records().await? else {
            return Ok(0);
        };

        let mut count = 0;
        while let Some(record) = records
            .next_segment()
            .await
            .map_err(|e| self.io_error(e))?
        {
            if !is_blank(&record) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Deletes the store; a missing store is not an error
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub(crate) fn io_error(&self, source: std::io::Error) -> HarvestError {
        HarvestError::persistence(&self.path, source)
    }
}

/// Returns true for records holding nothing but whitespace
pub(crate) fn is_blank(record: &[u8]) -> bool {
    record.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entity(id: u64) -> Entity {
        Entity::new(json!({"id": id, "name": format!("Show {}", id)}))
    }

    #[tokio::test]
    async fn test_append_accumulates_records() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path().join("data").join("shows.jsonl"));

        store.append(&[entity(1), entity(2)]).await.unwrap();
        store.append(&[entity(3)]).await.unwrap();

        assert_eq!(store.record_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_append_preserves_fetch_order() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path().join("shows.jsonl"));

        store.append(&[entity(9), entity(4)]).await.unwrap();
        store.append(&[entity(7)]).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let ids: Vec<u64> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![9, 4, 7]);
    }

    #[tokio::test]
    async fn test_empty_append_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path().join("shows.jsonl"));

        store.append(&[]).await.unwrap();

        assert!(!store.path().exists());
        assert_eq!(store.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_on_missing_store() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path().join("missing.jsonl"));
        assert!(store.records().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path().join("shows.jsonl"));

        store.append(&[entity(1)]).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(!store.path().exists());
        assert_eq!(store.record_count().await.unwrap(), 0);
    }
}
