//! Catalog-Harvest: an incremental catalog crawler
//!
//! This crate walks a paginated external catalog one page per cycle, appends
//! every fetched entity to a durable raw store, and once the end of the
//! catalog is reached rebuilds a deduplicated, ranked, fixed-size paginated
//! dataset ready to be served as static files.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod server;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error fetching catalog page {page}: {source}")]
    Fetch { page: u64, source: reqwest::Error },

    #[error("Catalog page {page} returned HTTP {status}")]
    UpstreamStatus { page: u64, status: u16 },

    #[error(
        "Catalog returned no entities at page {page}, but at least {minimum} pages are known to exist"
    )]
    PrematureEndOfCatalog { page: u64, minimum: u64 },

    #[error("Persistence error at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A crawl cycle is already in progress")]
    CycleInProgress,

    #[error("Page writer task failed: {0}")]
    Join(String),
}

impl HarvestError {
    /// Builds a persistence error for the given path
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Returns true if running the same cycle again may succeed
    ///
    /// Transient upstream failures, a suspicious early end of catalog and
    /// I/O failures are worth another attempt. Bad configuration, encoding
    /// failures and an overlapping cycle are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::UpstreamStatus { .. }
                | Self::PrematureEndOfCatalog { .. }
                | Self::Persistence { .. }
                | Self::Join(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CatalogSource, Entity, EntityKeys, HttpCatalog};
pub use config::Config;
pub use crawler::{CycleOutcome, FetchStep, Harvester, RetryPolicy};
pub use output::{PageMeta, PublishedPage, ReorganizeSummary};
pub use state::{CheckpointState, CheckpointStore};
pub use storage::RawStore;
