use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Builds a configuration with every section at its default, pointed at `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            catalog: CatalogConfig {
                base_url: base_url.into(),
                page_path: default_page_path(),
                timeout_secs: default_timeout_secs(),
                user_agent: default_user_agent(),
            },
            harvest: HarvestConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            schedule: ScheduleConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Upstream catalog location and HTTP behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path appended to the base URL; `{page}` is replaced with the page index
    #[serde(rename = "page-path", default = "default_page_path")]
    pub page_path: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every catalog request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl CatalogConfig {
    /// Renders the URL of a single catalog page
    pub fn page_url(&self, page: u64) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.page_path.replace("{page}", &page.to_string())
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Reorganization and end-of-catalog behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Number of entities per published page
    #[serde(rename = "page-length", default = "default_page_length")]
    pub page_length: usize,

    /// An empty catalog page below this index is treated as an upstream glitch
    #[serde(rename = "minimum-known-pages", default = "default_minimum_known_pages")]
    pub minimum_known_pages: u64,

    /// JSON pointer to the entity identity
    #[serde(rename = "identity-field", default = "default_identity_field")]
    pub identity_field: String,

    /// JSON pointer to the entity ranking score
    #[serde(rename = "score-field", default = "default_score_field")]
    pub score_field: String,

    /// Score used for entities without a numeric score
    #[serde(rename = "default-score", default = "default_score")]
    pub default_score: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_length: default_page_length(),
            minimum_known_pages: default_minimum_known_pages(),
            identity_field: default_identity_field(),
            score_field: default_score_field(),
            default_score: default_score(),
        }
    }
}

/// Retry policy applied around each scheduled crawl cycle
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per cycle (including the first)
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "delay-ms", default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

/// On-disk locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON checkpoint file
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Path to the newline-delimited raw entity store
    #[serde(rename = "raw-store-path", default = "default_raw_store_path")]
    pub raw_store_path: PathBuf,

    /// Directory receiving the published pages
    #[serde(rename = "published-dir", default = "default_published_dir")]
    pub published_dir: PathBuf,

    /// Directory exposed over HTTP
    #[serde(rename = "serve-root", default = "default_serve_root")]
    pub serve_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            raw_store_path: default_raw_store_path(),
            published_dir: default_published_dir(),
            serve_root: default_serve_root(),
        }
    }
}

/// Periodic trigger
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between crawl cycles
    #[serde(rename = "interval-secs", default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// HTTP server for the published pages
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,

    /// Exposes `GET /scrape` to run a cycle on demand
    #[serde(rename = "debug-trigger", default)]
    pub debug_trigger: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            debug_trigger: false,
        }
    }
}

fn default_page_path() -> String {
    "/shows?page={page}".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("catalog-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_page_length() -> usize {
    25
}

fn default_minimum_known_pages() -> u64 {
    342
}

fn default_identity_field() -> String {
    "/id".to_string()
}

fn default_score_field() -> String {
    "/rating/average".to_string()
}

fn default_score() -> f64 {
    5.0
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./data/state.json")
}

fn default_raw_store_path() -> PathBuf {
    PathBuf::from("./data/shows.jsonl")
}

fn default_published_dir() -> PathBuf {
    PathBuf::from("./scraped/most-popular")
}

fn default_serve_root() -> PathBuf {
    PathBuf::from("./scraped")
}

fn default_interval_secs() -> u64 {
    600
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}
