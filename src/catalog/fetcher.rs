//! HTTP catalog implementation
//!
//! This module handles all HTTP requests to the upstream catalog, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Mapping HTTP statuses onto catalog semantics
//! - Decoding a page body into entities

use crate::catalog::{CatalogSource, Entity};
use crate::config::CatalogConfig;
use crate::{ConfigError, HarvestError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Builds an HTTP client for catalog requests
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::Config;
/// use catalog_harvest::catalog::build_http_client;
///
/// let config = Config::with_base_url("https://api.tvmaze.com");
/// let client = build_http_client(&config.catalog).unwrap();
/// ```
pub fn build_http_client(config: &CatalogConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Catalog reached over HTTP, one JSON array per page
///
/// # Status Handling
///
/// | Response | Result |
/// |----------|--------|
/// | 2xx with JSON array | entities on the page |
/// | 404 | empty page (past the end of the catalog) |
/// | other status | `UpstreamStatus` |
/// | transport / decode failure | `Fetch` |
pub struct HttpCatalog {
    client: Client,
    config: CatalogConfig,
}

impl HttpCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = build_http_client(&config).map_err(ConfigError::HttpClient)?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch_page(&self, page: u64) -> Result<Vec<Entity>> {
        let url = self.config.page_url(page);
        tracing::debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| HarvestError::Fetch { page, source })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Catalog page {} not found, treating as empty", page);
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(HarvestError::UpstreamStatus {
                page,
                status: status.as_u16(),
            });
        }

        let entities: Vec<Entity> = response
            .json()
            .await
            .map_err(|source| HarvestError::Fetch { page, source })?;

        tracing::debug!("Catalog page {} returned {} entities", page, entities.len());
        Ok(entities)
    }
}
