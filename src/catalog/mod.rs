//! Catalog module: the upstream page source and the entities it returns
//!
//! The crawler only ever asks the catalog for one page at a time. Anything
//! that can answer "what is on page N" implements [`CatalogSource`]; the
//! production implementation is [`HttpCatalog`].

mod entity;
mod fetcher;

pub use entity::{Entity, EntityKeys};
pub use fetcher::{build_http_client, HttpCatalog};

use crate::Result;
use async_trait::async_trait;

/// A paginated catalog of entities
///
/// Implementations must be idempotent from the crawler's point of view:
/// fetching the same page twice returns the same entities. An empty page
/// means the catalog has no page at that index.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches the entities on the given zero-based page
    async fn fetch_page(&self, page: u64) -> Result<Vec<Entity>>;
}
