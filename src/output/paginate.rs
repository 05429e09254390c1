use crate::catalog::Entity;
use serde::{Deserialize, Serialize};

/// Pagination metadata carried by every published page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// 1-based page number
    pub page: u64,
    /// 1-based global rank of the first entity on the page
    pub start: u64,
    /// 1-based global rank of the last entity on the page
    pub end: u64,
    pub total_entities: u64,
    pub total_pages: u64,
}

/// A published page as read back by consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPage {
    pub meta: PageMeta,
    pub data: Vec<Entity>,
}

/// Number of pages needed for `total` entities
pub fn page_count(total: u64, page_length: usize) -> u64 {
    total.div_ceil(page_length.max(1) as u64)
}

/// Splits a ranked list into fixed-size pages
///
/// Every chunk holds `page_length` entities except possibly the last. The
/// returned sequence is finite and can be recomputed at will.
pub fn paginate(entities: &[Entity], page_length: usize) -> Vec<(PageMeta, &[Entity])> {
    let page_length = page_length.max(1);
    let total_entities = entities.len() as u64;
    let total_pages = page_count(total_entities, page_length);

    entities
        .chunks(page_length)
        .enumerate()
        .map(|(index, chunk)| {
            let start = (index * page_length) as u64 + 1;
            let meta = PageMeta {
                page: index as u64 + 1,
                start,
                end: start + chunk.len() as u64 - 1,
                total_entities,
                total_pages,
            };
            (meta, chunk)
        })
        .collect()
}
