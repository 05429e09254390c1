//! Storage module for persisting fetched entities
//!
//! The raw store is the only durable copy of a pass in progress. It is
//! appended to once per fetched page and consumed by the reorganization
//! pipeline at the end of the pass.

mod raw_store;

pub use raw_store::RawStore;
pub(crate) use raw_store::is_blank;
