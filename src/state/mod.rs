//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CheckpointState`: the crawl cursor plus the totals of the last publish
//! - `CheckpointStore`: fail-open load and atomic save of that state

mod checkpoint;

pub use checkpoint::{CheckpointState, CheckpointStore, NO_PAGE};
