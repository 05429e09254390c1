//! Output module for the published dataset
//!
//! This module handles:
//! - Splitting the ranked entity list into fixed-size pages
//! - Rebuilding the published directory from the raw store at the end of a pass

mod paginate;
mod reorganize;

pub use paginate::{page_count, paginate, PageMeta, PublishedPage};
pub use reorganize::{published_page_path, ReorganizeSummary, Reorganizer};
