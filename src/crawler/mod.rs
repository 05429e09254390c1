//! Crawler module for the incremental catalog crawl
//!
//! This module contains the core crawling logic, including:
//! - The per-cycle crawl state machine
//! - Bounded retry around a cycle
//! - The periodic trigger that drives cycles

mod coordinator;
mod retry;
mod scheduler;

pub use coordinator::{CycleOutcome, FetchStep, Harvester};
pub use retry::RetryPolicy;
pub use scheduler::{run_schedule, run_scheduled_cycle};
