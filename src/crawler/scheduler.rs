//! Periodic trigger for crawl cycles
//!
//! Runs one cycle (with retry) per tick. Ticks never overlap: a slow cycle
//! makes the scheduler skip the ticks it missed rather than queue them, and
//! the harvester's own single-flight guard rejects anything that slips past.

use crate::catalog::CatalogSource;
use crate::crawler::coordinator::{CycleOutcome, Harvester};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs a crawl cycle every `period` until `shutdown` resolves
///
/// The first cycle runs one full period after the call. Failures are logged
/// and never stop the schedule.
pub async fn run_schedule<C, S>(harvester: Arc<Harvester<C>>, period: Duration, shutdown: S)
where
    C: CatalogSource,
    S: Future<Output = ()>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!("Scheduled a crawl cycle every {:?}", period);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Scheduler stopped");
                return;
            }
            _ = ticker.tick() => {
                run_scheduled_cycle(&harvester).await;
            }
        }
    }
}

/// Runs one retried cycle, logging instead of propagating the outcome
pub async fn run_scheduled_cycle<C: CatalogSource>(harvester: &Harvester<C>) {
    match harvester.run_cycle_with_retry().await {
        Ok(CycleOutcome::PageAppended { page, entities }) => {
            tracing::debug!("Scheduled cycle stored page {} ({} entities)", page, entities);
        }
        Ok(CycleOutcome::Reorganized { summary, .. }) => {
            tracing::info!(
                "Scheduled cycle published {} entities on {} pages",
                summary.total_entities,
                summary.total_pages
            );
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
        }
    }
}
