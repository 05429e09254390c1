//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest crawler.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::crawler::{run_schedule, run_scheduled_cycle, CycleOutcome, Harvester};
use catalog_harvest::server;
use catalog_harvest::state::NO_PAGE;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: an incremental catalog crawler
///
/// Walks a paginated catalog one page per cycle, keeps every fetched entity
/// in a durable raw store, and republishes a ranked, paginated dataset each
/// time the end of the catalog is reached.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version)]
#[command(about = "An incremental catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single crawl cycle (with retry) and exit
    #[arg(long, conflicts_with_all = ["status", "dry_run"])]
    once: bool,

    /// Show the checkpoint and raw store size and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    status: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["once", "status"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let harvester = Arc::new(Harvester::from_config(&config)?);

    if cli.status {
        handle_status(&harvester).await
    } else if cli.once {
        handle_once(&harvester).await
    } else {
        handle_run(config, harvester).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  First page: {}", config.catalog.page_url(0));
    println!("  Timeout: {}s", config.catalog.timeout_secs);
    println!("  User agent: {}", config.catalog.user_agent);

    println!("\nHarvest:");
    println!("  Page length: {}", config.harvest.page_length);
    println!("  Minimum known pages: {}", config.harvest.minimum_known_pages);
    println!("  Identity field: {}", config.harvest.identity_field);
    println!(
        "  Score field: {} (default {})",
        config.harvest.score_field, config.harvest.default_score
    );

    println!("\nRetry:");
    println!("  Attempts: {}", config.retry.attempts);
    println!("  Delay: {}ms", config.retry.delay_ms);

    println!("\nStorage:");
    println!("  Checkpoint: {}", config.storage.checkpoint_path.display());
    println!("  Raw store: {}", config.storage.raw_store_path.display());
    println!("  Published: {}", config.storage.published_dir.display());
    println!("  Served root: {}", config.storage.serve_root.display());

    println!("\nSchedule: every {}s", config.schedule.interval_secs);
    println!(
        "Server: {} (debug trigger {})",
        config.server.bind_address,
        if config.server.debug_trigger {
            "enabled"
        } else {
            "disabled"
        }
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: prints crawl progress
async fn handle_status<C>(harvester: &Harvester<C>) -> anyhow::Result<()>
where
    C: catalog_harvest::CatalogSource,
{
    let state = harvester.checkpoint().await;
    let raw_records = harvester.raw_store().record_count().await?;

    println!("Last scraped page: {}", state.last_scraped_page);
    println!("Next page: {}", state.next_page());
    println!("Raw records this pass: {}", raw_records);
    println!("Published entities: {}", state.total_entities);
    println!("Published pages: {}", state.total_pages);
    if let Some(updated_at) = state.updated_at {
        println!("Updated at: {}", updated_at.to_rfc3339());
    }

    Ok(())
}

/// Handles the --once mode: one retried cycle, reported on stdout
async fn handle_once<C>(harvester: &Harvester<C>) -> anyhow::Result<()>
where
    C: catalog_harvest::CatalogSource,
{
    match harvester.run_cycle_with_retry().await {
        Ok(CycleOutcome::PageAppended { page, entities }) => {
            println!("✓ Stored {} entities from page {}", entities, page);
            Ok(())
        }
        Ok(CycleOutcome::Reorganized { page, summary }) => {
            println!(
                "✓ Catalog ended at page {}: published {} entities on {} pages ({} duplicates, {} invalid records skipped)",
                page,
                summary.total_entities,
                summary.total_pages,
                summary.duplicate_records,
                summary.skipped_records
            );
            println!("  Cursor reset to {}", NO_PAGE);
            Ok(())
        }
        Err(e) => {
            let cursor = harvester.checkpoint().await.last_scraped_page;
            tracing::error!("Scrape failed at cursor {}: {}", cursor, e);
            Err(e.into())
        }
    }
}

/// Handles the default mode: crawl on a schedule and serve the published pages
async fn handle_run(
    config: Config,
    harvester: Arc<Harvester<catalog_harvest::HttpCatalog>>,
) -> anyhow::Result<()> {
    run_scheduled_cycle(&harvester).await;

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let stopped = |mut rx: tokio::sync::watch::Receiver<bool>| async move {
        let _ = rx.wait_for(|stop| *stop).await;
    };

    let schedule = tokio::spawn(run_schedule(
        harvester.clone(),
        config.schedule.interval(),
        stopped(stop_rx.clone()),
    ));

    let app = server::router(
        harvester,
        &config.storage.serve_root,
        config.server.debug_trigger,
    );
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    let server = tokio::spawn(server::serve(listener, app, stopped(stop_rx)));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    let _ = stop_tx.send(true);

    schedule.await?;
    server.await??;

    Ok(())
}
