//! # News Scraper
//!
//! Command-line entry point. Loads the YAML configuration, wires the
//! source registry, the in-memory article store and the scrape engine
//! together, then either runs a single scrape or keeps scraping on the
//! configured interval until interrupted.
//!
//! ## Usage
//!
//! ```sh
//! news_scraper -c config.yaml --once -o ./out
//! ```
//!
//! ## Flow
//!
//! 1. **Configure**: read `config.yaml`, apply CLI overrides
//! 2. **Scrape**: run the worker pool over every active source
//! 3. **Report**: log the outcome, optionally write JSON snapshots
//! 4. **Repeat**: on the interval, when one is configured

use chrono::Utc;
use clap::Parser;
use futures::FutureExt;
use news_scraper::cli::Cli;
use news_scraper::config::load_config;
use news_scraper::models::ScrapeOutcome;
use news_scraper::outputs::json;
use news_scraper::registry::YamlSourceRegistry;
use news_scraper::scheduler::{OutcomeHandler, Scheduler, SchedulerCfg};
use news_scraper::scrapers::Scraper;
use news_scraper::store::MemoryArticleStore;
use news_scraper::utils::ensure_writable_dir;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

/// Number of articles written to the `articles.json` snapshot.
const SNAPSHOT_LIMIT: usize = 200;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_scraper starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Load config ----
    let config = match load_config(Path::new(&args.config)).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "Failed to load configuration");
            let e: Box<dyn Error> = e;
            return Err(e);
        }
    };

    let mut settings = config.scraper.clone();
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(rate_limit) = args.rate_limit {
        settings.rate_limit = rate_limit;
    }
    let scraper_config = settings.resolve();
    info!(
        config_path = %args.config,
        sources = config.sources.len(),
        workers = scraper_config.workers,
        rate_limit = scraper_config.rate_limit,
        timeout_secs = scraper_config.timeout.as_secs(),
        max_pages = scraper_config.max_pages,
        "Loaded configuration"
    );

    // Early check: ensure output dir is writable
    if let Some(dir) = &args.output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Wire the engine ----
    let store = Arc::new(MemoryArticleStore::new());
    let registry = Arc::new(YamlSourceRegistry::new(&args.config));
    let scraper = Arc::new(Scraper::new(registry, store.clone(), scraper_config)?);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; cancelling in-flight scrapes");
                shutdown.cancel();
            }
        });
    }

    let on_outcome: OutcomeHandler = {
        let store = Arc::clone(&store);
        let output_dir = args.output_dir.clone();
        Arc::new(move |outcome: ScrapeOutcome| {
            let store = Arc::clone(&store);
            let output_dir = output_dir.clone();
            async move { report_outcome(outcome, &store, output_dir.as_deref()).await }.boxed()
        })
    };

    let schedule = SchedulerCfg::from_secs(
        config.scraper.interval_secs,
        config.scraper.cleanup_interval_secs,
    );
    match schedule {
        Some(cfg) if !args.once => {
            info!(
                interval_secs = cfg.interval.as_secs(),
                cleanup_secs = cfg.cleanup_interval.map(|d| d.as_secs()),
                "Running on a schedule; Ctrl-C to stop"
            );
            Scheduler::new(scraper, store, cfg, on_outcome)
                .run(shutdown)
                .await;
        }
        _ => match scraper.run_all(shutdown.child_token()).await {
            Ok(outcome) => on_outcome(outcome).await,
            Err(e) => {
                error!(error = %e, "Scrape run failed");
                return Err(e.into());
            }
        },
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Log a finished run and, with an output directory, write its JSON
/// snapshots. Output failures are logged, never propagated.
async fn report_outcome(
    outcome: ScrapeOutcome,
    store: &MemoryArticleStore,
    output_dir: Option<&str>,
) {
    for (source_id, failure) in &outcome.errors {
        warn!(
            source_id,
            source = %failure.source_name,
            error = %failure.error,
            "Source failed during run"
        );
    }
    info!(
        attempted = outcome.sources_attempted,
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        articles_saved = outcome.articles_saved(),
        stored = store.len(),
        "Run complete"
    );

    let Some(dir) = output_dir else {
        return;
    };
    let now = Utc::now();
    if let Err(e) = json::write_articles(&store.recent(SNAPSHOT_LIMIT), dir, now).await {
        error!(error = %e, "Failed to write articles JSON");
    }
    if let Err(e) = json::write_outcome(&outcome, dir, now).await {
        error!(error = %e, "Failed to write outcome JSON");
    }
}
