//! The scrape run: source list, worker pool, aggregation.
//!
//! [`Scraper::run_all`] asks the registry for the active sources, queues
//! them all on a channel sized to the source count and starts exactly `W`
//! workers. Each worker pulls one source at a time and runs the pipeline
//!
//! ```text
//! rate-limit wait → fetch (all pages) → extract → classify → save
//! ```
//!
//! A fetch-stage failure ends that source and is reported against it; a
//! save failure is logged and counted, and the worker carries on with the
//! next article. Once the queue is closed and every worker has exited, the
//! per-source results are drained into a [`ScrapeOutcome`].
//!
//! Runs share nothing but the HTTP client and the collaborators. Each run
//! gets its own [`RateLimiter`], and two runs may overlap.

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::models::{
    ArticleRecord, CategorizedArticle, ScrapeOutcome, Source, SourceFailure, SourceId, SourceReport,
};
use crate::registry::SourceRegistry;
use crate::scrapers::classify::classify;
use crate::scrapers::extract::SourceSelectors;
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::rate_limit::RateLimiter;
use crate::store::ArticleSink;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Result of one source, sent from a worker to the aggregator.
struct SourceResult {
    source_id: SourceId,
    source_name: String,
    result: Result<SourceReport, ScrapeError>,
}

/// State shared by the workers of one run.
struct RunContext {
    fetcher: PageFetcher,
    limiter: RateLimiter,
    sink: Arc<dyn ArticleSink>,
    cancel: CancellationToken,
}

/// Scrape engine. Holds the collaborators and the validated settings; cheap
/// to share behind an [`Arc`] between a scheduler and ad-hoc triggers.
pub struct Scraper {
    registry: Arc<dyn SourceRegistry>,
    sink: Arc<dyn ArticleSink>,
    config: ScraperConfig,
    fetcher: PageFetcher,
}

impl Scraper {
    /// Build the engine and its HTTP client.
    ///
    /// A zero worker count or rate is raised to one.
    ///
    /// # Errors
    ///
    /// Fails if the client cannot be built or the cache directory cannot be
    /// created.
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        sink: Arc<dyn ArticleSink>,
        mut config: ScraperConfig,
    ) -> Result<Self, ScrapeError> {
        if config.workers == 0 || config.rate_limit == 0 {
            warn!(
                workers = config.workers,
                rate_limit = config.rate_limit,
                "Zero worker count or rate; using one"
            );
            config.workers = config.workers.max(1);
            config.rate_limit = config.rate_limit.max(1);
        }
        let mut fetcher = PageFetcher::new(&config.user_agent, config.timeout)?
            .with_max_pages(config.max_pages);
        if let Some(dir) = &config.cache_dir {
            fetcher = fetcher.with_cache_dir(dir)?;
        }
        Ok(Self {
            registry,
            sink,
            config,
            fetcher,
        })
    }

    /// Run one scrape over every active source.
    ///
    /// Only a failure to list sources is returned as an error. Everything
    /// that goes wrong with an individual source ends up in
    /// [`ScrapeOutcome::errors`].
    #[instrument(
        level = "info",
        skip_all,
        fields(workers = self.config.workers, rate_limit = self.config.rate_limit)
    )]
    pub async fn run_all(&self, cancel: CancellationToken) -> Result<ScrapeOutcome, ScrapeError> {
        let started = Instant::now();
        let sources = self
            .registry
            .active_sources(&cancel)
            .await
            .map_err(ScrapeError::SourceListUnavailable)?;

        let total = sources.len();
        let mut outcome = ScrapeOutcome {
            sources_attempted: total,
            ..Default::default()
        };
        if total == 0 {
            info!("No active sources; nothing to scrape");
            return Ok(outcome);
        }
        info!(sources = total, workers = self.config.workers, "Starting scrape run");

        // Both channels hold every source, so neither the dispatch loop nor a
        // worker reporting a result can block.
        let (job_tx, job_rx) = mpsc::channel::<Source>(total);
        let (result_tx, mut result_rx) = mpsc::channel::<SourceResult>(total);
        for source in sources {
            if job_tx.send(source).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let jobs = Arc::new(Mutex::new(job_rx));
        let ctx = Arc::new(RunContext {
            fetcher: self.fetcher.clone(),
            limiter: RateLimiter::new(self.config.rate_limit),
            sink: Arc::clone(&self.sink),
            cancel,
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.workers {
            workers.spawn(worker(
                worker_id,
                Arc::clone(&jobs),
                result_tx.clone(),
                Arc::clone(&ctx),
            ));
        }
        drop(result_tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed");
            }
        }

        while let Some(SourceResult {
            source_id,
            source_name,
            result,
        }) = result_rx.recv().await
        {
            match result {
                Ok(report) => {
                    outcome.reports.insert(source_id, report);
                }
                Err(error) => {
                    outcome.errors.insert(
                        source_id,
                        SourceFailure {
                            source_name,
                            error,
                        },
                    );
                }
            }
        }

        info!(
            attempted = outcome.sources_attempted,
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            articles_saved = outcome.articles_saved(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape run finished"
        );
        Ok(outcome)
    }

    /// Start a run on its own task.
    ///
    /// The run's lifetime is tied only to `cancel`, not to the caller: an
    /// HTTP handler or timer can fire this and return immediately.
    pub fn spawn_run(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<ScrapeOutcome, ScrapeError>> {
        let scraper = Arc::clone(self);
        tokio::spawn(async move { scraper.run_all(cancel).await })
    }
}

async fn worker(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Source>>>,
    results: mpsc::Sender<SourceResult>,
    ctx: Arc<RunContext>,
) {
    loop {
        let next = { jobs.lock().await.recv().await };
        let Some(source) = next else {
            debug!(worker = worker_id, "Job queue drained; worker exiting");
            break;
        };
        info!(worker = worker_id, source = %source.name, url = %source.url, "Picked up source");

        let result = scrape_source(&source, &ctx).await;
        if let Err(e) = &result {
            warn!(worker = worker_id, source = %source.name, error = %e, "Source failed");
        }

        let message = SourceResult {
            source_id: source.id,
            source_name: source.name,
            result,
        };
        if results.send(message).await.is_err() {
            error!(worker = worker_id, "Result channel closed early");
            break;
        }
    }
}

async fn scrape_source(source: &Source, ctx: &RunContext) -> Result<SourceReport, ScrapeError> {
    if ctx.cancel.is_cancelled() {
        return Err(ScrapeError::Cancelled);
    }
    let selectors = SourceSelectors::compile(source)?;
    let fetched = ctx
        .fetcher
        .fetch_source(source, &selectors, &ctx.limiter, &ctx.cancel)
        .await?;

    let mut report = SourceReport {
        source_name: source.name.clone(),
        pages: fetched.pages,
        articles_found: fetched.articles.len(),
        ..Default::default()
    };
    info!(source = %source.name, articles = report.articles_found, pages = report.pages, "Found articles");

    for article in fetched.articles {
        let category = classify(
            &article.title,
            &article.summary,
            &article.url,
            &source.default_category,
        );
        let record = ArticleRecord::new(source, CategorizedArticle { article, category });
        match ctx.sink.save(&ctx.cancel, &record).await {
            Ok(()) => report.articles_saved += 1,
            Err(e) => {
                let e = ScrapeError::Save(e);
                warn!(source = %source.name, url = %record.url, error = %e, "Failed to save article");
                report.save_failures += 1;
            }
        }
    }

    Ok(report)
}
