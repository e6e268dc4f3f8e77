//! Periodic scrape trigger and store cleanup.
//!
//! Every tick of the run interval starts an independent run on its own
//! task with a child of the shutdown token. A slow run does not delay the
//! next tick, so runs may overlap. A second, optional interval clears the
//! article store.
//!
//! When the shutdown token fires, no further runs start; the scheduler
//! then waits for the in-flight runs, which stop at their next suspension
//! point.

use crate::models::ScrapeOutcome;
use crate::scrapers::Scraper;
use crate::store::MemoryArticleStore;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Callback invoked with the outcome of every completed run.
pub type OutcomeHandler = Arc<dyn Fn(ScrapeOutcome) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
    /// `None` never clears the store.
    pub cleanup_interval: Option<Duration>,
}

impl SchedulerCfg {
    /// Build from the config file's second counts. Returns `None` when
    /// `interval_secs` is zero (single-run mode).
    pub fn from_secs(interval_secs: u64, cleanup_interval_secs: u64) -> Option<Self> {
        (interval_secs > 0).then(|| Self {
            interval: Duration::from_secs(interval_secs),
            cleanup_interval: (cleanup_interval_secs > 0)
                .then(|| Duration::from_secs(cleanup_interval_secs)),
        })
    }
}

pub struct Scheduler {
    scraper: Arc<Scraper>,
    store: Arc<MemoryArticleStore>,
    cfg: SchedulerCfg,
    on_outcome: OutcomeHandler,
}

impl Scheduler {
    pub fn new(
        scraper: Arc<Scraper>,
        store: Arc<MemoryArticleStore>,
        cfg: SchedulerCfg,
        on_outcome: OutcomeHandler,
    ) -> Self {
        Self {
            scraper,
            store,
            cfg,
            on_outcome,
        }
    }

    /// Run the schedule on a background task until `shutdown` fires.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(interval_secs = self.cfg.interval.as_secs())
    )]
    pub async fn run(self, shutdown: CancellationToken) {
        let mut runs = time::interval(self.cfg.interval);
        runs.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cleanup = self.cfg.cleanup_interval.map(|period| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        let mut in_flight = JoinSet::new();

        info!("Scheduler started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = runs.tick() => self.trigger(&mut in_flight, &shutdown),
                _ = tick(&mut cleanup) => {
                    self.store.clear();
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Scheduled run task failed");
                    }
                }
            }
        }

        info!(in_flight = in_flight.len(), "Scheduler stopping; waiting for runs");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Scheduled run task failed");
            }
        }
        info!("Scheduler stopped");
    }

    fn trigger(&self, in_flight: &mut JoinSet<()>, shutdown: &CancellationToken) {
        let scraper = Arc::clone(&self.scraper);
        let on_outcome = Arc::clone(&self.on_outcome);
        let cancel = shutdown.child_token();
        info!(in_flight = in_flight.len(), "Triggering scheduled run");
        in_flight.spawn(async move {
            match scraper.run_all(cancel).await {
                Ok(outcome) => on_outcome(outcome).await,
                Err(e) => error!(error = %e, "Scheduled run failed"),
            }
        });
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
