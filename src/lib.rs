//! # News Scraper
//!
//! A concurrent scraping engine for news websites. Each configured source is
//! a listing page plus CSS selectors; a run fetches every active source
//! through a fixed worker pool under one shared request-rate limit, pulls
//! out article titles, links and summaries, tags each article with a
//! category and upserts it by URL into an article store.
//!
//! ## Layout
//!
//! - [`scrapers`]: the engine (rate limiter, fetcher, extractor,
//!   classifier, orchestrator)
//! - [`registry`] and [`store`]: the collaborators a run reads sources from
//!   and saves articles to
//! - [`scheduler`]: periodic runs and store cleanup
//! - [`config`], [`outputs`], [`models`], [`error`], [`utils`]
//!
//! ## Example
//!
//! ```no_run
//! use news_scraper::config::ScraperConfig;
//! use news_scraper::registry::YamlSourceRegistry;
//! use news_scraper::scrapers::Scraper;
//! use news_scraper::store::MemoryArticleStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryArticleStore::new());
//! let scraper = Scraper::new(
//!     Arc::new(YamlSourceRegistry::new("config.yaml")),
//!     store.clone(),
//!     ScraperConfig::default(),
//! )?;
//! let outcome = scraper.run_all(CancellationToken::new()).await?;
//! println!("{} saved, {} sources failed", outcome.articles_saved(), outcome.failed());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod registry;
pub mod scheduler;
pub mod scrapers;
pub mod store;
pub mod utils;
