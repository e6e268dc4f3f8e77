//! The scraping engine.
//!
//! Every source goes through the same pipeline; only its selectors differ.
//!
//! | Stage | Module | Notes |
//! |-------|--------|-------|
//! | Admission | [`rate_limit`] | One token bucket per run, shared by all workers |
//! | Fetch | [`fetch`] | User agent, timeout, pagination, domain confinement, disk cache |
//! | Extract | [`extract`] | CSS selectors, absolute URLs, document order |
//! | Classify | [`classify`] | Ordered keyword rules, first match wins |
//! | Orchestrate | [`orchestrator`] | Worker pool, per-source outcome |
//!
//! Failures are graceful: a broken source is recorded in the run outcome and
//! the other sources carry on.

pub mod classify;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod rate_limit;

pub use classify::classify;
pub use extract::SourceSelectors;
pub use fetch::PageFetcher;
pub use orchestrator::Scraper;
pub use rate_limit::RateLimiter;
