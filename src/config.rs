//! YAML configuration: scraper settings and the source list.
//!
//! ```yaml
//! scraper:
//!   workers: 5
//!   timeout_secs: 30
//!   rate_limit: 10
//!   user_agent: "NewsScraper/1.0"
//!   max_pages: 1
//!   cache_dir: /var/cache/news_scraper
//!   interval_secs: 1800
//!   cleanup_interval_secs: 7200
//! sources:
//!   - id: 1
//!     name: Example
//!     url: https://example.com/news
//!     selector_title: "h2.title"
//!     selector_link: "h2.title a"
//!     selector_summary: "p.summary"
//!     default_category: general
//!     active: true
//! ```
//!
//! Every scraper key is optional. Values are validated minimally: a
//! non-positive number or an empty user agent falls back to the default
//! instead of failing the load.

use crate::error::BoxError;
use crate::models::Source;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT: u32 = 10;
pub const DEFAULT_USER_AGENT: &str = "NewsScraper/1.0";

/// The configuration file as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Raw scraper settings. Numbers are signed so that zero or negative
/// values can be detected and replaced by defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub workers: i64,
    pub timeout_secs: i64,
    pub rate_limit: i64,
    pub user_agent: String,
    pub max_pages: i64,
    pub cache_dir: Option<PathBuf>,
    /// Seconds between scheduled runs; zero runs once.
    pub interval_secs: u64,
    /// Seconds between store cleanups; zero never clears.
    pub cleanup_interval_secs: u64,
}

/// Validated settings consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Worker pool size (`W`).
    pub workers: usize,
    /// Overall per-request timeout.
    pub timeout: Duration,
    /// Requests per second (`R`), shared across all workers of a run.
    pub rate_limit: u32,
    pub user_agent: String,
    /// Pages per source, including the first.
    pub max_pages: usize,
    pub cache_dir: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            rate_limit: DEFAULT_RATE_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: 1,
            cache_dir: None,
        }
    }
}

impl ScraperConfig {
    /// Build a config from possibly invalid values, replacing non-positive
    /// numbers and a blank user agent with defaults.
    pub fn sanitized(
        workers: i64,
        rate_limit: i64,
        timeout_secs: i64,
        user_agent: &str,
    ) -> Self {
        let defaults = Self::default();
        let workers = positive(workers, "workers").map_or(defaults.workers, |v| v as usize);
        let rate_limit = positive(rate_limit, "rate_limit")
            .map_or(defaults.rate_limit, |v| v.min(u32::MAX as i64) as u32);
        let timeout = positive(timeout_secs, "timeout_secs")
            .map_or(defaults.timeout, |v| Duration::from_secs(v as u64));
        let user_agent = match user_agent.trim() {
            "" => defaults.user_agent,
            ua => ua.to_string(),
        };
        Self {
            workers,
            timeout,
            rate_limit,
            user_agent,
            ..defaults
        }
    }
}

impl ScraperSettings {
    pub fn resolve(&self) -> ScraperConfig {
        let mut config = ScraperConfig::sanitized(
            self.workers,
            self.rate_limit,
            self.timeout_secs,
            &self.user_agent,
        );
        config.max_pages = positive(self.max_pages, "max_pages").map_or(1, |v| v as usize);
        config.cache_dir = self.cache_dir.clone();
        config
    }
}

fn positive(value: i64, key: &str) -> Option<i64> {
    if value > 0 {
        Some(value)
    } else {
        if value < 0 {
            warn!(key, value, "Non-positive setting; using default");
        }
        None
    }
}

/// Parse a configuration document.
pub fn parse_config(yaml: &str) -> Result<Config, BoxError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Read and parse the configuration file at `path`.
pub async fn load_config(path: &Path) -> Result<Config, BoxError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("reading {}: {e}", path.display()))?;
    let config = parse_config(&yaml)?;
    debug!(
        path = %path.display(),
        sources = config.sources.len(),
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let yaml = r#"
scraper:
  workers: 3
  timeout_secs: 12
  rate_limit: 4
  user_agent: "Bot/2.0"
  max_pages: 3
  cache_dir: /tmp/cache
  interval_secs: 60
sources:
  - id: 1
    name: One
    url: https://one.example
    selector_title: h2
    active: false
  - id: 2
    name: Two
    url: https://two.example
    selector_title: h3
"#;
        let config = parse_config(yaml).unwrap();
        let resolved = config.scraper.resolve();
        assert_eq!(resolved.workers, 3);
        assert_eq!(resolved.timeout, Duration::from_secs(12));
        assert_eq!(resolved.rate_limit, 4);
        assert_eq!(resolved.user_agent, "Bot/2.0");
        assert_eq!(resolved.max_pages, 3);
        assert_eq!(resolved.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(config.scraper.interval_secs, 60);
        assert_eq!(config.scraper.cleanup_interval_secs, 0);
        assert_eq!(config.sources.len(), 2);
        assert!(!config.sources[0].active);
        assert!(config.sources[1].active);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.scraper.resolve(), ScraperConfig::default());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        let resolved = ScraperConfig::sanitized(0, -5, -1, "   ");
        assert_eq!(resolved, ScraperConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_config("scraper: [not, a, map]").is_err());
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(&tmp.path().join("nope.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
