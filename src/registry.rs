//! Source registries: where a run gets its list of active sources.
//!
//! The orchestrator only sees the [`SourceRegistry`] trait. Two
//! implementations ship with the crate:
//!
//! - [`YamlSourceRegistry`] re-reads the `sources:` list of the config file
//!   on every call, so edits take effect at the next scheduled run.
//! - [`StaticSourceRegistry`] serves a fixed list, for tests and embedding.

use crate::config::load_config;
use crate::error::BoxError;
use crate::models::Source;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Return the sources to scrape, already filtered to active ones.
    async fn active_sources(&self, cancel: &CancellationToken) -> Result<Vec<Source>, BoxError>;
}

/// Reads sources from a YAML configuration file.
#[derive(Debug, Clone)]
pub struct YamlSourceRegistry {
    path: PathBuf,
}

impl YamlSourceRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceRegistry for YamlSourceRegistry {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn active_sources(&self, _cancel: &CancellationToken) -> Result<Vec<Source>, BoxError> {
        let config = load_config(&self.path).await?;
        let total = config.sources.len();
        let active: Vec<Source> = config.sources.into_iter().filter(|s| s.active).collect();
        debug!(total, active = active.len(), "Read source list");
        Ok(active)
    }
}

/// A fixed, in-memory source list.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceRegistry {
    sources: Vec<Source>,
}

impl StaticSourceRegistry {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl SourceRegistry for StaticSourceRegistry {
    async fn active_sources(&self, _cancel: &CancellationToken) -> Result<Vec<Source>, BoxError> {
        Ok(self.sources.iter().filter(|s| s.active).cloned().collect())
    }
}
