//! JSON snapshots of the article store and of run outcomes.
//!
//! # Output Structure
//!
//! Files are organized by UTC date:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── articles.json           # recent articles, newest first (overwritten per run)
//!     ├── outcome-083000123.json  # one per run, HHMMSS + milliseconds
//!     └── outcome-090000456.json
//! ```

use crate::error::BoxError;
use crate::models::{PersistedArticle, ScrapeOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `value` to `{output_dir}/{date}/{file_name}`.
async fn write_dated<T: Serialize>(
    value: &T,
    output_dir: &str,
    at: DateTime<Utc>,
    file_name: &str,
) -> Result<String, BoxError> {
    let json = serde_json::to_string_pretty(value)?;

    let dated_dir = format!(
        "{}/{}",
        output_dir.trim_end_matches('/'),
        at.format("%Y-%m-%d")
    );
    if let Err(e) = fs::create_dir_all(&dated_dir).await {
        error!(%dated_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = format!("{dated_dir}/{file_name}");
    fs::write(&path, json).await?;
    Ok(path)
}

/// Write the recent-articles snapshot.
///
/// # Arguments
///
/// * `articles` - Articles to write, in the order they should appear
/// * `output_dir` - Base directory for JSON output
/// * `at` - Timestamp selecting the date directory
///
/// # Returns
///
/// The path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, count = articles.len()))]
pub async fn write_articles(
    articles: &[PersistedArticle],
    output_dir: &str,
    at: DateTime<Utc>,
) -> Result<String, BoxError> {
    let path = write_dated(&articles, output_dir, at, "articles.json").await?;
    info!(path = %path, "Wrote articles JSON");
    Ok(path)
}

/// Write one run's outcome to `outcome-<HHMMSSmmm>.json`.
///
/// Two runs finishing within the same second get distinct files.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_outcome(
    outcome: &ScrapeOutcome,
    output_dir: &str,
    at: DateTime<Utc>,
) -> Result<String, BoxError> {
    let file_name = format!("outcome-{}.json", at.format("%H%M%S%3f"));
    let path = write_dated(outcome, output_dir, at, &file_name).await?;
    info!(path = %path, "Wrote outcome JSON");
    Ok(path)
}
