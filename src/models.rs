//! Data models for sources, scraped articles and run outcomes.
//!
//! This module defines the records that flow through a scrape run:
//! - [`Source`]: a configured website and its selectors (read-only input)
//! - [`ScrapedArticle`]: one extractor hit with title, absolute URL and summary
//! - [`CategorizedArticle`]: a scraped article plus its [`Category`]
//! - [`ArticleRecord`]: what the worker hands to the sink (article + source)
//! - [`PersistedArticle`]: the row kept by the store, unique by URL
//! - [`SourceReport`] and [`ScrapeOutcome`]: per-run aggregation
//!
//! Scraped and categorized articles only live while a worker processes one
//! source; they are dropped once the sink call returns.

use crate::error::ScrapeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a configured source.
pub type SourceId = i64;

/// A news website to scrape.
///
/// Field names follow the configuration file (`selector_title`,
/// `selector_link`, ...). `selector_link` and `selector_summary` may be
/// empty; an empty `default_category` means "uncategorized".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    /// Base URL of the listing page. Its host is the only host the fetcher
    /// will follow links on.
    pub url: String,
    pub selector_title: String,
    #[serde(default)]
    pub selector_link: String,
    #[serde(default)]
    pub selector_summary: String,
    #[serde(default)]
    pub default_category: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One candidate article found on a page.
///
/// `title` is non-empty and `url` is absolute; the extractor never emits a
/// record that violates either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedArticle {
    pub title: String,
    pub url: String,
    /// Empty when the source has no summary selector or nothing matched.
    pub summary: String,
}

/// Topical category assigned by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Technology,
    Sports,
    Politics,
    Business,
    Entertainment,
    Health,
    /// The source's configured default, used when no keyword matched.
    /// May be empty.
    Default(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Politics => "politics",
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Default(s) => s,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A scraped article with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedArticle {
    pub article: ScrapedArticle,
    pub category: Category,
}

/// The unit handed to [`crate::store::ArticleSink::save`]: a categorized
/// article plus the denormalized identity of the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub source_id: SourceId,
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub category: Category,
}

impl ArticleRecord {
    pub fn new(source: &Source, categorized: CategorizedArticle) -> Self {
        let CategorizedArticle { article, category } = categorized;
        Self {
            source_id: source.id,
            source_name: source.name.clone(),
            title: article.title,
            url: article.url,
            summary: article.summary,
            category,
        }
    }
}

/// An article as kept by the store. Unique by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedArticle {
    pub id: u64,
    pub source_id: SourceId,
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub category: String,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What happened to one source that completed its fetch stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source_name: String,
    /// Pages fetched, including the first one.
    pub pages: usize,
    /// Articles that survived extraction.
    pub articles_found: usize,
    pub articles_saved: usize,
    /// Individual save failures; these never fail the source.
    pub save_failures: usize,
}

/// A source that failed, with the error that stopped it.
#[derive(Debug, Serialize)]
pub struct SourceFailure {
    pub source_name: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ScrapeError,
}

/// Aggregated result of one run.
///
/// There is no global failure flag: a run is complete once every worker has
/// exited, whatever happened to individual sources.
#[derive(Debug, Default, Serialize)]
pub struct ScrapeOutcome {
    pub sources_attempted: usize,
    pub reports: BTreeMap<SourceId, SourceReport>,
    pub errors: BTreeMap<SourceId, SourceFailure>,
}

impl ScrapeOutcome {
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn articles_saved(&self) -> usize {
        self.reports.values().map(|r| r.articles_saved).sum()
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source() -> Source {
        Source {
            id: 7,
            name: "Example News".to_string(),
            url: "https://example.com/news".to_string(),
            selector_title: "h2 a".to_string(),
            selector_link: String::new(),
            selector_summary: String::new(),
            default_category: "general".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_source_deserialization_defaults() {
        let yaml = r#"
id: 3
name: Minimal
url: https://example.org
selector_title: ".headline"
"#;
        let source: Source = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.id, 3);
        assert!(source.active);
        assert!(source.selector_link.is_empty());
        assert!(source.selector_summary.is_empty());
        assert!(source.default_category.is_empty());
    }

    #[test]
    fn test_category_as_str() {
        assert_eq!(Category::Technology.as_str(), "technology");
        assert_eq!(Category::Health.to_string(), "health");
        assert_eq!(Category::Default("local".to_string()).as_str(), "local");
        assert_eq!(Category::Default(String::new()).as_str(), "");
    }

    #[test]
    fn test_article_record_carries_source_identity() {
        let source = sample_source();
        let record = ArticleRecord::new(
            &source,
            CategorizedArticle {
                article: ScrapedArticle {
                    title: "Title".to_string(),
                    url: "https://example.com/a".to_string(),
                    summary: "Sum".to_string(),
                },
                category: Category::Business,
            },
        );
        assert_eq!(record.source_id, 7);
        assert_eq!(record.source_name, "Example News");
        assert_eq!(record.category, Category::Business);
    }

    #[test]
    fn test_outcome_serializes_errors_as_strings() {
        let mut outcome = ScrapeOutcome {
            sources_attempted: 2,
            ..Default::default()
        };
        outcome.reports.insert(
            1,
            SourceReport {
                source_name: "ok".to_string(),
                pages: 1,
                articles_found: 3,
                articles_saved: 3,
                save_failures: 0,
            },
        );
        outcome.errors.insert(
            2,
            SourceFailure {
                source_name: "broken".to_string(),
                error: ScrapeError::Cancelled,
            },
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["sources_attempted"], 2);
        assert_eq!(json["errors"]["2"]["error"], "scrape cancelled");
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.articles_saved(), 3);
    }
}
