//! Article persistence.
//!
//! Workers hand every categorized article to an [`ArticleSink`]. The sink is
//! called concurrently from all workers of a run and must be safe for that;
//! saving the same URL twice must leave one record, not two.
//!
//! [`MemoryArticleStore`] is the bundled sink: a URL-keyed map behind a
//! mutex, with the read queries the binary uses for its JSON output.

use crate::error::BoxError;
use crate::models::{ArticleRecord, PersistedArticle, SourceId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default page size for the filtered store queries.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

fn query_limit(limit: Option<usize>) -> usize {
    limit.filter(|l| *l > 0).unwrap_or(DEFAULT_QUERY_LIMIT)
}

#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Insert `record`, or update the existing record with the same URL.
    async fn save(&self, cancel: &CancellationToken, record: &ArticleRecord)
    -> Result<(), BoxError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    by_url: HashMap<String, PersistedArticle>,
}

/// In-memory article store, unique by URL.
///
/// An upsert keeps the record's `id`, `created_at` and source identity and
/// refreshes title, summary, category and `scraped_at`.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    inner: Mutex<StoreInner>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A poisoned map is still a consistent map: every write is a single insert.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn upsert(&self, record: &ArticleRecord) -> bool {
        let now = Utc::now();
        let mut inner = self.lock();
        if let Some(existing) = inner.by_url.get_mut(&record.url) {
            existing.title = record.title.clone();
            existing.summary = record.summary.clone();
            existing.category = record.category.to_string();
            existing.scraped_at = now;
            return false;
        }
        inner.next_id += 1;
        let article = PersistedArticle {
            id: inner.next_id,
            source_id: record.source_id,
            source_name: record.source_name.clone(),
            title: record.title.clone(),
            url: record.url.clone(),
            summary: record.summary.clone(),
            category: record.category.to_string(),
            scraped_at: now,
            created_at: now,
        };
        inner.by_url.insert(record.url.clone(), article);
        true
    }

    /// The `limit` most recently scraped articles, newest first.
    pub fn recent(&self, limit: usize) -> Vec<PersistedArticle> {
        self.newest_first(|_| true, limit)
    }

    /// Articles of one source, newest first. `None` uses
    /// [`DEFAULT_QUERY_LIMIT`].
    pub fn by_source(&self, source_id: SourceId, limit: Option<usize>) -> Vec<PersistedArticle> {
        self.newest_first(|a| a.source_id == source_id, query_limit(limit))
    }

    /// Articles tagged `category`, newest first. `None` uses
    /// [`DEFAULT_QUERY_LIMIT`].
    pub fn by_category(&self, category: &str, limit: Option<usize>) -> Vec<PersistedArticle> {
        self.newest_first(|a| a.category == category, query_limit(limit))
    }

    /// Distinct non-empty categories currently stored, sorted.
    pub fn categories(&self) -> Vec<String> {
        let inner = self.lock();
        let categories: BTreeSet<&str> = inner
            .by_url
            .values()
            .map(|a| a.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        categories.into_iter().map(str::to_string).collect()
    }

    fn newest_first(
        &self,
        keep: impl Fn(&PersistedArticle) -> bool,
        limit: usize,
    ) -> Vec<PersistedArticle> {
        let inner = self.lock();
        let mut articles: Vec<_> = inner.by_url.values().filter(|a| keep(a)).cloned().collect();
        articles.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at).then(b.id.cmp(&a.id)));
        articles.truncate(limit);
        articles
    }

    pub fn get(&self, url: &str) -> Option<PersistedArticle> {
        self.lock().by_url.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every article, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.by_url.len();
        inner.by_url.clear();
        info!(removed, "Cleared article store");
        removed
    }
}

#[async_trait]
impl ArticleSink for MemoryArticleStore {
    async fn save(
        &self,
        cancel: &CancellationToken,
        record: &ArticleRecord,
    ) -> Result<(), BoxError> {
        if cancel.is_cancelled() {
            return Err("save cancelled".into());
        }
        let inserted = self.upsert(record);
        debug!(url = %record.url, inserted, "Saved article");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::sync::Arc;

    fn record(source_id: SourceId, url: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            source_id,
            source_name: format!("source-{source_id}"),
            title: title.to_string(),
            url: url.to_string(),
            summary: String::new(),
            category: Category::Default("general".to_string()),
        }
    }

    #[tokio::test]
    async fn test_save_inserts_and_assigns_ids() {
        let store = MemoryArticleStore::new();
        let cancel = CancellationToken::new();
        store.save(&cancel, &record(1, "https://a/1", "One")).await.unwrap();
        store.save(&cancel, &record(1, "https://a/2", "Two")).await.unwrap();

        assert_eq!(store.len(), 2);
        let one = store.get("https://a/1").unwrap();
        let two = store.get("https://a/2").unwrap();
        assert_ne!(one.id, two.id);
        assert_eq!(one.category, "general");
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity_and_updates_content() {
        let store = MemoryArticleStore::new();
        let cancel = CancellationToken::new();
        store.save(&cancel, &record(1, "https://a/1", "Old")).await.unwrap();
        let before = store.get("https://a/1").unwrap();

        let mut updated = record(2, "https://a/1", "New");
        updated.category = Category::Sports;
        store.save(&cancel, &updated).await.unwrap();

        assert_eq!(store.len(), 1);
        let after = store.get("https://a/1").unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.source_id, 1);
        assert_eq!(after.title, "New");
        assert_eq!(after.category, "sports");
        assert!(after.scraped_at >= before.scraped_at);
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_same_url() {
        let store = Arc::new(MemoryArticleStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let rec = record(1, "https://a/same", &format!("t{i}"));
                store.save(&CancellationToken::new(), &rec).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_queries_and_clear() {
        let store = MemoryArticleStore::new();
        let cancel = CancellationToken::new();
        for i in 0..5 {
            store
                .save(&cancel, &record(i % 2, &format!("https://a/{i}"), "t"))
                .await
                .unwrap();
        }

        let recent = store.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].url, "https://a/4");

        let odd = store.by_source(1, None);
        assert_eq!(odd.len(), 2);
        assert!(odd.iter().all(|a| a.source_id == 1));
        assert_eq!(store.by_source(0, Some(1)).len(), 1);

        assert_eq!(store.clear(), 5);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_category_queries() {
        let store = MemoryArticleStore::new();
        let cancel = CancellationToken::new();
        let categories = [
            Category::Sports,
            Category::Technology,
            Category::Sports,
            Category::Default(String::new()),
            Category::Default("local".to_string()),
        ];
        for (i, category) in categories.into_iter().enumerate() {
            let mut rec = record(1, &format!("https://a/{i}"), "t");
            rec.category = category;
            store.save(&cancel, &rec).await.unwrap();
        }

        let sports = store.by_category("sports", None);
        assert_eq!(sports.len(), 2);
        assert_eq!(sports[0].url, "https://a/2");
        assert_eq!(store.by_category("sports", Some(1)).len(), 1);
        assert!(store.by_category("health", None).is_empty());

        assert_eq!(store.categories(), vec!["local", "sports", "technology"]);
    }

    #[tokio::test]
    async fn test_save_refuses_after_cancel() {
        let store = MemoryArticleStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(store.save(&cancel, &record(1, "https://a/1", "t")).await.is_err());
        assert!(store.is_empty());
    }
}
