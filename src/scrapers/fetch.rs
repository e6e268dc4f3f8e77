//! HTTP page fetching for one source.
//!
//! [`PageFetcher::fetch`] issues a single GET with the configured user agent
//! and per-request timeout, raced against the run's cancellation token. Any
//! non-2xx status is an [`ScrapeError::UnexpectedStatus`].
//!
//! [`PageFetcher::fetch_source`] drives the whole source: it waits on the
//! shared limiter before every network request, extracts each page, and
//! follows the "next page" link until the page budget runs out. Fetching is
//! confined to the host of the source's base URL:
//!
//! - a redirect onto another host fails the source with
//!   [`ScrapeError::DomainViolation`], and the other host is never
//!   requested;
//! - a next-page link to another host is not followed, and the articles
//!   collected so far are kept.
//!
//! With a cache directory configured, bodies are stored on disk keyed by
//! URL and served from there on later runs without touching the network or
//! the limiter.

use crate::error::ScrapeError;
use crate::models::{ScrapedArticle, Source};
use crate::scrapers::extract::{PageExtract, SourceSelectors, extract_page};
use crate::scrapers::rate_limit::RateLimiter;
use crate::utils::truncate_for_log;
use reqwest::header::LOCATION;
use reqwest::redirect;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Redirect hops followed for one request.
pub const MAX_REDIRECTS: usize = 10;

/// A fetched page: the URL it was finally served from and its body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
}

/// Everything extracted from one source across its pages.
#[derive(Debug, Default)]
pub struct SourcePages {
    pub pages: usize,
    pub articles: Vec<ScrapedArticle>,
}

/// On-disk response cache, one file per URL.
#[derive(Debug, Clone)]
struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    fn path_for(&self, url: &Url) -> PathBuf {
        self.dir
            .join(format!("{}.html", urlencoding::encode(url.as_str())))
    }

    async fn get(&self, url: &Url) -> Option<String> {
        let path = self.path_for(url);
        match fs::read_to_string(&path).await {
            Ok(body) => Some(body),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry; refetching");
                None
            }
        }
    }

    async fn put(&self, url: &Url, body: &str) {
        let path = self.path_for(url);
        if let Err(e) = fs::write(&path, body).await {
            warn!(path = %path.display(), error = %e, "Failed to write cache entry");
        }
    }
}

/// Fetches source pages. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    max_pages: usize,
    cache: Option<ResponseCache>,
}

impl PageFetcher {
    /// Build a fetcher sending `user_agent` and giving up on any request
    /// after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(ScrapeError::Client)?;
        Ok(Self {
            client,
            max_pages: 1,
            cache: None,
        })
    }

    /// Follow pagination up to `max_pages` pages per source (the first page
    /// counts). Zero is treated as one.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Cache response bodies under `dir`, creating it if needed.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Result<Self, ScrapeError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ScrapeError::Cache {
            path: dir.display().to_string(),
            source,
        })?;
        self.cache = Some(ResponseCache { dir });
        Ok(self)
    }

    /// Issue one GET for `url`.
    ///
    /// Redirects are followed by hand, at most [`MAX_REDIRECTS`] hops, and
    /// only while they stay on the host of `url`. A redirect to any other
    /// host fails with [`ScrapeError::DomainViolation`] before a request is
    /// sent there.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, ScrapeError> {
        let allowed = allowed_host(url)?;
        let mut current = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
                res = self.client.get(current.clone()).send() => {
                    res.map_err(|e| ScrapeError::from_request(current.as_str(), e))?
                }
            };

            let status = response.status();
            if status.is_redirection() {
                let next = redirect_target(&current, &response, status.as_u16())?;
                ensure_same_host(&next, &allowed)?;
                debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                current = next;
                continue;
            }
            if !status.is_success() {
                return Err(ScrapeError::UnexpectedStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
                text = response.text() => text.map_err(|e| ScrapeError::from_body(current.as_str(), e))?,
            };

            debug!(bytes = body.len(), final_url = %current, "Fetched page");
            return Ok(FetchedPage { url: current, body });
        }

        Err(ScrapeError::TooManyRedirects {
            url: url.to_string(),
        })
    }

    /// Fetch and extract every page of `source`.
    ///
    /// Any page failing fails the whole source; nothing collected so far is
    /// returned in that case.
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    pub async fn fetch_source(
        &self,
        source: &Source,
        selectors: &SourceSelectors,
        limiter: &RateLimiter,
        cancel: &CancellationToken,
    ) -> Result<SourcePages, ScrapeError> {
        let base = Url::parse(source.url.trim()).map_err(|e| ScrapeError::InvalidUrl {
            url: source.url.clone(),
            reason: e.to_string(),
        })?;
        let allowed = allowed_host(&base)?;

        let mut result = SourcePages::default();
        let mut visited = HashSet::new();
        let mut next = Some(base);

        while let Some(page_url) = next.take() {
            if result.pages >= self.max_pages {
                break;
            }
            visited.insert(page_url.clone());

            let page = self.fetch_with_cache(&page_url, limiter, cancel).await?;
            ensure_same_host(&page.url, &allowed)?;
            result.pages += 1;

            let PageExtract {
                articles,
                next_page,
            } = extract_page(&page.body, &page.url, selectors);
            info!(
                page = result.pages,
                url = %page.url,
                bytes = page.body.len(),
                articles = articles.len(),
                "Extracted page"
            );
            if articles.is_empty() {
                debug!(
                    selector = %source.selector_title,
                    preview = %truncate_for_log(&page.body, 300),
                    "Title selector matched nothing"
                );
            }
            result.articles.extend(articles);

            next = next_page.filter(|candidate| {
                if visited.contains(candidate) {
                    return false;
                }
                if ensure_same_host(candidate, &allowed).is_err() {
                    warn!(next = %candidate, allowed = %allowed, "Not following cross-domain next page");
                    return false;
                }
                true
            });
        }

        Ok(result)
    }

    async fn fetch_with_cache(
        &self,
        url: &Url,
        limiter: &RateLimiter,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, ScrapeError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url).await {
                debug!(url = %url, "Cache hit");
                return Ok(FetchedPage {
                    url: url.clone(),
                    body,
                });
            }
        }

        limiter.wait(cancel).await?;
        let page = self.fetch(url, cancel).await?;

        if let Some(cache) = &self.cache {
            cache.put(url, &page.body).await;
        }
        Ok(page)
    }
}

/// Resolve the `Location` of a redirect response against the URL that
/// produced it.
fn redirect_target(
    current: &Url,
    response: &reqwest::Response,
    status: u16,
) -> Result<Url, ScrapeError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ScrapeError::UnexpectedStatus {
            url: current.to_string(),
            status,
        })?;
    current.join(location).map_err(|e| ScrapeError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })
}

/// The host fetching is confined to for a source with base URL `base`.
pub fn allowed_host(base: &Url) -> Result<String, ScrapeError> {
    base.host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| ScrapeError::InvalidUrl {
            url: base.to_string(),
            reason: "URL has no host".to_string(),
        })
}

/// Fail with [`ScrapeError::DomainViolation`] unless `url` is on `allowed`.
pub fn ensure_same_host(url: &Url, allowed: &str) -> Result<(), ScrapeError> {
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case(allowed) => Ok(()),
        _ => Err(ScrapeError::DomainViolation {
            url: url.to_string(),
            allowed: allowed.to_string(),
        }),
    }
}
