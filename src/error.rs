//! Error taxonomy for a scrape run.
//!
//! Errors fall into three tiers:
//!
//! - **Fatal to a run**: [`ScrapeError::SourceListUnavailable`]. `run_all`
//!   returns it directly and no worker is started.
//! - **Fatal to one source**: everything a fetch can produce (network,
//!   timeout, status, body, domain, selector, cache) plus
//!   [`ScrapeError::Cancelled`]. These are recorded in the run outcome
//!   against the source that produced them.
//! - **Fatal to one article**: [`ScrapeError::Save`]. Logged by the worker,
//!   which moves on to the next article.
//!
//! Empty selector matches and records without a title or link are not
//! errors at all; the extractor drops them silently.

use std::io;
use thiserror::Error;

/// Error type returned by external collaborators (registry, sink).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("source list unavailable: {0}")]
    SourceListUnavailable(#[source] BoxError),

    #[error("scrape cancelled")]
    Cancelled,

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("failed to read body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error("{url} is outside the allowed domain {allowed}")]
    DomainViolation { url: String, allowed: String },

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("response cache error at {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to save article: {0}")]
    Save(#[source] BoxError),
}

impl ScrapeError {
    /// Builds the fetch-stage error for a failed `reqwest` call, splitting
    /// out timeouts so they read as such in the outcome.
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout {
                url: url.to_string(),
            }
        } else {
            ScrapeError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Same as [`ScrapeError::from_request`] for a failure while reading
    /// the response body.
    pub fn from_body(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout {
                url: url.to_string(),
            }
        } else {
            ScrapeError::Body {
                url: url.to_string(),
                source: err,
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScrapeError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unexpected_status() {
        let err = ScrapeError::UnexpectedStatus {
            url: "https://example.com/".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 503 from https://example.com/"
        );
    }

    #[test]
    fn test_source_list_unavailable_keeps_cause() {
        let cause: BoxError = "connection refused".into();
        let err = ScrapeError::SourceListUnavailable(cause);
        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ScrapeError::Cancelled.is_cancelled());
        assert!(
            !ScrapeError::Timeout {
                url: "https://example.com/".to_string()
            }
            .is_cancelled()
        );
    }
}
