//! Article extraction from a parsed listing page.
//!
//! Every element matching a source's title selector is one candidate. For
//! each candidate the extractor:
//!
//! 1. takes the trimmed, whitespace-collapsed text as the title and drops
//!    the candidate when it is empty;
//! 2. looks for a link, in order: `href` on the element itself, then the
//!    first `href` under the element matching the link selector (only when
//!    that selector differs from the title selector), then any descendant
//!    `a[href]`; no link drops the candidate;
//! 3. resolves the link against the page URL;
//! 4. optionally reads a summary from the nearest enclosing `article` or
//!    `div` ancestor.
//!
//! Output keeps document order and is not deduplicated; the sink upserts
//! by URL.
//!
//! [`scraper::Html`] is not `Send`, so everything here is synchronous and
//! the document never outlives a call.

use crate::error::ScrapeError;
use crate::models::{ScrapedArticle, Source};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR_WITH_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Common pagination markup for the "next page" link.
pub const NEXT_PAGE_SELECTOR: &str = "a[rel='next'], a.next, a.pagination-next, .next-page a";

static NEXT_PAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(NEXT_PAGE_SELECTOR).expect("static selector"));

/// A source's selectors, compiled once per run.
#[derive(Debug, Clone)]
pub struct SourceSelectors {
    title: Selector,
    /// `None` when empty or identical to the title selector.
    link: Option<Selector>,
    summary: Option<Selector>,
}

impl SourceSelectors {
    pub fn compile(source: &Source) -> Result<Self, ScrapeError> {
        Self::from_parts(
            &source.selector_title,
            &source.selector_link,
            &source.selector_summary,
        )
    }

    pub fn from_parts(title: &str, link: &str, summary: &str) -> Result<Self, ScrapeError> {
        let title_sel = parse_selector(title)?;
        let link_sel = if link.trim().is_empty() || link.trim() == title.trim() {
            None
        } else {
            Some(parse_selector(link)?)
        };
        let summary_sel = if summary.trim().is_empty() {
            None
        } else {
            Some(parse_selector(summary)?)
        };
        Ok(Self {
            title: title_sel,
            link: link_sel,
            summary: summary_sel,
        })
    }
}

fn parse_selector(raw: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(raw.trim()).map_err(|e| ScrapeError::InvalidSelector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Articles and the pagination link found on one page.
#[derive(Debug, Default)]
pub struct PageExtract {
    pub articles: Vec<ScrapedArticle>,
    /// Resolved "next page" link, if the page has one. Not yet checked
    /// against the source's domain.
    pub next_page: Option<Url>,
}

/// Parse `body` and extract its articles and next-page link.
pub fn extract_page(body: &str, page_url: &Url, selectors: &SourceSelectors) -> PageExtract {
    let document = Html::parse_document(body);
    PageExtract {
        articles: extract(&document, page_url, selectors),
        next_page: find_next_page(&document, page_url),
    }
}

/// Extract article candidates from an already parsed document.
pub fn extract(document: &Html, base: &Url, selectors: &SourceSelectors) -> Vec<ScrapedArticle> {
    document
        .select(&selectors.title)
        .filter_map(|element| extract_one(element, base, selectors))
        .collect()
}

/// Convenience entry point taking raw strings, compiling the selectors on
/// every call.
pub fn extract_articles(
    html: &str,
    base_url: &str,
    title_selector: &str,
    link_selector: &str,
    summary_selector: &str,
) -> Result<Vec<ScrapedArticle>, ScrapeError> {
    let base = Url::parse(base_url).map_err(|e| ScrapeError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    let selectors = SourceSelectors::from_parts(title_selector, link_selector, summary_selector)?;
    let document = Html::parse_document(html);
    Ok(extract(&document, &base, &selectors))
}

fn extract_one(
    element: ElementRef<'_>,
    base: &Url,
    selectors: &SourceSelectors,
) -> Option<ScrapedArticle> {
    let title = collapse_whitespace(&element.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let href = find_href(element, selectors.link.as_ref())?;
    let url = resolve_url(base, href)?;

    let summary = selectors
        .summary
        .as_ref()
        .map(|sel| find_summary(element, sel))
        .unwrap_or_default();

    Some(ScrapedArticle {
        title,
        url,
        summary,
    })
}

fn find_href<'a>(element: ElementRef<'a>, link: Option<&Selector>) -> Option<&'a str> {
    let non_empty = |href: &&str| !href.trim().is_empty();

    if let Some(href) = element.value().attr("href").filter(non_empty) {
        return Some(href);
    }
    if let Some(link) = link {
        let found = element
            .select(link)
            .filter_map(|e| e.value().attr("href"))
            .find(non_empty);
        if found.is_some() {
            return found;
        }
    }
    element
        .select(&ANCHOR_WITH_HREF)
        .filter_map(|e| e.value().attr("href"))
        .find(non_empty)
}

fn find_summary(element: ElementRef<'_>, summary: &Selector) -> String {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| matches!(e.value().name(), "article" | "div"))
        .and_then(|block| block.select(summary).next())
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .unwrap_or_default()
}

/// Resolve `href` against `base` using standard URL resolution.
///
/// Handles absolute, scheme-relative (`//host/x`), path-relative
/// (`../x`, `x`), query-relative (`?page=2`) and fragment-relative
/// (`#top`) references. Returns `None` for empty hrefs, unparsable
/// references and anything that does not resolve to `http` or `https`
/// (`mailto:`, `javascript:`, ...). Resolving an already absolute URL
/// returns it unchanged (modulo normalization), so the function is
/// idempotent.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}

/// First pagination link on the page, resolved against `page_url`.
pub fn find_next_page(document: &Html, page_url: &Url) -> Option<Url> {
    document
        .select(&NEXT_PAGE)
        .filter_map(|e| e.value().attr("href"))
        .filter_map(|href| resolve_url(page_url, href))
        .filter_map(|url| Url::parse(&url).ok())
        .find(|url| url != page_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/world/index.html?lang=en").unwrap()
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_url(&base(), "https://other.org/story"),
            Some("https://other.org/story".to_string())
        );
    }

    #[test]
    fn test_resolve_scheme_relative() {
        assert_eq!(
            resolve_url(&base(), "//cdn.example.com/a"),
            Some("https://cdn.example.com/a".to_string())
        );
    }

    #[test]
    fn test_resolve_path_relative() {
        assert_eq!(
            resolve_url(&base(), "story-1"),
            Some("https://news.example.com/world/story-1".to_string())
        );
        assert_eq!(
            resolve_url(&base(), "../sports/match"),
            Some("https://news.example.com/sports/match".to_string())
        );
        assert_eq!(
            resolve_url(&base(), "/about"),
            Some("https://news.example.com/about".to_string())
        );
    }

    #[test]
    fn test_resolve_query_and_fragment_relative() {
        assert_eq!(
            resolve_url(&base(), "?page=2"),
            Some("https://news.example.com/world/index.html?page=2".to_string())
        );
        assert_eq!(
            resolve_url(&base(), "#top"),
            Some("https://news.example.com/world/index.html?lang=en#top".to_string())
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let others = [
            Url::parse("https://a.example/").unwrap(),
            Url::parse("http://b.example/x/y?z=1").unwrap(),
        ];
        for href in ["/docs", "../up", "?q=1", "#frag", "//cdn.example.com/x", "rel/path"] {
            let once = resolve_url(&base(), href).unwrap();
            for other in &others {
                assert_eq!(resolve_url(other, &once).as_deref(), Some(once.as_str()));
            }
        }
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert_eq!(resolve_url(&base(), "mailto:desk@example.com"), None);
        assert_eq!(resolve_url(&base(), "javascript:void(0)"), None);
        assert_eq!(resolve_url(&base(), "   "), None);
    }

    #[test]
    fn test_link_on_title_element() {
        let html = r#"<ul><li><a class="headline" href="/a">  First
            story </a></li></ul>"#;
        let out = extract_articles(html, "https://example.com/", "a.headline", "", "").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "First story");
        assert_eq!(out[0].url, "https://example.com/a");
        assert_eq!(out[0].summary, "");
    }

    #[test]
    fn test_link_selector_inside_title_element() {
        let html = r#"
            <div class="card">
              <h2 class="t"><a class="share" href="/share">Big news</a><a class="go" href="/big">x</a></h2>
            </div>"#;
        let out = extract_articles(html, "https://example.com/", "h2.t", "a.go", "").unwrap();
        assert_eq!(out[0].url, "https://example.com/big");
    }

    #[test]
    fn test_link_falls_back_to_descendant_anchor() {
        let html = r#"<h3 class="t"><span><a href="story">Nested</a></span></h3>"#;
        let out = extract_articles(html, "https://example.com/list/", "h3.t", "h3.t", "").unwrap();
        assert_eq!(out[0].url, "https://example.com/list/story");
    }

    #[test]
    fn test_preserves_document_order() {
        let html = r#"
            <h2><a href="/1">One</a></h2>
            <h2><a href="/2">Two</a></h2>
            <h2><a href="/3">Three</a></h2>"#;
        let out = extract_articles(html, "https://example.com/", "h2", "", "").unwrap();
        let titles: Vec<_> = out.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_drops_title_without_link() {
        let html = r#"<h2>No link here</h2><h2><a href="/ok">Linked</a></h2>"#;
        let out = extract_articles(html, "https://example.com/", "h2", "", "").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Linked");
    }

    #[test]
    fn test_drops_link_with_blank_title() {
        let html = r#"<h2><a href="/blank">   </a></h2><h2><a href="/ok">Kept</a></h2>"#;
        let out = extract_articles(html, "https://example.com/", "h2", "", "").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://example.com/ok");
    }

    #[test]
    fn test_summary_from_enclosing_block() {
        let html = r#"
            <article>
              <h2><a href="/a">Alpha</a></h2>
              <p class="dek">  Alpha summary </p>
            </article>
            <article>
              <h2><a href="/b">Beta</a></h2>
            </article>"#;
        let out = extract_articles(html, "https://example.com/", "h2", "", "p.dek").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].summary, "Alpha summary");
        assert_eq!(out[1].summary, "");
    }

    #[test]
    fn test_zero_matches_is_not_an_error() {
        let out =
            extract_articles("<p>nothing</p>", "https://example.com/", "h2.none", "", "").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let err = extract_articles("<p/>", "https://example.com/", "h2[", "", "").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
    }

    #[test]
    fn test_find_next_page() {
        let page = Url::parse("https://example.com/news?page=1").unwrap();
        let html = r#"<nav><a class="prev" href="?page=0">prev</a><a rel="next" href="?page=2">next</a></nav>"#;
        let extract = extract_page(
            html,
            &page,
            &SourceSelectors::from_parts("h2", "", "").unwrap(),
        );
        assert_eq!(
            extract.next_page.map(String::from),
            Some("https://example.com/news?page=2".to_string())
        );
    }

    #[test]
    fn test_self_link_is_not_a_next_page() {
        let page = Url::parse("https://example.com/news").unwrap();
        let document = Html::parse_document(r#"<a class="next" href="/news">again</a>"#);
        assert!(find_next_page(&document, &page).is_none());
    }
}
