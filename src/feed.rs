use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};
use crate::error::{Result, ScrapeError};
use crate::fetcher::FetchConfig;
use crate::http;
use crate::xml::{self, OpenSearch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Atom,
    Rss,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Atom => f.write_str("atom"),
            FeedKind::Rss => f.write_str("rss"),
        }
    }
}

impl FromStr for FeedKind {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "atom" => Ok(FeedKind::Atom),
            "rss" => Ok(FeedKind::Rss),
            other => Err(ScrapeError::Validation(format!(
                "'{other}' is neither an Atom feed nor an RSS feed"
            ))),
        }
    }
}

/// Everything a worker needs to fetch and normalize pages on its own.
#[derive(Debug, Clone)]
pub struct FeedContext {
    pub client: Client,
    pub encoding: &'static Encoding,
    pub plain_text: bool,
    pub fetch: FetchConfig,
}

impl FeedContext {
    pub fn new(client: Client, encoding: &'static Encoding) -> Self {
        Self {
            client,
            encoding,
            plain_text: false,
            fetch: FetchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    /// 1-based.
    pub number: u32,
    pub url: String,
    pub kind: FeedKind,
    pub encoding: &'static Encoding,
    /// Records this page should yield.
    pub expected_count: usize,
}

impl fmt::Display for FeedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} page {} ({})", self.kind, self.number, self.url)
    }
}

/// `rel="next"` / `rel="previous"` links of an Atom page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub url: String,
    pub kind: FeedKind,
    pub total_results: u64,
    pub pages: BTreeMap<u32, FeedPage>,
    pub(crate) ctx: FeedContext,
}

impl Feed {
    /// Fetches the feed root and computes its pages from the `opensearch`
    /// metadata. Unusable metadata leaves the feed with no pages and a
    /// `pagination-unavailable` diagnostic.
    pub async fn open(ctx: FeedContext, url: &str, kind: FeedKind) -> Result<Outcome<Feed>> {
        let response = http::get_ok(&ctx.client, url).await?;
        let body = http::read_text(response, ctx.encoding).await?;

        let mut diagnostics = Diagnostics::default();
        let mut feed = Feed {
            url: url.to_string(),
            kind,
            total_results: 0,
            pages: BTreeMap::new(),
            ctx,
        };

        match xml::parse_document(&body).and_then(|root| OpenSearch::from_document(&root)) {
            Ok(meta) => match compute_pages(url, kind, feed.ctx.encoding, &meta) {
                Ok(pages) => {
                    feed.total_results = meta.total_results;
                    feed.pages = pages;
                    info!(
                        url,
                        %kind,
                        total = meta.total_results,
                        pages = feed.pages.len(),
                        "Feed paginated"
                    );
                }
                Err(err) => diagnostics.push(Diagnostic::PaginationUnavailable {
                    url: url.to_string(),
                    reason: err.to_string(),
                }),
            },
            Err(err) => diagnostics.push(Diagnostic::PaginationUnavailable {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }

        Ok(Outcome::new(feed, diagnostics))
    }

    /// Reads the neighbour links of an Atom page. RSS pages carry none.
    pub async fn page_links(&self, page_number: u32) -> Result<Outcome<PageLinks>> {
        let mut diagnostics = Diagnostics::default();

        let Some(page) = self.pages.get(&page_number) else {
            diagnostics.push(Diagnostic::UnknownPage(page_number));
            return Ok(Outcome::new(PageLinks::default(), diagnostics));
        };

        let response = http::get_ok(&self.ctx.client, &page.url).await?;
        let body = http::read_text(response, self.ctx.encoding).await?;
        let root = xml::parse_document(&body)?;

        let mut links = PageLinks::default();
        if let Some(feed) = root.child("feed") {
            for link in feed.children_named("link").filter_map(xml::AtomLink::from_element) {
                match link.rel.as_str() {
                    "next" => links.next = Some(link.href),
                    "previous" => links.previous = Some(link.href),
                    _ => {}
                }
            }
        }

        Ok(Outcome::new(links, diagnostics))
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} feed {} ({} articles over {} pages)",
            self.kind,
            self.url,
            self.total_results,
            self.pages.len()
        )
    }
}

/// Splits the result range into pages of `items_per_page`, the last one
/// taking the remainder.
pub fn compute_pages(
    base_url: &str,
    kind: FeedKind,
    encoding: &'static Encoding,
    meta: &OpenSearch,
) -> Result<BTreeMap<u32, FeedPage>> {
    if meta.items_per_page == 0 {
        return Err(ScrapeError::DataFormat(
            "opensearch:itemsPerPage is zero".to_string(),
        ));
    }

    let base = Url::parse(base_url)
        .map_err(|e| ScrapeError::DataFormat(format!("invalid feed URL {base_url}: {e}")))?;

    let skipped = meta.start_index.saturating_sub(1);
    let mut remaining = meta.total_results.saturating_sub(skipped);
    let mut start = meta.start_index.max(1);
    let mut number = 0u32;
    let mut pages = BTreeMap::new();

    while remaining > 0 {
        number += 1;
        let expected = remaining.min(meta.items_per_page);

        let mut url = base.clone();
        url.query_pairs_mut()
            .append_pair("start-index", &start.to_string())
            .append_pair("max-results", &meta.items_per_page.to_string());

        debug!(page = number, url = %url, expected, "Computed feed page");
        pages.insert(
            number,
            FeedPage {
                number,
                url: url.to_string(),
                kind,
                encoding,
                expected_count: expected as usize,
            },
        );

        remaining -= expected;
        start += meta.items_per_page;
    }

    Ok(pages)
}
