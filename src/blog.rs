use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};
use crate::error::{Result, ScrapeError};
use crate::feed::{Feed, FeedContext, FeedKind};
use crate::fetcher::FetchConfig;
use crate::http;

const ATOM_TYPE: &str = "application/atom+xml";
const RSS_TYPE: &str = "application/rss+xml";

#[derive(Debug, Clone, Default)]
pub struct SiteOptions {
    pub feed: FeedKind,
    pub plain_text: bool,
    pub fetch: FetchConfig,
}

/// A confirmed Blogger site and the feed chosen for it.
#[derive(Debug, Clone)]
pub struct Blogsite {
    pub canonical_url: String,
    pub encoding: &'static Encoding,
    pub atom_link: Option<String>,
    pub rss_link: Option<String>,
    pub feed: Feed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedLinks {
    pub atom: Option<String>,
    pub rss: Option<String>,
}

impl Blogsite {
    /// Loads the site root, confirms it is a Blogger blog, discovers its
    /// feeds and paginates the preferred one.
    pub async fn open(client: &Client, site: &str, options: &SiteOptions) -> Result<Outcome<Blogsite>> {
        info!(site, feed = %options.feed, "Opening blog");

        let response = http::get_ok(client, site).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);
        let bytes = http::read_bytes(response).await?;

        let encoding = detect_encoding(content_type.as_deref(), &bytes);
        let html = http::decode(&bytes, encoding);
        debug!(site, encoding = encoding.name(), "Detected site encoding");

        if !is_blogger(&html) {
            return Err(ScrapeError::Validation(format!(
                "could not verify provided site at '{site}' is a Blogger site"
            )));
        }

        let links = discover_feed_links(&html, site);
        let mut diagnostics = Diagnostics::default();
        let (kind, feed_url) = choose_feed(site, options.feed, &links, &mut diagnostics)?;

        let ctx = FeedContext {
            client: client.clone(),
            encoding,
            plain_text: options.plain_text,
            fetch: options.fetch,
        };
        let feed = Feed::open(ctx, &feed_url, kind)
            .await?
            .merge_into(&mut diagnostics);

        Ok(Outcome::new(
            Blogsite {
                canonical_url: site.to_string(),
                encoding,
                atom_link: links.atom,
                rss_link: links.rss,
                feed,
            },
            diagnostics,
        ))
    }
}

/// Picks the preferred feed, or the other one with a `feed-fallback`
/// diagnostic.
pub fn choose_feed(
    site: &str,
    preferred: FeedKind,
    links: &FeedLinks,
    diagnostics: &mut Diagnostics,
) -> Result<(FeedKind, String)> {
    let (wanted, other, other_kind) = match preferred {
        FeedKind::Atom => (&links.atom, &links.rss, FeedKind::Rss),
        FeedKind::Rss => (&links.rss, &links.atom, FeedKind::Atom),
    };

    match (wanted, other) {
        (Some(url), _) => Ok((preferred, url.clone())),
        (None, Some(url)) => {
            diagnostics.push(Diagnostic::FeedFallback {
                preferred,
                used: other_kind,
            });
            Ok((other_kind, url.clone()))
        }
        (None, None) => Err(ScrapeError::NoFeed(site.to_string())),
    }
}

/// Charset from, in order: the `Content-Type` header, a
/// `<meta content="text/html; charset=...">` tag, any charset declaration in
/// the raw body. Defaults to UTF-8.
pub fn detect_encoding(content_type: Option<&str>, bytes: &[u8]) -> &'static Encoding {
    // 1. Try charset from header
    if let Some(encoding) = content_type.and_then(charset_label).and_then(lookup_encoding) {
        return encoding;
    }

    let ascii_head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);

    // 2. Try the http-equiv style meta tag
    if let Some(encoding) = meta_charset(&ascii_head) {
        return encoding;
    }

    // 3. Scan for any charset declaration
    if let Ok(re) = Regex::new(r#"charset\s*=\s*["']?([A-Za-z0-9_\-]+)"#) {
        for cap in re.captures_iter(&ascii_head) {
            if let Some(encoding) = cap.get(1).and_then(|m| lookup_encoding(m.as_str())) {
                return encoding;
            }
        }
    }

    UTF_8
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type
        .split("charset=")
        .nth(1)
        .map(|label| label.split(';').next().unwrap_or(label).trim().trim_matches('"'))
}

fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

fn meta_charset(html: &str) -> Option<&'static Encoding> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[content]").ok()?;

    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .filter(|content| content.starts_with("text/html"))
        .filter_map(charset_label)
        .find_map(lookup_encoding)
}

/// Looks for Blogger's `<meta content="blogger">` generator tag.
pub fn is_blogger(html: &str) -> bool {
    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("meta[content]") {
        let tagged = document
            .select(&selector)
            .any(|meta| meta.value().attr("content") == Some("blogger"));
        if tagged {
            return true;
        }
    }

    // Fallback for markup the HTML parser did not keep as a meta element
    match Regex::new(r#"<meta\s+[^>]*content=['"]blogger['"]"#) {
        Ok(re) => re.is_match(html),
        Err(_) => false,
    }
}

/// Collects the `alternate` Atom and RSS `<link>` tags, resolved against
/// the site URL. The last tag of each type wins.
pub fn discover_feed_links(html: &str, site: &str) -> FeedLinks {
    let document = Html::parse_document(html);
    let mut links = FeedLinks::default();

    let Ok(selector) = Selector::parse("link[rel][type][href]") else {
        return links;
    };

    for element in document.select(&selector) {
        let attrs = element.value();
        let alternate = attrs
            .attr("rel")
            .and_then(|rel| rel.split_whitespace().next())
            .is_some_and(|rel| rel.eq_ignore_ascii_case("alternate"));
        if !alternate {
            continue;
        }

        let Some(href) = attrs.attr("href") else {
            continue;
        };
        let href = normalize_url(site, href);

        match attrs.attr("type") {
            Some(ATOM_TYPE) => links.atom = Some(href),
            Some(RSS_TYPE) => links.rss = Some(href),
            _ => {}
        }
    }

    links
}

fn normalize_url(base: &str, href: &str) -> String {
    // Parse base URL
    let base_url = match Url::parse(base) {
        Ok(u) => u,
        Err(_) => return href.to_string(),
    };

    // Resolve relative URL correctly
    match base_url.join(href) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta content='text/html; charset=windows-1252' http-equiv='Content-Type'/>
<meta content='blogger' name='generator'/>
<link rel="alternate" type="application/atom+xml" title="Blog - Atom" href="https://blog.example.com/feeds/posts/default"/>
<link rel="alternate" type="application/rss+xml" title="Blog - RSS" href="/feeds/posts/default?alt=rss"/>
<link rel="stylesheet" type="text/css" href="/style.css"/>
</head><body></body></html>"#;

    #[test]
    fn header_charset_wins() {
        let encoding = detect_encoding(Some("text/html; charset=ISO-8859-2"), PAGE.as_bytes());
        assert_eq!(encoding, encoding_rs::ISO_8859_2);
    }

    #[test]
    fn unknown_header_charset_falls_through_to_meta() {
        let encoding = detect_encoding(Some("text/html; charset=bogus"), PAGE.as_bytes());
        assert_eq!(encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn raw_scan_finds_html5_charset() {
        let html = r#"<html><head><meta charset="Shift_JIS"></head></html>"#;
        assert_eq!(detect_encoding(None, html.as_bytes()), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(detect_encoding(None, b"<html></html>"), UTF_8);
    }

    #[test]
    fn recognises_blogger_sites() {
        assert!(is_blogger(PAGE));
        assert!(!is_blogger("<html><head><meta content='wordpress' name='generator'/></head></html>"));
    }

    #[test]
    fn discovers_and_resolves_feed_links() {
        let links = discover_feed_links(PAGE, "https://blog.example.com/");

        assert_eq!(
            links,
            FeedLinks {
                atom: Some("https://blog.example.com/feeds/posts/default".to_string()),
                rss: Some("https://blog.example.com/feeds/posts/default?alt=rss".to_string()),
            }
        );
    }

    #[test]
    fn falls_back_to_available_feed() {
        let links = FeedLinks {
            atom: None,
            rss: Some("http://x/rss".to_string()),
        };
        let mut diagnostics = Diagnostics::default();
        let (kind, url) = choose_feed("http://x", FeedKind::Atom, &links, &mut diagnostics).unwrap();

        assert_eq!(kind, FeedKind::Rss);
        assert_eq!(url, "http://x/rss");
        assert!(diagnostics.has_code("feed-fallback"));
    }

    #[test]
    fn no_feed_is_an_error() {
        let mut diagnostics = Diagnostics::default();
        let err = choose_feed("http://x", FeedKind::Rss, &FeedLinks::default(), &mut diagnostics).unwrap_err();
        assert!(matches!(err, ScrapeError::NoFeed(_)));
    }
}
