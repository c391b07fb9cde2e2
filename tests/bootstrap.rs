mod common;

use std::time::Duration;

use blogger_scraper::{Blogsite, Diagnostic, FeedKind, FetchConfig, ScrapeError, SiteOptions};
use common::{FEED_PATH, atom_feed, blogger_home, rss_feed};
use reqwest::{Client, StatusCode};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(feed: FeedKind) -> SiteOptions {
    SiteOptions {
        feed,
        plain_text: false,
        fetch: FetchConfig {
            retry_delay: Duration::ZERO,
            ..FetchConfig::default()
        },
    }
}

async fn mount_home(server: &MockServer, body: String, content_type: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), content_type),
        )
        .mount(server)
        .await;
}

async fn mount_feed_root(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn opens_blogger_site_with_preferred_feed() {
    let server = MockServer::start().await;
    mount_home(&server, blogger_home(&server.uri(), true, true), "text/html; charset=UTF-8").await;
    mount_feed_root(&server, atom_feed(25, 1, 10, &[])).await;

    let site = format!("{}/", server.uri());
    let outcome = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap();
    let blog = outcome.value;

    assert!(outcome.diagnostics.is_empty());
    assert_eq!(blog.encoding, encoding_rs::UTF_8);
    assert_eq!(blog.atom_link, Some(format!("{}{FEED_PATH}", server.uri())));
    assert_eq!(blog.rss_link, Some(format!("{}{FEED_PATH}?alt=rss", server.uri())));
    assert_eq!(blog.feed.kind, FeedKind::Atom);
    assert_eq!(blog.feed.total_results, 25);

    let counts: Vec<usize> = blog.feed.pages.values().map(|p| p.expected_count).collect();
    assert_eq!(counts, vec![10, 10, 5]);
}

#[tokio::test]
async fn falls_back_to_rss_when_atom_is_missing() {
    let server = MockServer::start().await;
    mount_home(&server, blogger_home(&server.uri(), false, true), "text/html").await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("alt", "rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(3, 1, 25, &[])))
        .mount(&server)
        .await;

    let site = format!("{}/", server.uri());
    let outcome = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap();

    assert_eq!(outcome.value.feed.kind, FeedKind::Rss);
    assert!(outcome.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::FeedFallback {
            preferred: FeedKind::Atom,
            used: FeedKind::Rss
        }
    )));
}

#[tokio::test]
async fn header_charset_sets_site_encoding() {
    let server = MockServer::start().await;
    mount_home(
        &server,
        blogger_home(&server.uri(), true, false),
        "text/html; charset=ISO-8859-2",
    )
    .await;
    mount_feed_root(&server, atom_feed(0, 1, 25, &[])).await;

    let site = format!("{}/", server.uri());
    let blog = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap()
        .value;

    assert_eq!(blog.encoding, encoding_rs::ISO_8859_2);
    assert!(blog.feed.pages.is_empty());
}

#[tokio::test]
async fn rejects_sites_that_are_not_blogger() {
    let server = MockServer::start().await;
    mount_home(
        &server,
        "<html><head><meta name='generator' content='WordPress'/></head></html>".to_string(),
        "text/html",
    )
    .await;

    let site = format!("{}/", server.uri());
    let err = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Validation(_)));
}

#[tokio::test]
async fn site_without_feeds_is_an_error() {
    let server = MockServer::start().await;
    mount_home(&server, blogger_home(&server.uri(), false, false), "text/html").await;

    let site = format!("{}/", server.uri());
    let err = Blogsite::open(&Client::new(), &site, &options(FeedKind::Rss))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NoFeed(_)));
}

#[tokio::test]
async fn non_200_site_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let site = format!("{}/", server.uri());
    let err = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap_err();

    match err {
        ScrapeError::HttpStatus { status, .. } => assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_site_is_a_connectivity_error() {
    let err = Blogsite::open(&Client::new(), "http://127.0.0.1:1/", &options(FeedKind::Atom))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Connectivity { .. }));
}

#[tokio::test]
async fn missing_pagination_metadata_degrades_to_no_pages() {
    let server = MockServer::start().await;
    mount_home(&server, blogger_home(&server.uri(), true, false), "text/html").await;
    mount_feed_root(
        &server,
        r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>No metadata</title></feed>"#.to_string(),
    )
    .await;

    let site = format!("{}/", server.uri());
    let outcome = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap();

    assert!(outcome.value.feed.pages.is_empty());
    assert!(outcome.diagnostics.has_code("pagination-unavailable"));
}

#[tokio::test]
async fn atom_page_links_are_read() {
    let server = MockServer::start().await;
    let next = format!("{}{FEED_PATH}?start-index=3&max-results=2", server.uri());
    let page_body = atom_feed(4, 1, 2, &[]).replace(
        "<title type=\"text\">Example blog</title>",
        &format!(
            r#"<title type="text">Example blog</title><link rel="next" type="application/atom+xml" href="{}"/>"#,
            next.replace('&', "&amp;")
        ),
    );

    mount_home(&server, blogger_home(&server.uri(), true, false), "text/html").await;
    mount_feed_root(&server, atom_feed(4, 1, 2, &[])).await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("start-index", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_body))
        .with_priority(1)
        .mount(&server)
        .await;

    let site = format!("{}/", server.uri());
    let blog = Blogsite::open(&Client::new(), &site, &options(FeedKind::Atom))
        .await
        .unwrap()
        .value;

    let links = blog.feed.page_links(1).await.unwrap().value;
    assert_eq!(links.next, Some(next));
    assert_eq!(links.previous, None);
}
