//! Feed and page fixtures shared by the integration tests.
#![allow(dead_code)]

use std::time::Duration;

use blogger_scraper::{FeedContext, FetchConfig};

pub const FEED_PATH: &str = "/feeds/posts/default";

pub fn test_context() -> FeedContext {
    FeedContext {
        client: reqwest::Client::new(),
        encoding: encoding_rs::UTF_8,
        plain_text: false,
        fetch: FetchConfig {
            retry_delay: Duration::ZERO,
            ..FetchConfig::default()
        },
    }
}

pub fn atom_entry(id: u64, replies: Option<&str>) -> String {
    let replies = replies
        .map(|href| format!(r#"<link rel="replies" type="application/atom+xml" href="{href}"/>"#))
        .unwrap_or_default();

    format!(
        r#"<entry>
    <id>tag:blogger.com,1999:blog-100.post-{id}</id>
    <published>2021-03-04T10:20:30.000-08:00</published>
    <updated>2021-03-05T10:20:30.000-08:00</updated>
    <title type="text">Post {id}</title>
    <content type="html">&lt;p&gt;Body {id}&lt;/p&gt;</content>
    {replies}
    <link rel="self" type="application/atom+xml" href="http://blog.example.com/feeds/posts/default/{id}"/>
    <link rel="alternate" type="text/html" href="http://blog.example.com/2021/03/post-{id}.html"/>
    <author>
      <name>Writer</name>
      <uri>https://www.blogger.com/profile/700</uri>
      <email>noreply@blogger.com</email>
      <gd:image rel="http://schemas.google.com/g/2005#thumbnail" src="//img/writer.png"/>
    </author>
  </entry>"#
    )
}

pub fn atom_feed(total: u64, start: u64, per_page: u64, entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:openSearch="http://a9.com/-/spec/opensearchrss/1.0/" xmlns:gd="http://schemas.google.com/g/2005">
  <id>tag:blogger.com,1999:blog-100</id>
  <title type="text">Example blog</title>
  <openSearch:totalResults>{total}</openSearch:totalResults>
  <openSearch:startIndex>{start}</openSearch:startIndex>
  <openSearch:itemsPerPage>{per_page}</openSearch:itemsPerPage>
  {}
</feed>"#,
        entries.join("\n")
    )
}

pub fn rss_item(id: u64) -> String {
    format!(
        r#"<item>
      <guid isPermaLink="false">tag:blogger.com,1999:blog-100.post-{id}</guid>
      <pubDate>Thu, 04 Mar 2021 18:20:00 +0000</pubDate>
      <atom:updated>2021-03-05T10:00:00.000-08:00</atom:updated>
      <title>Post {id}</title>
      <description>Body {id}</description>
      <link>http://blog.example.com/2021/03/post-{id}.html</link>
      <author>noreply@blogger.com (Writer)</author>
    </item>"#
    )
}

pub fn rss_feed(total: u64, start: u64, per_page: u64, items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:openSearch="http://a9.com/-/spec/opensearchrss/1.0/">
  <channel>
    <title>Example blog</title>
    <link>http://blog.example.com/</link>
    <description>An example</description>
    <openSearch:totalResults>{total}</openSearch:totalResults>
    <openSearch:startIndex>{start}</openSearch:startIndex>
    <openSearch:itemsPerPage>{per_page}</openSearch:itemsPerPage>
    {}
  </channel>
</rss>"#,
        items.join("\n")
    )
}

/// Comment feed whose entries are written by profile `author_id`.
pub fn comment_feed(ids: &[u64], author_id: u64) -> String {
    let entries: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"<entry>
    <id>tag:blogger.com,1999:blog-100.post-{id}</id>
    <published>2021-03-06T09:00:00.000Z</published>
    <updated>2021-03-06T09:30:00.000Z</updated>
    <content type="html">Comment {id}</content>
    <author><name>Reader {author_id}</name><uri>https://www.blogger.com/profile/{author_id}</uri></author>
  </entry>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  {}
</feed>"#,
        entries.join("\n")
    )
}

/// Home page of a Blogger site advertising the requested feeds.
pub fn blogger_home(base: &str, atom: bool, rss: bool) -> String {
    let mut links = String::new();
    if atom {
        links.push_str(&format!(
            r#"<link rel="alternate" type="application/atom+xml" title="Example - Atom" href="{base}{FEED_PATH}"/>"#
        ));
    }
    if rss {
        links.push_str(&format!(
            r#"<link rel="alternate" type="application/rss+xml" title="Example - RSS" href="{base}{FEED_PATH}?alt=rss"/>"#
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html><head>
<meta content='text/html; charset=UTF-8' http-equiv='Content-Type'/>
<meta content='blogger' name='generator'/>
{links}
<title>Example blog</title>
</head><body><h1>Example blog</h1></body></html>"#
    )
}
