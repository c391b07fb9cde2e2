//! Atom side of the feed parser.
//!
//! `quick-xml` events are folded into a small element tree first, then the
//! tree is read into typed records ([`AtomEntry`], [`AtomAuthor`],
//! [`AtomLink`], [`OpenSearch`]) whose optional parts are explicit `Option`s.
//! Element and attribute names are lower-cased while building the tree so
//! `openSearch:totalResults` and `opensearch:totalresults` are the same tag.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, ScrapeError};

pub const ATOM_MIME: &str = "application/atom+xml";
pub const HTML_MIME: &str = "text/html";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            name,
            attrs,
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of a direct child.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.trim().to_string())
    }

    /// First descendant with the given name, depth-first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}

/// Parses an XML document into a tree rooted at a synthetic `#document`
/// element.
pub fn parse_document(body: &str) -> Result<Element> {
    let mut reader = Reader::from_str(body);

    let mut buf = Vec::new();
    let mut stack = vec![Element::new("#document".to_string(), Vec::new())];

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(open_element(&e));
            }
            Event::Empty(e) => {
                let element = open_element(&e);
                push_child(&mut stack, element);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(element) = stack.pop() {
                        push_child(&mut stack, element);
                    }
                }
            }
            Event::Text(e) => {
                let raw = String::from_utf8_lossy(e.as_ref());
                let text = unescape(&raw).map(|t| t.into_owned()).unwrap_or_else(|_| raw.to_string());
                append_text(&mut stack, &text);
            }
            Event::CData(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::GeneralRef(e) => {
                let reference = format!("&{};", String::from_utf8_lossy(e.as_ref()));
                let text = unescape(&reference)
                    .map(|t| t.into_owned())
                    .unwrap_or(reference);
                append_text(&mut stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Unclosed elements are folded into their parents.
    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            push_child(&mut stack, element);
        }
    }

    stack
        .pop()
        .ok_or_else(|| ScrapeError::DataFormat("empty XML document".to_string()))
}

fn open_element(e: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw).map(|v| v.into_owned()).unwrap_or_else(|_| raw.to_string());
            (key, value)
        })
        .collect();

    Element::new(name, attrs)
}

fn push_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

/// Suffix after the last hyphen of a Blogger ID such as
/// `tag:blogger.com,1999:blog-1234.post-5678`.
pub fn id_suffix(raw: &str) -> &str {
    raw.trim().rsplit('-').next().unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSearch {
    pub start_index: u64,
    pub total_results: u64,
    pub items_per_page: u64,
}

impl OpenSearch {
    /// Reads the `opensearch:*` pagination elements anywhere in the document.
    pub fn from_document(root: &Element) -> Result<Self> {
        Ok(Self {
            start_index: opensearch_number(root, "opensearch:startindex")?,
            total_results: opensearch_number(root, "opensearch:totalresults")?,
            items_per_page: opensearch_number(root, "opensearch:itemsperpage")?,
        })
    }
}

fn opensearch_number(root: &Element, name: &str) -> Result<u64> {
    let element = root
        .find(name)
        .ok_or_else(|| ScrapeError::DataFormat(format!("missing <{name}>")))?;

    element
        .text
        .trim()
        .parse()
        .map_err(|_| ScrapeError::DataFormat(format!("<{name}> is not a number: {:?}", element.text)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomAuthor {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub email: Option<String>,
    pub image_src: Option<String>,
}

impl AtomAuthor {
    pub fn from_element(element: &Element) -> Self {
        Self {
            name: element.child_text("name"),
            uri: element.child_text("uri"),
            email: element.child_text("email"),
            image_src: element
                .child("gd:image")
                .and_then(|img| img.attr("src"))
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomLink {
    pub rel: String,
    pub mime: Option<String>,
    pub href: String,
}

impl AtomLink {
    pub fn from_element(element: &Element) -> Option<Self> {
        let href = element.attr("href")?.to_string();
        let rel = element
            .attr("rel")
            .and_then(|rel| rel.split_whitespace().next())
            .unwrap_or("alternate")
            .to_string();

        Some(Self {
            rel,
            mime: element.attr("type").map(str::to_string),
            href,
        })
    }

    pub fn is(&self, rel: &str, mime: &str) -> bool {
        self.rel == rel && self.mime.as_deref() == Some(mime)
    }
}

/// An `<entry>` of an Atom feed (posts or comments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub published: String,
    pub updated: Option<String>,
    pub author: Option<AtomAuthor>,
    pub links: Vec<AtomLink>,
}

impl AtomEntry {
    /// Reads an article entry. Fails when the element is not an `entry` or a
    /// required sub-tag (`id`, `title`, `published`, `content`/`summary`) is
    /// missing.
    pub fn from_element(element: &Element) -> Result<Self> {
        if element.name != "entry" {
            return Err(ScrapeError::Validation(format!(
                "expected an <entry> tag for an Atom article, found <{}>",
                element.name
            )));
        }

        let required = |name: &str| {
            element.child(name).map(|c| c.text.clone()).ok_or_else(|| {
                ScrapeError::Validation(format!("Atom entry has no <{name}> tag"))
            })
        };

        let content = match element.child("content").or_else(|| element.child("summary")) {
            Some(c) => c.text.clone(),
            None => return Err(ScrapeError::Validation("Atom entry has no <content> tag".to_string())),
        };

        Ok(Self {
            id: required("id")?.trim().to_string(),
            title: required("title")?.trim().to_string(),
            content,
            published: required("published")?.trim().to_string(),
            updated: element.child_text("updated"),
            author: element.child("author").map(AtomAuthor::from_element),
            links: element
                .children_named("link")
                .filter_map(AtomLink::from_element)
                .collect(),
        })
    }

    pub fn link(&self, rel: &str, mime: &str) -> Option<&AtomLink> {
        self.links.iter().find(|l| l.is(rel, mime))
    }
}

/// Entries of a comment feed, which are read leniently: every field may be
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomCommentEntry {
    pub id: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub author: Option<AtomAuthor>,
}

impl AtomCommentEntry {
    pub fn from_element(element: &Element) -> Self {
        Self {
            id: element.child_text("id"),
            content: element.child("content").map(|c| c.text.clone()),
            published: element.child_text("published"),
            updated: element.child_text("updated"),
            author: element.child("author").map(AtomAuthor::from_element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:openSearch="http://a9.com/-/spec/opensearchrss/1.0/">
  <openSearch:totalResults>25</openSearch:totalResults>
  <openSearch:startIndex>1</openSearch:startIndex>
  <openSearch:itemsPerPage>10</openSearch:itemsPerPage>
  <entry>
    <id>tag:blogger.com,1999:blog-111.post-222</id>
    <published>2021-03-04T10:20:30.000-08:00</published>
    <updated>2021-03-05T10:20:30.000-08:00</updated>
    <title type="text">Fish &amp; Chips</title>
    <content type="html">&lt;p&gt;Hello&lt;/p&gt;</content>
    <link rel="replies" type="application/atom+xml" href="http://x/feeds/222/comments/default"/>
    <link rel="replies" type="text/html" href="http://x/post.html#comment-form"/>
    <link rel="self" type="application/atom+xml" href="http://x/feeds/posts/default/222"/>
    <link rel="alternate" type="text/html" href="http://x/post.html"/>
    <author>
      <name>Jane</name>
      <uri>https://www.blogger.com/profile/123456</uri>
      <email>noreply@blogger.com</email>
      <gd:image rel="http://schemas.google.com/g/2005#thumbnail" src="//img/jane.png"/>
    </author>
  </entry>
</feed>"#;

    #[test]
    fn builds_tree_with_lowercased_names() {
        let root = parse_document(ENTRY).unwrap();
        let feed = root.child("feed").unwrap();

        assert!(feed.child("opensearch:totalresults").is_some());
        assert_eq!(root.find_all("entry").len(), 1);
        assert_eq!(root.find_all("link").len(), 4);
    }

    #[test]
    fn reads_opensearch_metadata() {
        let root = parse_document(ENTRY).unwrap();
        let meta = OpenSearch::from_document(&root).unwrap();

        assert_eq!(
            meta,
            OpenSearch {
                start_index: 1,
                total_results: 25,
                items_per_page: 10
            }
        );
    }

    #[test]
    fn missing_opensearch_is_a_data_format_error() {
        let root = parse_document("<feed><openSearch:totalResults>x</openSearch:totalResults></feed>").unwrap();
        assert!(matches!(
            OpenSearch::from_document(&root),
            Err(ScrapeError::DataFormat(_))
        ));
    }

    #[test]
    fn reads_atom_entry() {
        let root = parse_document(ENTRY).unwrap();
        let entry = AtomEntry::from_element(root.find("entry").unwrap()).unwrap();

        assert_eq!(id_suffix(&entry.id), "222");
        assert_eq!(entry.title, "Fish & Chips");
        assert_eq!(entry.content, "<p>Hello</p>");
        assert_eq!(entry.updated.as_deref(), Some("2021-03-05T10:20:30.000-08:00"));
        assert_eq!(
            entry.link("replies", ATOM_MIME).map(|l| l.href.as_str()),
            Some("http://x/feeds/222/comments/default")
        );
        assert_eq!(
            entry.link("alternate", HTML_MIME).map(|l| l.href.as_str()),
            Some("http://x/post.html")
        );

        let author = entry.author.unwrap();
        assert_eq!(author.name.as_deref(), Some("Jane"));
        assert_eq!(author.image_src.as_deref(), Some("//img/jane.png"));
    }

    #[test]
    fn rejects_wrong_tag() {
        let root = parse_document("<item><title>x</title></item>").unwrap();
        let err = AtomEntry::from_element(root.child("item").unwrap()).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation(_)));
    }

    #[test]
    fn rejects_entry_without_published() {
        let root = parse_document("<entry><id>a-1</id><title>t</title><content>c</content></entry>").unwrap();
        let err = AtomEntry::from_element(root.child("entry").unwrap()).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation(_)));
    }

    #[test]
    fn cdata_is_kept_verbatim() {
        let root = parse_document("<content><![CDATA[<b>bold</b> & more]]></content>").unwrap();
        assert_eq!(root.child("content").unwrap().text, "<b>bold</b> & more");
    }

    #[test]
    fn id_suffix_takes_text_after_last_hyphen() {
        assert_eq!(id_suffix("tag:blogger.com,1999:blog-1.post-987"), "987");
        assert_eq!(id_suffix("plain"), "plain");
    }
}
