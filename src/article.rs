//! Article normalization.
//!
//! A feed page is read into [`FeedEntry`] values, one variant per feed
//! kind, and each entry is normalized into the unified [`Article`].

use rss::Channel;
use scraper::Html;
use tracing::debug;

use crate::author;
use crate::comments;
use crate::dates::timestamp_or_now;
use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::{Result, ScrapeError};
use crate::feed::{FeedContext, FeedKind};
use crate::model::{Article, numeric_id};
use crate::xml::{self, ATOM_MIME, AtomEntry, HTML_MIME};

/// An `<item>` of an RSS channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssItem {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub link: Option<String>,
    pub pub_date: String,
    /// Blogger's `atom:updated` extension.
    pub updated: Option<String>,
}

impl RssItem {
    pub fn from_item(item: &rss::Item) -> Result<Self> {
        let guid = item
            .guid()
            .map(|g| g.value().trim().to_string())
            .ok_or_else(|| ScrapeError::Validation("RSS item has no <guid> tag".to_string()))?;
        let title = item
            .title()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| ScrapeError::Validation("RSS item has no <title> tag".to_string()))?;
        let pub_date = item
            .pub_date()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::Validation("RSS item has no <pubDate> tag".to_string()))?;
        // content:encoded stands in for a missing description
        let description = item
            .description()
            .or_else(|| item.content())
            .map(str::to_string)
            .ok_or_else(|| {
                ScrapeError::Validation("RSS item has no <description> tag".to_string())
            })?;

        let updated = item
            .extensions()
            .iter()
            .filter(|(prefix, _)| prefix.eq_ignore_ascii_case("atom"))
            .filter_map(|(_, elements)| elements.get("updated"))
            .flat_map(|values| values.iter())
            .find_map(|ext| ext.value().map(str::to_string));

        Ok(Self {
            guid,
            title,
            description,
            author: item.author().map(str::to_string),
            link: item.link().map(str::to_string),
            pub_date,
            updated,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    Atom(AtomEntry),
    Rss(RssItem),
}

impl FeedEntry {
    /// Produces the unified article. Atom entries fetch their comment feed
    /// here; RSS articles never carry comments.
    pub async fn normalize(&self, ctx: &FeedContext) -> Result<Outcome<Article>> {
        match self {
            FeedEntry::Atom(entry) => normalize_atom(entry, ctx).await,
            FeedEntry::Rss(item) => Ok(normalize_rss(item, ctx.plain_text)),
        }
    }
}

/// Reads every entry (Atom) or item (RSS) of a feed page.
pub fn parse_page(body: &str, kind: FeedKind) -> Result<Vec<FeedEntry>> {
    match kind {
        FeedKind::Atom => {
            let root = xml::parse_document(body)?;
            root.find_all("entry")
                .into_iter()
                .map(|element| AtomEntry::from_element(element).map(FeedEntry::Atom))
                .collect()
        }
        FeedKind::Rss => {
            let channel = Channel::read_from(body.as_bytes())?;
            channel
                .items()
                .iter()
                .map(|item| RssItem::from_item(item).map(FeedEntry::Rss))
                .collect()
        }
    }
}

async fn normalize_atom(entry: &AtomEntry, ctx: &FeedContext) -> Result<Outcome<Article>> {
    let mut diagnostics = Diagnostics::default();

    let id = numeric_id(xml::id_suffix(&entry.id));
    let published = timestamp_or_now(&entry.published, "published", &mut diagnostics);
    let updated = match &entry.updated {
        Some(raw) => timestamp_or_now(raw, "updated", &mut diagnostics),
        None => published,
    };

    let comments = match entry.link("replies", ATOM_MIME) {
        Some(replies) => comments::fetch_comments(ctx, &replies.href, id)
            .await?
            .merge_into(&mut diagnostics),
        None => Vec::new(),
    };

    let feed_link = entry
        .links
        .iter()
        .find(|l| l.rel == "self")
        .map(|l| l.href.clone());
    let blog_link = entry.link("alternate", HTML_MIME).map(|l| l.href.clone());

    debug!(id = ?id, title = %entry.title, comments = comments.len(), "Normalized Atom entry");

    Ok(Outcome::new(
        Article {
            id,
            title: entry.title.clone(),
            content: body_text(&entry.content, ctx.plain_text),
            author: entry
                .author
                .as_ref()
                .map(author::from_atom)
                .unwrap_or_default(),
            published,
            updated,
            blog_link,
            feed_link,
            comments,
        },
        diagnostics,
    ))
}

fn normalize_rss(item: &RssItem, plain_text: bool) -> Outcome<Article> {
    let mut diagnostics = Diagnostics::default();

    let published = timestamp_or_now(&item.pub_date, "published", &mut diagnostics);
    let updated = match &item.updated {
        Some(raw) => timestamp_or_now(raw, "updated", &mut diagnostics),
        None => published,
    };

    Outcome::new(
        Article {
            id: numeric_id(xml::id_suffix(&item.guid)),
            title: item.title.clone(),
            content: body_text(&item.description, plain_text),
            author: author::from_rss(item.author.as_deref()),
            published,
            updated,
            blog_link: item.link.clone(),
            feed_link: None,
            comments: Vec::new(),
        },
        diagnostics,
    )
}

fn body_text(content: &str, plain_text: bool) -> String {
    if plain_text {
        strip_markup(content)
    } else {
        content.to_string()
    }
}

/// Text content of an HTML fragment.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}
