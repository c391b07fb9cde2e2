use reqwest::StatusCode;
use tracing::debug;

use crate::author;
use crate::dates::timestamp_or_now;
use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};
use crate::error::Result;
use crate::feed::FeedContext;
use crate::http;
use crate::model::{Author, Comment, numeric_id};
use crate::xml::{self, AtomCommentEntry, Element};

/// Fetches the comment feed behind an article's `replies` link.
///
/// A non-200 answer only costs the comments; a transport failure is fatal.
pub async fn fetch_comments(
    ctx: &FeedContext,
    replies_url: &str,
    article_id: Option<u64>,
) -> Result<Outcome<Vec<Comment>>> {
    let response = http::get(&ctx.client, replies_url).await?;

    if response.status() != StatusCode::OK {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(Diagnostic::CommentsUnavailable {
            url: replies_url.to_string(),
            status: response.status().as_u16(),
        });
        return Ok(Outcome::new(Vec::new(), diagnostics));
    }

    let body = http::read_text(response, ctx.encoding).await?;
    let root = xml::parse_document(&body)?;
    let outcome = parse_comment_feed(&root, article_id, ctx.plain_text);

    debug!(
        url = replies_url,
        article_id = ?article_id,
        comments = outcome.value.len(),
        "Fetched comments"
    );

    Ok(outcome)
}

/// Normalizes every `<entry>` of a comment feed.
pub fn parse_comment_feed(
    root: &Element,
    article_id: Option<u64>,
    plain_text: bool,
) -> Outcome<Vec<Comment>> {
    let mut diagnostics = Diagnostics::default();

    let comments = root
        .find_all("entry")
        .into_iter()
        .map(|element| {
            let entry = AtomCommentEntry::from_element(element);
            normalize_comment(&entry, article_id, plain_text, &mut diagnostics)
        })
        .collect();

    Outcome::new(comments, diagnostics)
}

pub fn normalize_comment(
    entry: &AtomCommentEntry,
    article_id: Option<u64>,
    plain_text: bool,
    diagnostics: &mut Diagnostics,
) -> Comment {
    let id = entry
        .id
        .as_deref()
        .and_then(|raw| numeric_id(xml::id_suffix(raw)));

    let published = timestamp_or_now(
        entry.published.as_deref().unwrap_or_default(),
        "comment published",
        diagnostics,
    );
    let updated = match entry.updated.as_deref() {
        Some(raw) => timestamp_or_now(raw, "comment updated", diagnostics),
        None => published,
    };

    if article_id.is_none() {
        diagnostics.push(Diagnostic::MissingBackref { comment_id: id });
    }

    let content = entry.content.clone().unwrap_or_default();

    Comment {
        id,
        content: if plain_text {
            crate::article::strip_markup(&content)
        } else {
            content
        },
        published,
        updated,
        author: entry
            .author
            .as_ref()
            .map(author::from_atom)
            .unwrap_or_else(Author::default),
        article_id,
    }
}
