use crate::model::{ANONYMOUS, Author, DEFAULT_EMAIL, numeric_id};
use crate::xml::AtomAuthor;

/// Resolves an `<author>` tag, defaulting every missing part.
pub fn from_atom(tag: &AtomAuthor) -> Author {
    let uri = tag.uri.clone().unwrap_or_default();

    Author {
        id: id_from_uri(&uri),
        name: tag
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string()),
        uri,
        email: tag.email.clone().unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
        image_src: tag.image_src.clone().unwrap_or_default(),
    }
}

/// Resolves the plain RSS `<author>` string.
///
/// Blogger writes `email (Display Name)`; anything else is taken as the
/// display name as-is.
pub fn from_rss(raw: Option<&str>) -> Author {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Author::default();
    }

    if let Some((email, rest)) = raw.split_once(' ') {
        let name = rest.replace(['(', ')'], "");
        let name = name.trim();
        if email.contains('@') && !name.is_empty() {
            return Author {
                name: name.to_string(),
                email: email.to_string(),
                ..Author::default()
            };
        }
    }

    named(raw)
}

/// An author known only by display name.
pub fn named(name: &str) -> Author {
    Author {
        name: name.to_string(),
        ..Author::default()
    }
}

/// Numeric profile ID from the last path segment of a profile URI.
pub fn id_from_uri(uri: &str) -> Option<u64> {
    uri.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(numeric_id)
}
