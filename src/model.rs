use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Written in place of identifiers that could not be determined.
pub const UNKNOWN_ID: i64 = -1;

pub const ANONYMOUS: &str = "Anonymous";
pub const DEFAULT_EMAIL: &str = "noreply@blogger.com";

/// Parses a numeric Blogger identifier. Profile, post and comment IDs are
/// unsigned and may exceed `i64::MAX`.
pub fn numeric_id(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Formats an optional identifier, using [`UNKNOWN_ID`] when it is missing.
pub struct DisplayId(pub Option<u64>);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "{UNKNOWN_ID}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Author {
    pub id: Option<u64>,
    pub name: String,
    pub uri: String,
    pub email: String,
    pub image_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthorKey {
    Id(u64),
    Profile { name: String, uri: String },
}

impl Author {
    pub fn key(&self) -> AuthorKey {
        match self.id {
            Some(id) => AuthorKey::Id(id),
            None => AuthorKey::Profile {
                name: self.name.clone(),
                uri: self.uri.clone(),
            },
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self {
            id: None,
            name: ANONYMOUS.to_string(),
            uri: String::new(),
            email: DEFAULT_EMAIL.to_string(),
            image_src: String::new(),
        }
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Author {}

impl Hash for Author {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: Option<u64>,
    pub content: String,
    pub published: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub author: Author,
    /// Identifier of the owning article.
    pub article_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentKey {
    Id(u64),
    Body {
        content: String,
        published: DateTime<FixedOffset>,
    },
}

impl Comment {
    pub fn key(&self) -> CommentKey {
        match self.id {
            Some(id) => CommentKey::Id(id),
            None => CommentKey::Body {
                content: self.content.clone(),
                published: self.published,
            },
        }
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Comment {}

impl Hash for Comment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "comment {} by {} on article {}",
            DisplayId(self.id),
            self.author.name,
            DisplayId(self.article_id)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub id: Option<u64>,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub published: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub blog_link: Option<String>,
    pub feed_link: Option<String>,
    pub comments: Vec<Comment>,
}

/// Article identity: the numeric ID when there is one, else title plus
/// publication day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArticleKey {
    Id(u64),
    Derived { title: String, day: NaiveDate },
}

impl Article {
    pub fn key(&self) -> ArticleKey {
        match self.id {
            Some(id) => ArticleKey::Id(id),
            None => ArticleKey::Derived {
                title: self.title.clone(),
                day: self.published.date_naive(),
            },
        }
    }
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "article {} {:?} by {}, published {}",
            DisplayId(self.id),
            self.title,
            self.author.name,
            self.published.format("%d/%b/%Y")
        )
    }
}
