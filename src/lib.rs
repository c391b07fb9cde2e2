//! Scrapes articles, authors and comments from the Atom or RSS feed of a
//! Blogger site and exports them to SQLite or JSON.
//!
//! The flow is [`Blogsite::open`] (site checks and feed discovery) →
//! [`Feed`] pagination → [`Feed::fetch_all`] → [`SqlExport`] /
//! [`JsonExport`]. Conditions that degrade the result without stopping it
//! come back as [`Diagnostics`] inside an [`Outcome`].

pub mod article;
pub mod author;
pub mod blog;
pub mod comments;
pub mod config;
pub mod dates;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod feed;
pub mod fetcher;
pub mod http;
pub mod mapping;
pub mod model;
pub mod xml;

pub use blog::{Blogsite, SiteOptions};
pub use db::{SqlExport, TableNames};
pub use diagnostics::{Diagnostic, Diagnostics, Outcome};
pub use error::{Result, ScrapeError};
pub use export::{ExportData, ExportScope, JsonExport, Mappings};
pub use feed::{Feed, FeedContext, FeedKind, FeedPage};
pub use fetcher::FetchConfig;
pub use model::{Article, Author, Comment, UNKNOWN_ID};
