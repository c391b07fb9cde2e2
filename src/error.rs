use reqwest::StatusCode;
use thiserror::Error;

/// Fatal failures. Anything recoverable is reported through
/// [`crate::diagnostics::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The transport layer could not reach the host.
    #[error("failed to connect to {url}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP status error: {status} {url}")]
    HttpStatus { status: StatusCode, url: String },
    #[error("HTTP status error: {status} {url} (gave up after {attempts} attempts)")]
    RetriesExhausted {
        status: StatusCode,
        url: String,
        attempts: u32,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    /// Neither an Atom nor an RSS `<link rel="alternate">` was advertised.
    #[error("no Atom or RSS feed advertised by {0}")]
    NoFeed(String),
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed RSS: {0}")]
    Rss(#[from] rss::Error),
    #[error("unparsable feed data: {0}")]
    DataFormat(String),
    #[error("table name `{0}` is already used by another table")]
    TableNameCollision(String),
    #[error("`{0}` is not a valid SQL identifier")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("fetch worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
