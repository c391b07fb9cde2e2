use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::feed::FeedKind;
use crate::model::DisplayId;

/// A degraded-but-continuing condition. Callers inspect these explicitly
/// instead of relying on log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    FeedFallback {
        preferred: FeedKind,
        used: FeedKind,
    },
    PaginationUnavailable {
        url: String,
        reason: String,
    },
    UnknownPage(u32),
    EmptyPage(u32),
    CountMismatch {
        page: u32,
        expected: usize,
        actual: usize,
    },
    MissingBackref {
        comment_id: Option<u64>,
    },
    RssHasNoComments,
    TimestampFallback {
        field: &'static str,
        raw: String,
    },
    CommentsUnavailable {
        url: String,
        status: u16,
    },
    OutputDirFallback {
        path: PathBuf,
    },
    EncodingFallback {
        requested: &'static str,
    },
    UnknownMappingField {
        entity: &'static str,
        field: String,
    },
}

impl Diagnostic {
    /// Stable short identifier, used as the `code` field in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::FeedFallback { .. } => "feed-fallback",
            Diagnostic::PaginationUnavailable { .. } => "pagination-unavailable",
            Diagnostic::UnknownPage(_) => "unknown-page",
            Diagnostic::EmptyPage(_) => "empty-page",
            Diagnostic::CountMismatch { .. } => "count-mismatch",
            Diagnostic::MissingBackref { .. } => "missing-backref",
            Diagnostic::RssHasNoComments => "rss-no-comments",
            Diagnostic::TimestampFallback { .. } => "timestamp-fallback",
            Diagnostic::CommentsUnavailable { .. } => "comments-unavailable",
            Diagnostic::OutputDirFallback { .. } => "output-dir-fallback",
            Diagnostic::EncodingFallback { .. } => "encoding-fallback",
            Diagnostic::UnknownMappingField { .. } => "unknown-mapping-field",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FeedFallback { preferred, used } => {
                write!(f, "preferred {preferred} feed not found, falling back to {used}")
            }
            Diagnostic::PaginationUnavailable { url, reason } => {
                write!(f, "could not determine pagination for {url}: {reason}")
            }
            Diagnostic::UnknownPage(n) => write!(f, "page {n} is not one of the feed pages"),
            Diagnostic::EmptyPage(n) => write!(f, "page {n} contains no entries"),
            Diagnostic::CountMismatch {
                page,
                expected,
                actual,
            } => write!(f, "page {page} yielded {actual} articles, expected {expected}"),
            Diagnostic::MissingBackref { comment_id } => write!(
                f,
                "comment {} has no owning article; it is kept without article information",
                DisplayId(*comment_id)
            ),
            Diagnostic::RssHasNoComments => write!(f, "RSS feeds carry no comments"),
            Diagnostic::TimestampFallback { field, raw } => {
                write!(f, "unrecognised {field} timestamp {raw:?}, using current time")
            }
            Diagnostic::CommentsUnavailable { url, status } => {
                write!(f, "comment feed {url} returned {status}, skipping comments")
            }
            Diagnostic::OutputDirFallback { path } => write!(
                f,
                "default output directory is unusable, writing to {}",
                path.display()
            ),
            Diagnostic::EncodingFallback { requested } => write!(
                f,
                "export holds characters {requested} cannot represent, writing UTF-8 instead"
            ),
            Diagnostic::UnknownMappingField { entity, field } => {
                write!(f, "unknown {entity} field {field:?} in mapping")
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Records a diagnostic and emits it as a warning.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(code = diagnostic.code(), "{diagnostic}");
        self.0.push(diagnostic);
    }

    /// Moves already-reported diagnostics over without logging them again.
    pub fn append(&mut self, mut other: Diagnostics) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.0.iter().any(|d| d.code() == code)
    }
}

/// A value plus the non-fatal conditions met while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    /// Hands the diagnostics to `sink` and returns the bare value.
    pub fn merge_into(self, sink: &mut Diagnostics) -> T {
        sink.append(self.diagnostics);
        self.value
    }
}
