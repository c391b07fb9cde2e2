use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use encoding_rs::{Encoding, UTF_8};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};
use crate::error::Result;
use crate::mapping::{
    ArticleField, ArticleMapping, AuthorField, AuthorMapping, CommentField, CommentMapping,
};
use crate::model::{Article, Author, Comment, UNKNOWN_ID};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// The collections gathered by one scrape pass.
#[derive(Debug, Clone, Default)]
pub struct ExportData {
    pub articles: Vec<Article>,
    pub authors: Vec<Author>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default)]
pub struct Mappings {
    pub articles: ArticleMapping,
    pub authors: AuthorMapping,
    pub comments: CommentMapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    #[default]
    All,
    Articles,
    Authors,
    Comments,
}

/// `DDMMYYYY-HHMMSS`, used in export file names.
pub fn timestamp_suffix() -> String {
    Local::now().format("%d%m%Y-%H%M%S").to_string()
}

/// Makes sure `dir` exists as a directory. When it cannot be used, a fresh
/// `output-tmp-<timestamp>` directory next to it is created instead.
pub fn prepare_output_dir(dir: &Path) -> Result<Outcome<PathBuf>> {
    let mut diagnostics = Diagnostics::default();

    let usable = if dir.is_dir() {
        true
    } else if dir.exists() {
        false
    } else {
        fs::create_dir_all(dir).is_ok()
    };

    if usable {
        return Ok(Outcome::new(dir.to_path_buf(), diagnostics));
    }

    let name = format!("output-tmp-{}", Local::now().format("%d%m%Y-%H%M%S%6f"));
    let fallback = match dir.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    };
    fs::create_dir_all(&fallback)?;
    diagnostics.push(Diagnostic::OutputDirFallback {
        path: fallback.clone(),
    });

    Ok(Outcome::new(fallback, diagnostics))
}

pub struct JsonExport<'a> {
    data: &'a ExportData,
    mappings: &'a Mappings,
    scope: ExportScope,
    encoding: &'static Encoding,
}

impl<'a> JsonExport<'a> {
    pub fn new(data: &'a ExportData, mappings: &'a Mappings) -> Self {
        Self {
            data,
            mappings,
            scope: ExportScope::All,
            encoding: UTF_8,
        }
    }

    pub fn scope(mut self, scope: ExportScope) -> Self {
        self.scope = scope;
        self
    }

    /// Encoding of the written file. When the document holds characters the
    /// encoding cannot represent, the file is written as UTF-8 instead and an
    /// `encoding-fallback` diagnostic is recorded.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The keyed document for the selected scope.
    pub fn document(&self) -> Value {
        let mut root = Map::new();

        if matches!(self.scope, ExportScope::All | ExportScope::Articles) {
            let articles = self.data.articles.iter().map(|a| self.article(a)).collect();
            root.insert("articles".to_string(), Value::Array(articles));
        }
        if matches!(self.scope, ExportScope::All | ExportScope::Authors) {
            let authors = self.data.authors.iter().map(|a| self.author(a)).collect();
            root.insert("authors".to_string(), Value::Array(authors));
        }
        if matches!(self.scope, ExportScope::All | ExportScope::Comments) {
            let comments = self.data.comments.iter().map(|c| self.comment(c)).collect();
            root.insert("comments".to_string(), Value::Array(comments));
        }

        Value::Object(root)
    }

    /// Writes `json_export-<timestamp>.json` into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<Outcome<PathBuf>> {
        let mut diagnostics = Diagnostics::default();
        let dir = prepare_output_dir(output_dir)?.merge_into(&mut diagnostics);
        let path = dir.join(format!("json_export-{}.json", timestamp_suffix()));

        let json = serde_json::to_string_pretty(&self.document())?;
        let (bytes, used, unmappable) = self.encoding.encode(&json);
        if unmappable {
            diagnostics.push(Diagnostic::EncodingFallback {
                requested: self.encoding.name(),
            });
            fs::write(&path, json.as_bytes())?;
        } else {
            fs::write(&path, &bytes)?;
        }

        info!(
            path = %path.display(),
            scope = ?self.scope,
            encoding = if unmappable { UTF_8.name() } else { used.name() },
            "Wrote JSON export"
        );
        Ok(Outcome::new(path, diagnostics))
    }

    fn article(&self, article: &Article) -> Value {
        let m = &self.mappings.articles;
        let comments: Vec<Value> = article.comments.iter().map(|c| self.comment(c)).collect();

        let mut obj = Map::new();
        obj.insert(m.get(ArticleField::ArticleId).into(), json_id(article.id));
        obj.insert(m.get(ArticleField::Title).into(), json!(article.title));
        obj.insert(m.get(ArticleField::Content).into(), json!(article.content));
        obj.insert(m.get(ArticleField::Author).into(), json_id(article.author.id));
        obj.insert(
            m.get(ArticleField::PublishedDate).into(),
            json!(article.published.to_rfc3339()),
        );
        obj.insert(
            m.get(ArticleField::LastEditedDate).into(),
            json!(article.updated.to_rfc3339()),
        );
        obj.insert(m.get(ArticleField::BlogLink).into(), json!(article.blog_link));
        obj.insert(m.get(ArticleField::FeedLink).into(), json!(article.feed_link));
        obj.insert(m.get(ArticleField::Comments).into(), Value::Array(comments));
        Value::Object(obj)
    }

    fn author(&self, author: &Author) -> Value {
        let m = &self.mappings.authors;

        let mut obj = Map::new();
        obj.insert(m.get(AuthorField::AuthorId).into(), json_id(author.id));
        obj.insert(m.get(AuthorField::Name).into(), json!(author.name));
        obj.insert(m.get(AuthorField::Uri).into(), json!(author.uri));
        obj.insert(m.get(AuthorField::Email).into(), json!(author.email));
        obj.insert(m.get(AuthorField::ImageSrc).into(), json!(author.image_src));
        Value::Object(obj)
    }

    fn comment(&self, comment: &Comment) -> Value {
        let m = &self.mappings.comments;

        let mut obj = Map::new();
        obj.insert(m.get(CommentField::CommentId).into(), json_id(comment.id));
        obj.insert(m.get(CommentField::Content).into(), json!(comment.content));
        obj.insert(
            m.get(CommentField::PublishedDate).into(),
            json!(comment.published.to_rfc3339()),
        );
        obj.insert(
            m.get(CommentField::LastUpdatedDate).into(),
            json!(comment.updated.to_rfc3339()),
        );
        obj.insert(m.get(CommentField::Author).into(), json_id(comment.author.id));
        obj.insert(m.get(CommentField::ArticleId).into(), json_id(comment.article_id));
        Value::Object(obj)
    }
}

/// Unknown identifiers are written as [`UNKNOWN_ID`].
fn json_id(id: Option<u64>) -> Value {
    match id {
        Some(id) => json!(id),
        None => json!(UNKNOWN_ID),
    }
}
