use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, ToSql, params};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::{Result, ScrapeError};
use crate::export::{ExportData, Mappings, prepare_output_dir, timestamp_suffix};
use crate::mapping::{ArticleField, AuthorField, CommentField, Field};
use crate::model::{Author, AuthorKey};

/// Names of the three entity tables. The junction table is
/// `<articles>_<comments>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    articles: String,
    authors: String,
    comments: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            articles: "articles".to_string(),
            authors: "authors".to_string(),
            comments: "comments".to_string(),
        }
    }
}

impl TableNames {
    /// Validates a full set of names at once: every name must be a plain
    /// identifier and the four tables (junction included) must be distinct.
    pub fn new(articles: &str, authors: &str, comments: &str) -> Result<Self> {
        let tables = Self {
            articles: checked_identifier(articles)?,
            authors: checked_identifier(authors)?,
            comments: checked_identifier(comments)?,
        };

        let junction = tables.junction();
        let names = [
            tables.articles.as_str(),
            tables.authors.as_str(),
            tables.comments.as_str(),
            junction.as_str(),
        ];
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(ScrapeError::TableNameCollision(name.to_string()));
            }
        }

        Ok(tables)
    }

    pub fn articles(&self) -> &str {
        &self.articles
    }

    pub fn authors(&self) -> &str {
        &self.authors
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn junction(&self) -> String {
        format!("{}_{}", self.articles, self.comments)
    }

    pub fn name_articles(&mut self, name: &str) -> Result<()> {
        *self = Self::new(name, &self.authors, &self.comments)?;
        Ok(())
    }

    pub fn name_authors(&mut self, name: &str) -> Result<()> {
        *self = Self::new(&self.articles, name, &self.comments)?;
        Ok(())
    }

    pub fn name_comments(&mut self, name: &str) -> Result<()> {
        *self = Self::new(&self.articles, &self.authors, name)?;
        Ok(())
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
fn checked_identifier(name: &str) -> Result<String> {
    if identifier_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(ScrapeError::InvalidIdentifier(name.to_string()))
    }
}

pub struct SqlExport<'a> {
    data: &'a ExportData,
    mappings: &'a Mappings,
    tables: TableNames,
}

impl<'a> SqlExport<'a> {
    pub fn new(data: &'a ExportData, mappings: &'a Mappings) -> Self {
        Self {
            data,
            mappings,
            tables: TableNames::default(),
        }
    }

    pub fn tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    /// Writes `sql_export-<timestamp>.db` into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<Outcome<PathBuf>> {
        let mut diagnostics = Diagnostics::default();
        let dir = prepare_output_dir(output_dir)?.merge_into(&mut diagnostics);
        let path = dir.join(format!("sql_export-{}.db", timestamp_suffix()));

        let mut conn = Connection::open(&path)?;
        self.write_to(&mut conn)?;

        info!(path = %path.display(), "Wrote SQL export");
        Ok(Outcome::new(path, diagnostics))
    }

    /// Creates the four tables on `conn` and fills them in one transaction.
    ///
    /// Identifier and reference columns are declared without a type, so a
    /// Blogger ID above `i64::MAX` is stored as its decimal TEXT and smaller
    /// ones as INTEGER. Rows without a Blogger ID get negative keys (`-1`,
    /// `-2`, ...) that are unique within their table.
    pub fn write_to(&self, conn: &mut Connection) -> Result<()> {
        let a = &self.mappings.articles;
        let u = &self.mappings.authors;
        let c = &self.mappings.comments;

        let article_cols = ArticleField::ALL
            .iter()
            .filter(|f| **f != ArticleField::Comments)
            .map(|f| checked_identifier(a.get(*f)))
            .collect::<Result<Vec<_>>>()?;
        let author_cols = AuthorField::ALL
            .iter()
            .map(|f| checked_identifier(u.get(*f)))
            .collect::<Result<Vec<_>>>()?;
        let comment_cols = [
            CommentField::CommentId,
            CommentField::Content,
            CommentField::PublishedDate,
            CommentField::LastUpdatedDate,
            CommentField::Author,
        ]
        .iter()
        .map(|f| checked_identifier(c.get(*f)))
        .collect::<Result<Vec<_>>>()?;

        let tables = TableNames::new(
            self.tables.articles(),
            self.tables.authors(),
            self.tables.comments(),
        )?;
        let articles = tables.articles();
        let authors = tables.authors();
        let comments = tables.comments();
        let junction = tables.junction();

        let tx = conn.transaction()?;

        tx.execute_batch(&format!(
            "
            CREATE TABLE {articles} (
                {} PRIMARY KEY NOT NULL,
                {} VARCHAR(255) NOT NULL,
                {} TEXT NOT NULL,
                {},
                {} DATETIME NOT NULL,
                {} DATETIME NOT NULL,
                {} VARCHAR(255),
                {} VARCHAR(255)
            );

            CREATE TABLE {authors} (
                {} PRIMARY KEY NOT NULL,
                {} VARCHAR(255) NOT NULL,
                {} VARCHAR(255),
                {} VARCHAR(255),
                {} VARCHAR(255)
            );

            CREATE TABLE {comments} (
                {} PRIMARY KEY NOT NULL,
                {} TEXT NOT NULL,
                {} DATETIME NOT NULL,
                {} DATETIME NOT NULL,
                {}
            );

            CREATE TABLE {junction} (
                {} NOT NULL,
                {} NOT NULL
            );
            ",
            article_cols[0],
            article_cols[1],
            article_cols[2],
            article_cols[3],
            article_cols[4],
            article_cols[5],
            article_cols[6],
            article_cols[7],
            author_cols[0],
            author_cols[1],
            author_cols[2],
            author_cols[3],
            author_cols[4],
            comment_cols[0],
            comment_cols[1],
            comment_cols[2],
            comment_cols[3],
            comment_cols[4],
            article_cols[0],
            comment_cols[0],
        ))?;

        // Authors first: articles and comments refer to their keys.
        let mut author_keys = LocalKeys::default();
        let mut anonymous: HashMap<AuthorKey, RowKey> = HashMap::new();
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {authors} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                author_cols.join(", ")
            ))?;
            for author in &self.data.authors {
                let key = match author.id {
                    Some(id) => RowKey::Blogger(id),
                    None => *anonymous
                        .entry(author.key())
                        .or_insert_with(|| author_keys.next()),
                };
                stmt.execute(params![
                    key,
                    author.name,
                    author.uri,
                    author.email,
                    author.image_src
                ])?;
            }
        }

        let author_ref = |author: &Author| -> Option<RowKey> {
            match author.id {
                Some(id) => Some(RowKey::Blogger(id)),
                None => anonymous.get(&author.key()).copied(),
            }
        };

        {
            let mut article_keys = LocalKeys::default();
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {articles} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                article_cols.join(", ")
            ))?;
            for article in &self.data.articles {
                stmt.execute(params![
                    article_keys.key_for(article.id),
                    article.title,
                    article.content,
                    author_ref(&article.author),
                    article.published.to_rfc3339(),
                    article.updated.to_rfc3339(),
                    article.blog_link,
                    article.feed_link
                ])?;
            }
        }

        let mut linked = 0usize;
        {
            let mut comment_keys = LocalKeys::default();
            let mut insert_comment = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {comments} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                comment_cols.join(", ")
            ))?;
            let mut insert_link = tx.prepare(&format!(
                "INSERT INTO {junction} ({}, {}) VALUES (?1, ?2)",
                article_cols[0], comment_cols[0]
            ))?;

            for comment in &self.data.comments {
                let key = comment_keys.key_for(comment.id);
                let inserted = insert_comment.execute(params![
                    key,
                    comment.content,
                    comment.published.to_rfc3339(),
                    comment.updated.to_rfc3339(),
                    author_ref(&comment.author)
                ])?;

                if let (true, Some(article_id)) = (inserted > 0, comment.article_id) {
                    insert_link.execute(params![RowKey::Blogger(article_id), key])?;
                    linked += 1;
                }
            }
        }

        tx.commit()?;

        debug!(
            articles = self.data.articles.len(),
            authors = self.data.authors.len(),
            comments = self.data.comments.len(),
            linked,
            "Inserted export rows"
        );

        Ok(())
    }
}

/// Value of an identifier or reference column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Blogger(u64),
    /// Assigned by the writer, always negative.
    Local(i64),
}

impl ToSql for RowKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            RowKey::Blogger(id) => match i64::try_from(id) {
                Ok(id) => ToSqlOutput::from(id),
                Err(_) => ToSqlOutput::from(id.to_string()),
            },
            RowKey::Local(key) => ToSqlOutput::from(key),
        })
    }
}

#[derive(Debug, Default)]
struct LocalKeys {
    issued: i64,
}

impl LocalKeys {
    fn next(&mut self) -> RowKey {
        self.issued -= 1;
        RowKey::Local(self.issued)
    }

    fn key_for(&mut self, id: Option<u64>) -> RowKey {
        match id {
            Some(id) => RowKey::Blogger(id),
            None => self.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_must_not_collide() {
        let mut tables = TableNames::default();

        assert!(matches!(
            tables.name_articles("comments"),
            Err(ScrapeError::TableNameCollision(_))
        ));
        assert!(matches!(
            tables.name_comments("authors"),
            Err(ScrapeError::TableNameCollision(_))
        ));

        tables.name_articles("posts").unwrap();
        assert_eq!(tables.junction(), "posts_comments");
    }

    #[test]
    fn swapped_table_names_are_accepted() {
        let tables = TableNames::new("authors", "articles", "comments").unwrap();
        assert_eq!(tables.articles(), "authors");
        assert_eq!(tables.authors(), "articles");
        assert_eq!(tables.junction(), "authors_comments");
    }

    #[test]
    fn entity_table_may_not_shadow_junction() {
        assert!(matches!(
            TableNames::new("articles", "articles_comments", "comments"),
            Err(ScrapeError::TableNameCollision(name)) if name == "articles_comments"
        ));
    }

    #[test]
    fn table_names_must_be_identifiers() {
        let mut tables = TableNames::default();
        assert!(matches!(
            tables.name_authors("people; DROP TABLE x"),
            Err(ScrapeError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn large_blogger_ids_bind_as_text() {
        let conn = Connection::open_in_memory().unwrap();
        let stored = |key: RowKey| -> String {
            conn.query_row("SELECT typeof(?1)", [key], |row| row.get(0))
                .unwrap()
        };

        assert_eq!(stored(RowKey::Blogger(42)), "integer");
        assert_eq!(stored(RowKey::Blogger(i64::MAX as u64)), "integer");
        assert_eq!(stored(RowKey::Blogger(16258312240222542576)), "text");
        assert_eq!(stored(RowKey::Local(-1)), "integer");
    }

    #[test]
    fn local_keys_are_negative_and_distinct() {
        let mut keys = LocalKeys::default();
        assert_eq!(keys.key_for(Some(7)), RowKey::Blogger(7));
        assert_eq!(keys.key_for(None), RowKey::Local(-1));
        assert_eq!(keys.next(), RowKey::Local(-2));
    }
}
