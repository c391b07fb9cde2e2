//! Export-time renaming of entity fields.
//!
//! Each entity has a fixed set of logical fields; a [`FieldMapping`] maps
//! them to output column or key names and defaults to the logical name.

use std::collections::HashMap;
use std::hash::Hash;

use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};

pub trait Field: Copy + Eq + Hash + 'static {
    const ENTITY: &'static str;
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleField {
    ArticleId,
    Title,
    Content,
    Author,
    PublishedDate,
    LastEditedDate,
    BlogLink,
    FeedLink,
    Comments,
}

impl Field for ArticleField {
    const ENTITY: &'static str = "article";
    const ALL: &'static [Self] = &[
        ArticleField::ArticleId,
        ArticleField::Title,
        ArticleField::Content,
        ArticleField::Author,
        ArticleField::PublishedDate,
        ArticleField::LastEditedDate,
        ArticleField::BlogLink,
        ArticleField::FeedLink,
        ArticleField::Comments,
    ];

    fn name(self) -> &'static str {
        match self {
            ArticleField::ArticleId => "article_id",
            ArticleField::Title => "title",
            ArticleField::Content => "content",
            ArticleField::Author => "author",
            ArticleField::PublishedDate => "published_date",
            ArticleField::LastEditedDate => "last_edited_date",
            ArticleField::BlogLink => "blog_link",
            ArticleField::FeedLink => "feed_link",
            ArticleField::Comments => "comments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorField {
    AuthorId,
    Name,
    Uri,
    Email,
    ImageSrc,
}

impl Field for AuthorField {
    const ENTITY: &'static str = "author";
    const ALL: &'static [Self] = &[
        AuthorField::AuthorId,
        AuthorField::Name,
        AuthorField::Uri,
        AuthorField::Email,
        AuthorField::ImageSrc,
    ];

    fn name(self) -> &'static str {
        match self {
            AuthorField::AuthorId => "author_id",
            AuthorField::Name => "name",
            AuthorField::Uri => "uri",
            AuthorField::Email => "email",
            AuthorField::ImageSrc => "image_src",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentField {
    CommentId,
    Content,
    PublishedDate,
    LastUpdatedDate,
    Author,
    ArticleId,
}

impl Field for CommentField {
    const ENTITY: &'static str = "comment";
    const ALL: &'static [Self] = &[
        CommentField::CommentId,
        CommentField::Content,
        CommentField::PublishedDate,
        CommentField::LastUpdatedDate,
        CommentField::Author,
        CommentField::ArticleId,
    ];

    fn name(self) -> &'static str {
        match self {
            CommentField::CommentId => "comment_id",
            CommentField::Content => "content",
            CommentField::PublishedDate => "published_date",
            CommentField::LastUpdatedDate => "last_updated_date",
            CommentField::Author => "author",
            CommentField::ArticleId => "article_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping<F: Field> {
    renames: HashMap<F, String>,
}

impl<F: Field> Default for FieldMapping<F> {
    fn default() -> Self {
        Self {
            renames: HashMap::new(),
        }
    }
}

impl<F: Field> FieldMapping<F> {
    pub fn rename(mut self, field: F, to: impl Into<String>) -> Self {
        self.renames.insert(field, to.into());
        self
    }

    /// Output name of `field`.
    pub fn get(&self, field: F) -> &str {
        self.renames
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.name())
    }

    /// Builds a mapping from logical-name → output-name pairs, skipping
    /// names that are not fields of the entity.
    pub fn from_names<'a>(names: impl IntoIterator<Item = (&'a String, &'a String)>) -> Outcome<Self> {
        let mut diagnostics = Diagnostics::default();
        let mut mapping = Self::default();

        for (logical, output) in names {
            match F::from_name(logical) {
                Some(field) => mapping = mapping.rename(field, output.clone()),
                None => diagnostics.push(Diagnostic::UnknownMappingField {
                    entity: F::ENTITY,
                    field: logical.clone(),
                }),
            }
        }

        Outcome::new(mapping, diagnostics)
    }

    /// Output names of all fields, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        F::ALL.iter().map(|f| self.get(*f))
    }
}

pub type ArticleMapping = FieldMapping<ArticleField>;
pub type AuthorMapping = FieldMapping<AuthorField>;
pub type CommentMapping = FieldMapping<CommentField>;
