use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::db::TableNames;
use crate::diagnostics::Diagnostics;
use crate::export::{DEFAULT_OUTPUT_DIR, ExportScope, Mappings};
use crate::feed::FeedKind;
use crate::fetcher::{FetchConfig, MAX_ATTEMPTS, MAX_WORKERS, RETRY_DELAY};
use crate::mapping::FieldMapping;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub blogs: Vec<BlogConfig>,
    #[serde(default)]
    pub plain_text: bool,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize)]
pub struct BlogConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub feed: FeedKind,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            workers: MAX_WORKERS,
            max_attempts: MAX_ATTEMPTS,
            retry_delay_secs: RETRY_DELAY.as_secs(),
        }
    }
}

impl From<&FetchSection> for FetchConfig {
    fn from(section: &FetchSection) -> Self {
        FetchConfig {
            workers: section.workers,
            max_attempts: section.max_attempts,
            retry_delay: Duration::from_secs(section.retry_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Sql,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub formats: Vec<ExportFormat>,
    pub scope: ExportScope,
    pub output_dir: PathBuf,
    pub tables: TableConfig,
    pub mappings: MappingConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            formats: vec![ExportFormat::Sql, ExportFormat::Json],
            scope: ExportScope::All,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tables: TableConfig::default(),
            mappings: MappingConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub articles: String,
    pub authors: String,
    pub comments: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        let tables = TableNames::default();
        Self {
            articles: tables.articles().to_string(),
            authors: tables.authors().to_string(),
            comments: tables.comments().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub articles: HashMap<String, String>,
    pub authors: HashMap<String, String>,
    pub comments: HashMap<String, String>,
}

impl ExportConfig {
    pub fn mappings(&self, diagnostics: &mut Diagnostics) -> Mappings {
        Mappings {
            articles: FieldMapping::from_names(&self.mappings.articles).merge_into(diagnostics),
            authors: FieldMapping::from_names(&self.mappings.authors).merge_into(diagnostics),
            comments: FieldMapping::from_names(&self.mappings.comments).merge_into(diagnostics),
        }
    }

    /// Validates the configured table names as one set.
    pub fn table_names(&self) -> Result<TableNames> {
        let tables = &self.tables;
        Ok(TableNames::new(&tables.articles, &tables.authors, &tables.comments)?)
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&text)?;
    Ok(config)
}
