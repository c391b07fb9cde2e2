use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use crate::article::parse_page;
use crate::diagnostics::{Diagnostic, Diagnostics, Outcome};
use crate::error::{Result, ScrapeError};
use crate::feed::{Feed, FeedContext, FeedKind, FeedPage};
use crate::http;
use crate::model::{Article, Author, Comment};

pub const MAX_WORKERS: usize = 10;
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Pages fetched at the same time by `fetch_all`.
    pub workers: usize,
    /// Total GETs per page before giving up on non-200 answers.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: MAX_WORKERS,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl Feed {
    /// First article of the given page (1-based).
    pub async fn fetch_first(&self, page_number: u32) -> Result<Outcome<Option<Article>>> {
        let mut diagnostics = Diagnostics::default();

        let Some(page) = self.pages.get(&page_number) else {
            diagnostics.push(Diagnostic::UnknownPage(page_number));
            return Ok(Outcome::new(None, diagnostics));
        };

        let body = fetch_page_body(&self.ctx, page).await?;
        let entries = parse_page(&body, page.kind)?;

        let Some(entry) = entries.first() else {
            diagnostics.push(Diagnostic::EmptyPage(page_number));
            return Ok(Outcome::new(None, diagnostics));
        };

        let article = entry.normalize(&self.ctx).await?.merge_into(&mut diagnostics);
        Ok(Outcome::new(Some(article), diagnostics))
    }

    /// Articles of one page, or of every page when `page_number` is `None`.
    ///
    /// All pages are fetched by at most `workers` concurrent tasks; each task
    /// sends its batch over a channel and the batches are merged here. The
    /// first fatal error from any page aborts the whole pass.
    pub async fn fetch_all(&self, page_number: Option<u32>) -> Result<Outcome<Vec<Article>>> {
        let mut diagnostics = Diagnostics::default();

        if let Some(number) = page_number {
            let Some(page) = self.pages.get(&number) else {
                diagnostics.push(Diagnostic::UnknownPage(number));
                return Ok(Outcome::new(Vec::new(), diagnostics));
            };
            let articles = fetch_page(&self.ctx, page).await?.merge_into(&mut diagnostics);
            return Ok(Outcome::new(articles, diagnostics));
        }

        if self.pages.is_empty() {
            return Ok(Outcome::new(Vec::new(), diagnostics));
        }

        let semaphore = Arc::new(Semaphore::new(self.ctx.fetch.workers.max(1)));
        let (tx, mut rx) = mpsc::channel(self.pages.len());
        let mut handles = Vec::with_capacity(self.pages.len());

        for page in self.pages.values().cloned() {
            let ctx = self.ctx.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = fetch_page(&ctx, &page).await;
                if tx.send((page.number, result)).await.is_err() {
                    debug!(page = page.number, "Collector gone, dropping page batch");
                }
            }));
        }
        drop(tx);

        let mut batches = BTreeMap::new();
        while let Some((number, result)) = rx.recv().await {
            match result {
                Ok(outcome) => {
                    batches.insert(number, outcome.merge_into(&mut diagnostics));
                }
                Err(err) => {
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(err);
                }
            }
        }

        for handle in handles {
            handle.await?;
        }

        let articles: Vec<Article> = batches.into_values().flatten().collect();
        info!(
            url = %self.url,
            pages = self.pages.len(),
            articles = articles.len(),
            "Fetched all feed pages"
        );

        Ok(Outcome::new(articles, diagnostics))
    }

    /// Distinct authors of the articles and of their comments.
    pub fn get_all_authors(&self, articles: &[Article]) -> Vec<Author> {
        collect_authors(articles)
    }

    /// Distinct comments of the articles. RSS feeds have none.
    pub fn get_all_comments(&self, articles: &[Article]) -> Outcome<Vec<Comment>> {
        let mut diagnostics = Diagnostics::default();

        if self.kind == FeedKind::Rss {
            diagnostics.push(Diagnostic::RssHasNoComments);
            return Outcome::new(Vec::new(), diagnostics);
        }

        Outcome::new(collect_comments(articles), diagnostics)
    }
}

pub fn collect_authors(articles: &[Article]) -> Vec<Author> {
    let mut seen = HashSet::new();
    let mut authors = Vec::new();

    let all = articles.iter().flat_map(|article| {
        std::iter::once(&article.author).chain(article.comments.iter().map(|c| &c.author))
    });

    for author in all {
        if seen.insert(author.key()) {
            authors.push(author.clone());
        }
    }

    authors
}

pub fn collect_comments(articles: &[Article]) -> Vec<Comment> {
    let mut seen = HashSet::new();
    let mut comments = Vec::new();

    for comment in articles.iter().flat_map(|a| a.comments.iter()) {
        if seen.insert(comment.key()) {
            comments.push(comment.clone());
        }
    }

    comments
}

/// Fetches, parses and normalizes one page, then checks the article count
/// against what the pagination promised.
pub async fn fetch_page(ctx: &FeedContext, page: &FeedPage) -> Result<Outcome<Vec<Article>>> {
    let mut diagnostics = Diagnostics::default();

    let body = fetch_page_body(ctx, page).await?;
    let entries = parse_page(&body, page.kind)?;

    let mut articles = Vec::with_capacity(entries.len());
    for entry in &entries {
        articles.push(entry.normalize(ctx).await?.merge_into(&mut diagnostics));
    }

    if articles.len() != page.expected_count {
        diagnostics.push(Diagnostic::CountMismatch {
            page: page.number,
            expected: page.expected_count,
            actual: articles.len(),
        });
    }

    debug!(page = page.number, articles = articles.len(), "Fetched feed page");
    Ok(Outcome::new(articles, diagnostics))
}

/// GETs a page body, retrying non-200 answers with a fixed delay.
/// Transport failures are not retried.
pub async fn fetch_page_body(ctx: &FeedContext, page: &FeedPage) -> Result<String> {
    let max_attempts = ctx.fetch.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let response = http::get(&ctx.client, &page.url).await?;
        let status = response.status();

        if status == StatusCode::OK {
            return http::read_text(response, page.encoding).await;
        }

        if attempt >= max_attempts {
            return Err(ScrapeError::RetriesExhausted {
                status,
                url: page.url.clone(),
                attempts: attempt,
            });
        }

        warn!(
            page = page.number,
            url = %page.url,
            %status,
            attempt,
            delay_secs = ctx.fetch.retry_delay.as_secs(),
            "Unexpected status, retrying after delay"
        );
        tokio::time::sleep(ctx.fetch.retry_delay).await;
    }
}
