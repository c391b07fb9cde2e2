use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use blogger_scraper::config::{self, BlogConfig, Config, ExportFormat};
use blogger_scraper::{
    Blogsite, Diagnostics, ExportData, FetchConfig, JsonExport, SiteOptions, SqlExport,
};

/// Scrape a Blogger site's feed and export it to SQLite and/or JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the JSON configuration file
    config: PathBuf,

    /// Only fetch this page of each feed
    #[arg(short, long)]
    page: Option<u32>,

    /// Only fetch and log the first article of the page (default 1)
    #[arg(long)]
    first: bool,

    /// Strip markup from article and comment bodies
    #[arg(long)]
    plain_text: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt().with_env_filter(filter).with_target(false).init();

    let args = Cli::parse();
    let config = config::load(&args.config)?;

    info!(blogs = config.blogs.len(), "Scraper started");

    let client = Client::new();

    for blog in &config.blogs {
        if let Err(e) = scrape(&client, &config, blog, &args).await {
            error!(blog = %blog.name, error = %e, "Blog error");
        }
    }

    info!("Scraper finished");

    Ok(())
}

async fn scrape(client: &Client, config: &Config, blog: &BlogConfig, args: &Cli) -> Result<()> {
    let mut diagnostics = Diagnostics::default();

    let options = SiteOptions {
        feed: blog.feed,
        plain_text: config.plain_text || args.plain_text,
        fetch: FetchConfig::from(&config.fetch),
    };
    let site = Blogsite::open(client, &blog.url, &options)
        .await?
        .merge_into(&mut diagnostics);
    let feed = &site.feed;
    info!(blog = %blog.name, "{feed}");

    if args.first {
        let page = args.page.unwrap_or(1);
        match feed.fetch_first(page).await?.merge_into(&mut diagnostics) {
            Some(article) => info!(blog = %blog.name, "{article}"),
            None => info!(blog = %blog.name, page, "No article found"),
        }
        return Ok(());
    }

    let articles = feed.fetch_all(args.page).await?.merge_into(&mut diagnostics);
    let authors = feed.get_all_authors(&articles);
    let comments = feed.get_all_comments(&articles).merge_into(&mut diagnostics);

    info!(
        blog = %blog.name,
        articles = articles.len(),
        authors = authors.len(),
        comments = comments.len(),
        "Collected feed data"
    );

    let data = ExportData {
        articles,
        authors,
        comments,
    };
    let export = &config.export;
    let mappings = export.mappings(&mut diagnostics);

    for format in &export.formats {
        let path = match format {
            ExportFormat::Sql => SqlExport::new(&data, &mappings)
                .tables(export.table_names()?)
                .write(&export.output_dir)?,
            ExportFormat::Json => JsonExport::new(&data, &mappings)
                .scope(export.scope)
                .encoding(site.encoding)
                .write(&export.output_dir)?,
        }
        .merge_into(&mut diagnostics);

        info!(blog = %blog.name, path = %path.display(), "Export written");
    }

    if !diagnostics.is_empty() {
        info!(
            blog = %blog.name,
            warnings = diagnostics.len(),
            "Finished with warnings"
        );
    }

    Ok(())
}
