use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use news_core::RawArticle;
use news_index::{ArticleStore, Embedder, IngestionPipeline};
use serde::Deserialize;
use tracing::{info, Level};

/// News Article Ingestion CLI
///
/// Reads a fetched-articles JSON document, normalizes and embeds the
/// articles, and upserts them into the Qdrant vector index (keyed by URL,
/// so re-running on the same file never duplicates).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fetched-articles JSON file: either a provider response
    /// ({"articles": [...]}) or a bare array of articles
    #[arg(short, long)]
    input: PathBuf,

    /// Qdrant URL
    #[arg(short = 'q', long, default_value = "http://localhost:6334")]
    qdrant_url: String,

    /// Qdrant collection name
    #[arg(short = 'c', long, default_value = "news_articles")]
    collection: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn parse_log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// The two shapes the news provider hands back.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FetchedDocument {
    Response { articles: Vec<RawArticle> },
    Articles(Vec<RawArticle>),
}

impl FetchedDocument {
    fn into_articles(self) -> Vec<RawArticle> {
        match self {
            FetchedDocument::Response { articles } => articles,
            FetchedDocument::Articles(articles) => articles,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(args.parse_log_level())
        .with_target(false)
        .init();

    info!("News article ingestion");
    info!("Configuration:");
    info!("  Input: {}", args.input.display());
    info!("  Qdrant URL: {}", args.qdrant_url);
    info!("  Collection: {}", args.collection);

    let document = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let articles = serde_json::from_str::<FetchedDocument>(&document)
        .context("input is not a fetched-articles JSON document")?
        .into_articles();

    info!("Loaded {} fetched articles", articles.len());

    let embedder = Arc::new(Embedder::new());
    let store = Arc::new(ArticleStore::connect(
        &args.qdrant_url,
        args.collection.clone(),
    )?);
    store.ensure_collection().await?;

    let pipeline = IngestionPipeline::new(embedder, store);
    let stats = pipeline.index_batch(&articles).await?;

    info!("Ingestion complete!");
    info!(
        "  {} seen, {} skipped, {} indexed",
        stats.articles_seen, stats.articles_skipped, stats.articles_indexed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        let args = Args {
            input: PathBuf::from("articles.json"),
            qdrant_url: "".to_string(),
            collection: "".to_string(),
            log_level: "debug".to_string(),
        };
        assert_eq!(args.parse_log_level(), Level::DEBUG);

        let args = Args {
            log_level: "bogus".to_string(),
            ..args
        };
        assert_eq!(args.parse_log_level(), Level::INFO);
    }

    #[test]
    fn test_parse_provider_response_shape() {
        let json = r#"{"status": "ok", "articles": [{"title": "A", "content": "Body.", "url": "https://example.com/a"}]}"#;
        let doc: FetchedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.into_articles().len(), 1);
    }

    #[test]
    fn test_parse_bare_array_shape() {
        let json = r#"[{"title": "A", "content": "Body.", "url": "https://example.com/a"}]"#;
        let doc: FetchedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.into_articles().len(), 1);
    }
}
