mod config;
mod error;
mod handler;
mod protocol;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::ServerConfig;
use server::RpcServer;

#[derive(Parser)]
#[command(name = "news-rpc-server")]
#[command(about = "JSON-RPC server for news article RAG search")]
struct Cli {
    /// Server host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to bind to
    #[arg(long, default_value = "7878")]
    port: u16,

    /// Qdrant vector database URL
    #[arg(long, default_value = "http://localhost:6334")]
    qdrant_url: String,

    /// Qdrant collection name
    #[arg(long, default_value = "news_articles")]
    collection_name: String,

    /// Chat model used for answer synthesis
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "news_rpc_server={},news_answer={},news_index={}",
                cli.log_level, cli.log_level, cli.log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("News RAG JSON-RPC server starting");
    tracing::info!("Configuration:");
    tracing::info!("  Host: {}", cli.host);
    tracing::info!("  Port: {}", cli.port);
    tracing::info!("  Qdrant URL: {}", cli.qdrant_url);
    tracing::info!("  Collection: {}", cli.collection_name);
    tracing::info!("  Model: {}", cli.model);

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        qdrant_url: cli.qdrant_url,
        collection_name: cli.collection_name,
        model: cli.model,
    };

    let server = RpcServer::new(config).await?;
    server.run().await?;

    Ok(())
}
