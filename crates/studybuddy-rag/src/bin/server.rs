//! Study assistant server binary
//!
//! Run with: cargo run -p studybuddy-rag --bin studybuddy-server -- --config studybuddy.toml

use clap::Parser;
use std::path::PathBuf;
use studybuddy_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "studybuddy-server", version, about = "Document-grounded study assistant")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "STUDYBUDDY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studybuddy_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration: file, then environment, then flags
    let mut config = match &args.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    }
    .with_env_overrides();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Generator: {:?} {}", config.llm.backend, config.llm.model);
    tracing::info!("  - Vision model: {}", config.vision.model);
    tracing::info!("  - Database: {}", config.storage.database_path.display());

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.embeddings.base_url);
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/tags", config.embeddings.base_url))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("Ollama is running");
        }
        _ => {
            tracing::warn!("Ollama not available at {}", config.embeddings.base_url);
            tracing::warn!("  Start it with `ollama serve` and pull {}", config.embeddings.model);
        }
    }

    let server = RagServer::new(config)?;

    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("API Info: http://{}/api/info", server.address());

    server.start().await?;

    Ok(())
}
