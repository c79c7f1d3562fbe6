//! Argo profile ingestion service.
//!
//! Ingests oceanographic float profile files from archive servers or
//! direct uploads into PostgreSQL, with:
//! - Recursive archive traversal with retry/backoff
//! - Exactly-once persistence per (platform, cycle)
//! - A filtered per-profile aggregation query API
//! - A pass-through proxy to an external question-answering service

mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use argo_common::GeoResolver;
use ingestion::{Ingester, RetryConfig};
use storage::ArgoStore;

#[derive(Parser, Debug)]
#[command(name = "ingester-api")]
#[command(about = "Argo float profile ingestion service")]
struct Args {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// External question-answering service URL
    #[arg(long, env = "RAG_URL", default_value = "https://sih-25.onrender.com/ask")]
    rag_url: String,

    /// Maximum retry attempts for listing fetches
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,
    },
    /// Ingest a file or directory URL once and exit
    Ingest {
        /// Profile file URL (.nc) or archive directory URL (trailing '/')
        url: String,

        /// Cap on the number of files discovered from a directory
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete all stored profiles and measurements
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Argo ingestion service");

    let store = Arc::new(ArgoStore::connect(&args.database_url).await?);
    store.migrate().await?;

    let retry = RetryConfig {
        max_retries: args.max_retries,
        ..RetryConfig::default()
    };
    let ingester = Arc::new(Ingester::new(
        store.clone(),
        GeoResolver::default(),
        retry,
    )?);

    let command = args.command.unwrap_or_else(|| Command::Serve {
        port: default_port(),
    });

    match command {
        Command::Serve { port } => {
            let state = Arc::new(server::AppState::new(
                ingester,
                store,
                args.rag_url.clone(),
            ));
            server::run_server(state, port).await?;
        }
        Command::Ingest { url, limit } => {
            let records = ingester.ingest_from_url(&url, limit).await?;
            info!(url = %url, records = records, "Ingestion finished");
        }
        Command::Clear => {
            let deleted = store.clear_all().await?;
            info!(profiles = deleted, "All Argo data deleted");
        }
    }

    Ok(())
}

/// Port used when no subcommand is given; honors `PORT` like `serve` does.
fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_honors_env() {
        std::env::set_var("PORT", "9155");
        assert_eq!(default_port(), 9155);

        std::env::set_var("PORT", "not-a-port");
        assert_eq!(default_port(), 8080);

        std::env::remove_var("PORT");
        assert_eq!(default_port(), 8080);
    }
}
