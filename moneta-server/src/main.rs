//! moneta HTTP server
//!
//! Loads configuration, initialises logging, picks a store backend and serves
//! the REST API until SIGINT or SIGTERM.
//!
//! Run with: `cargo run -p moneta-server` (add `--features database` and a
//! `[database]` section to serve from PostgreSQL).

use std::path::PathBuf;

use clap::Parser;
use moneta::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "moneta", version, about = "Personal-finance bookkeeping API")]
struct Cli {
    /// Read configuration from this file instead of the standard locations
    #[arg(short, long, env = "MONETA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config)?;

    select_store(config).await
}

#[cfg(feature = "database")]
async fn select_store(config: Config) -> anyhow::Result<()> {
    match config.database.clone() {
        Some(database) => {
            let store = PgStore::connect(&database).await?;
            tracing::info!("Using PostgreSQL store");
            run(config, store).await
        }
        None => {
            tracing::info!("No [database] configured, using the in-memory store");
            run(config, MemoryStore::new()).await
        }
    }
}

#[cfg(not(feature = "database"))]
async fn select_store(config: Config) -> anyhow::Result<()> {
    if config.database.is_some() {
        tracing::warn!(
            "[database] is configured but this build lacks the `database` feature; using the in-memory store"
        );
    }
    run(config, MemoryStore::new()).await
}

async fn run<St: Store>(config: Config, store: St) -> anyhow::Result<()> {
    let app = build_router(AppState::new(config.clone(), store));
    Server::new(config).serve(app).await?;
    Ok(())
}
