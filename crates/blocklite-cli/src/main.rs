mod cli;
mod commands;

use anyhow::Result;
use blocklite_config::Config;
use blocklite_storage::{Blockstore, SqliteBlockstore};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize tracing (stderr, so payloads written to stdout stay clean)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    let db_path = match cli.db {
        Some(path) => path,
        None => config.database_path()?,
    };
    tracing::debug!("Using blockstore at {}", db_path.display());

    let store = SqliteBlockstore::open(&db_path, config.store.clone()).await?;
    let result = commands::handle(cli.command, &store).await;
    store.close().await?;

    result
}
