//! Ideabox Server: application entry point.
//!
//! Loads configuration from the environment (and an optional `.env`
//! file), connects to SurrealDB and brings the schema up to date.

use anyhow::Context;
use ideabox_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ideabox=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting Ideabox server...");

    let config = DbConfig::from_env();
    let manager = DbManager::connect(&config)
        .await
        .with_context(|| format!("connecting to SurrealDB at {}", config.url))?;

    ideabox_db::run_migrations(manager.client())
        .await
        .context("running schema migrations")?;

    tracing::info!("Ideabox server ready.");
    Ok(())
}
