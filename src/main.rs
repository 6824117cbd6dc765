use std::sync::Arc;

use anyhow::Context;
use mist::config::{self, Config};
use mist::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();

    let matcher = config::load_mappings(&cfg.mapping_config)
        .context("Failed to load configuration")?;
    tracing::info!(mappings = matcher.len(), "Loaded host mappings");

    let bind_addr = cfg.bind_addr();
    tokio::select! {
        res = server::listener::run(&bind_addr, Arc::new(matcher), cfg.read_timeout()) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
