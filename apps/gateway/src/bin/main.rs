//! Promptgate gateway binary entry point.
//!
//! Loads TOML configuration, builds providers and the connection registry,
//! and runs the axum server until ctrl-c, then cancels in-flight duplex
//! tasks before exiting.

use anyhow::{Context, Result};
use clap::Parser;
use promptgate_gateway::{GatewayConfig, config::DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Promptgate gateway daemon.
#[derive(Debug, Parser)]
#[command(name = "promptgated", version, about)]
struct Cli {
    /// Path to the gateway configuration.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Override the configured bind address (`host:port`).
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing from RUST_LOG (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("loaded configuration from {}", cli.config.display());

    let bind = cli.bind.unwrap_or_else(|| config.bind_address());
    let handle = promptgate_gateway::serve(&config, &bind).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to install ctrl-c handler")?;
    tracing::info!("shutting down");
    handle.shutdown().await?;
    tracing::info!("gateway shut down");
    Ok(())
}
