//! autorelay - autopilot state relay
//!
//! Starts the ingest and display listeners and runs until Ctrl+C.

use autorelay::config::Config;
use autorelay::telemetry::{Bootstrapper, TelemetryClient};
use autorelay::{server, Relay};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autorelay=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!(
        http_addr = %config.http_addr,
        ws_addr = %config.ws_addr,
        api_url = %config.api_url,
        upstream_timeout_ms = config.upstream_timeout_ms,
        "autorelay starting"
    );

    let client = TelemetryClient::new(config.api_url.clone(), config.upstream_timeout())?;
    let relay = Arc::new(Relay::new(Bootstrapper::new(client)));

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
    };

    server::run(&config, relay, shutdown).await?;

    tracing::info!("autorelay stopped");
    Ok(())
}
