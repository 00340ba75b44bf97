//! mmwave-gateway server entry point.
//!
//! Resolves the upstream credential, starts a background connectivity
//! probe, and serves the REST and WebSocket endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mmwave_gateway::api::handlers::system::check_connectivity;
use mmwave_gateway::app::build_app;
use mmwave_gateway::app_state::AppState;
use mmwave_gateway::config::{GatewayConfig, LogFormat};
use mmwave_gateway::upstream::HomeAssistantClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        upstream = ?config.upstream,
        "starting mmwave-gateway"
    );

    let client = HomeAssistantClient::new(config.upstream.clone(), config.http_timeout)
        .context("building upstream client")?;

    // Probe connectivity without blocking startup
    tokio::spawn(check_connectivity(client.clone()));

    let app = build_app(AppState::new(client, config.relay));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
