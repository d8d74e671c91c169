use anyhow::{Context, Result};
use meshcall_core::RoomHub;
use meshcall_relay::{RelayConfig, relay_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let app = relay_router(RoomHub::new());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!("Signaling relay listening on ws://{}", config.addr);

    axum::serve(listener, app).await.context("Relay server failed")?;
    Ok(())
}
