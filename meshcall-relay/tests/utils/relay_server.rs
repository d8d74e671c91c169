use anyhow::Result;
use meshcall_core::RoomHub;
use meshcall_relay::relay_router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serves a relay for `hub` on an ephemeral local port.
pub async fn spawn_relay(hub: RoomHub) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = relay_router(hub);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}
