mod relay_config;
mod signaling;

pub use relay_config::RelayConfig;
pub use signaling::{FrameOutcome, RelayError, RelaySession, ws_handler};

use axum::Router;
use axum::routing::get;
use meshcall_core::RoomHub;

/// Routes `GET /rooms/{meeting_id}/{user_id}` to the WebSocket relay.
pub fn relay_router(hub: RoomHub) -> Router {
    Router::new()
        .route("/rooms/{meeting_id}/{user_id}", get(ws_handler))
        .with_state(hub)
}
