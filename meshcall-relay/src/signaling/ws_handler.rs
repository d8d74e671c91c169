use crate::signaling::{FrameOutcome, RelaySession};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use meshcall_core::{MeetingId, RoomHub, UserId};
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((meeting_id, user_id)): Path<(String, String)>,
    State(hub): State<RoomHub>,
) -> Response {
    let (Ok(meeting_id), Ok(user_id)) = (meeting_id.parse::<MeetingId>(), user_id.parse::<UserId>())
    else {
        warn!("Rejected relay connection to /rooms/{}/{}", meeting_id, user_id);
        return StatusCode::BAD_REQUEST.into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, hub, meeting_id, user_id))
}

async fn handle_socket(socket: WebSocket, hub: RoomHub, meeting_id: MeetingId, user_id: UserId) {
    info!("New relay connection: {} in {}", user_id, meeting_id);

    let (mut sender, mut receiver) = socket.split();
    let (session, mut events) = RelaySession::open(hub, meeting_id, user_id);
    let session = Arc::new(session);

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize topic event: {}", e),
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let session = session.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        if session.apply_text(text.as_str()) == FrameOutcome::Leave {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    session.close();
    info!(
        "Relay connection closed: {} in {}",
        session.user_id(),
        session.meeting_id()
    );
}
