use meshcall_client::{PeerError, PeerEvent};
use meshcall_core::UserId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Drains a manager's event stream in the background and keeps everything
/// it saw.
#[derive(Clone)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<PeerEvent>>>,
    closed: Arc<AtomicBool>,
}

impl EventRecorder {
    pub fn spawn(mut rx: mpsc::UnboundedReceiver<PeerEvent>) -> Self {
        let recorder = Self {
            events: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };

        let events = recorder.events.clone();
        let closed = recorder.closed.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                events.lock().await.push(event);
            }
            closed.store(true, Ordering::SeqCst);
        });

        recorder
    }

    pub async fn events(&self) -> Vec<PeerEvent> {
        self.events.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    /// `true` once the manager dropped its side of the stream.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn stream_ended_count(&self, user_id: &UserId) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| matches!(e, PeerEvent::StreamEnded { user_id: u } if u == user_id))
            .count()
    }

    pub async fn errors_for(&self, user_id: &UserId) -> Vec<PeerError> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                PeerEvent::Error { user_id: u, error } if u == user_id => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn error_count(&self) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| matches!(e, PeerEvent::Error { .. }))
            .count()
    }

    /// Whether a remote stream from `user_id` carrying `tracks` tracks was
    /// reported.
    pub async fn has_remote_stream(&self, user_id: &UserId, tracks: usize) -> bool {
        self.events.lock().await.iter().any(|e| {
            matches!(
                e,
                PeerEvent::Stream { user_id: u, stream, is_local: false }
                    if u == user_id && stream.tracks.len() == tracks
            )
        })
    }
}
