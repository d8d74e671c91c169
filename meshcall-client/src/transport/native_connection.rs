use crate::media::{LocalTrack, TrackKind};
use crate::transport::{ConnectionId, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// How an outgoing track change was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSwap {
    /// Swapped on the existing sender; no new negotiation round needed.
    InPlace,
    /// A new sender was needed; the change reaches the remote only after a
    /// fresh offer/answer exchange.
    NeedsRenegotiation,
}

/// The I/O side of one peer connection.
///
/// Negotiation guards live in the peer link; implementations only perform
/// the operation asked of them and report failures.
#[async_trait]
pub trait NativeConnection: Send + Sync {
    async fn set_outgoing_track(
        &self,
        kind: TrackKind,
        track: Option<Arc<LocalTrack>>,
    ) -> Result<TrackSwap>;

    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self, ice_restart: bool) -> Result<String>;

    /// Creates an answer to the applied remote offer and installs it as the
    /// local description.
    async fn create_answer(&self) -> Result<String>;

    async fn apply_remote_offer(&self, sdp: String) -> Result<()>;

    async fn apply_remote_answer(&self, sdp: String) -> Result<()>;

    /// Drops the pending local offer.
    async fn rollback(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        local: &UserId,
        peer: &UserId,
        connection: ConnectionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn NativeConnection>>;
}
