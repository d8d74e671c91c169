use crate::media::TrackInfo;
use meshcall_core::{IceCandidate, UserId};

/// Identifies one native connection. A peer gets a new id every time its
/// link is recreated, so events from a discarded connection can be told
/// apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHealth {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionHealth {
    pub fn is_degraded(self) -> bool {
        matches!(self, ConnectionHealth::Disconnected | ConnectionHealth::Failed)
    }
}

/// Events native connections raise for the manager loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local candidate was gathered and must reach the remote peer.
    CandidateGenerated {
        peer: UserId,
        connection: ConnectionId,
        candidate: IceCandidate,
    },

    HealthChanged {
        peer: UserId,
        connection: ConnectionId,
        health: ConnectionHealth,
    },

    /// The remote peer started sending a track.
    RemoteTrack {
        peer: UserId,
        connection: ConnectionId,
        stream_id: String,
        track: TrackInfo,
    },
}

impl TransportEvent {
    pub fn peer(&self) -> &UserId {
        match self {
            TransportEvent::CandidateGenerated { peer, .. }
            | TransportEvent::HealthChanged { peer, .. }
            | TransportEvent::RemoteTrack { peer, .. } => peer,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        match self {
            TransportEvent::CandidateGenerated { connection, .. }
            | TransportEvent::HealthChanged { connection, .. }
            | TransportEvent::RemoteTrack { connection, .. } => *connection,
        }
    }
}
