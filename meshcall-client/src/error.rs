use crate::peer::NegotiationState;
use meshcall_core::{MeetingId, SignalKind, UserId};
use thiserror::Error;

/// Local capture failures, translated from whatever the host reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("no {what} device is available")]
    Unavailable { what: String },

    #[error("permission to use the {what} was denied")]
    PermissionDenied { what: String },

    #[error("the {what} is already in use by another application")]
    Busy { what: String },

    #[error("media capture requires a secure connection")]
    InsecureContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("signaling channel is already joined")]
    AlreadyJoined,

    #[error("signaling channel is not joined")]
    NotJoined,

    #[error("signaling transport error: {0}")]
    Transport(String),
}

/// Failures scoped to one remote participant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("{kind:?} is not valid while the link is {state:?}")]
    NegotiationState {
        kind: SignalKind,
        state: NegotiationState,
    },

    #[error("connectivity to {user_id} failed: {reason}")]
    ConnectivityFailed { user_id: UserId, reason: String },

    #[error("native connection error: {0}")]
    Native(String),
}

impl PeerError {
    pub(crate) fn native(err: anyhow::Error) -> Self {
        PeerError::Native(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("meeting {0} was not found")]
    MeetingNotFound(MeetingId),

    #[error("no peer link to {0}")]
    NoSuchPeer(UserId),

    #[error("peer connection manager has stopped")]
    ManagerStopped,
}
