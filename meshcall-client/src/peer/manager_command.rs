use crate::error::MeshError;
use crate::media::MediaStream;
use crate::peer::PeerLinkSummary;
use meshcall_core::UserId;
use tokio::sync::oneshot;

/// Requests from [`PeerManagerHandle`](crate::peer::PeerManagerHandle) to the
/// manager loop. Each carries the channel its result goes back on.
#[derive(Debug)]
pub enum ManagerCommand {
    AttachLocalMedia {
        audio: bool,
        video: bool,
        reply: oneshot::Sender<Result<MediaStream, MeshError>>,
    },
    StartScreenShare {
        reply: oneshot::Sender<Result<MediaStream, MeshError>>,
    },
    StopScreenShare {
        reply: oneshot::Sender<bool>,
    },
    ToggleAudio {
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    ToggleVideo {
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    RaiseHand {
        raised: bool,
        reply: oneshot::Sender<()>,
    },
    CreatePeer {
        user_id: UserId,
        is_initiator: bool,
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    RemovePeer {
        user_id: UserId,
        reply: oneshot::Sender<bool>,
    },
    RestartIce {
        user_id: UserId,
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    Links {
        reply: oneshot::Sender<Vec<PeerLinkSummary>>,
    },
    Cleanup {
        reply: oneshot::Sender<()>,
    },
}
