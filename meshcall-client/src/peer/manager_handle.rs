use crate::error::MeshError;
use crate::media::MediaStream;
use crate::peer::{ManagerCommand, PeerLinkSummary};
use meshcall_core::{MeetingId, UserId};
use tokio::sync::{mpsc, oneshot};

/// Cloneable front door to a running
/// [`PeerConnectionManager`](crate::peer::PeerConnectionManager).
///
/// Every call is processed on the manager loop in the order it was made.
#[derive(Clone)]
pub struct PeerManagerHandle {
    tx: mpsc::Sender<ManagerCommand>,
    meeting_id: MeetingId,
    local_user_id: UserId,
}

impl PeerManagerHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<ManagerCommand>,
        meeting_id: MeetingId,
        local_user_id: UserId,
    ) -> Self {
        Self {
            tx,
            meeting_id,
            local_user_id,
        }
    }

    pub fn meeting_id(&self) -> &MeetingId {
        &self.meeting_id
    }

    pub fn local_user_id(&self) -> &UserId {
        &self.local_user_id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand,
    ) -> Result<T, MeshError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| MeshError::ManagerStopped)?;
        rx.await.map_err(|_| MeshError::ManagerStopped)
    }

    /// Acquires camera and/or microphone and attaches them to every link.
    /// Capture failures come back here and nowhere else.
    pub async fn attach_local_media(
        &self,
        audio: bool,
        video: bool,
    ) -> Result<MediaStream, MeshError> {
        self.request(|reply| ManagerCommand::AttachLocalMedia {
            audio,
            video,
            reply,
        })
        .await?
    }

    pub async fn start_screen_share(&self) -> Result<MediaStream, MeshError> {
        self.request(|reply| ManagerCommand::StartScreenShare { reply })
            .await?
    }

    /// Returns `false` when nothing was being shared.
    pub async fn stop_screen_share(&self) -> Result<bool, MeshError> {
        self.request(|reply| ManagerCommand::StopScreenShare { reply })
            .await
    }

    /// Mutes or unmutes the microphone. The track stays attached.
    pub async fn toggle_audio(&self, enabled: bool) -> Result<bool, MeshError> {
        self.request(|reply| ManagerCommand::ToggleAudio { enabled, reply })
            .await
    }

    /// Pauses or resumes the camera. The track stays attached.
    pub async fn toggle_video(&self, enabled: bool) -> Result<bool, MeshError> {
        self.request(|reply| ManagerCommand::ToggleVideo { enabled, reply })
            .await
    }

    pub async fn raise_hand(&self, raised: bool) -> Result<(), MeshError> {
        self.request(|reply| ManagerCommand::RaiseHand { raised, reply })
            .await
    }

    /// No-op when a link to `user_id` already exists.
    pub async fn create_peer(&self, user_id: UserId, is_initiator: bool) -> Result<(), MeshError> {
        self.request(|reply| ManagerCommand::CreatePeer {
            user_id,
            is_initiator,
            reply,
        })
        .await?
    }

    /// Returns `false` when there was no link.
    pub async fn remove_peer(&self, user_id: UserId) -> Result<bool, MeshError> {
        self.request(|reply| ManagerCommand::RemovePeer { user_id, reply })
            .await
    }

    /// Sends a fresh offer with new ICE credentials to `user_id`.
    pub async fn restart_ice(&self, user_id: UserId) -> Result<(), MeshError> {
        self.request(|reply| ManagerCommand::RestartIce { user_id, reply })
            .await?
    }

    pub async fn links(&self) -> Result<Vec<PeerLinkSummary>, MeshError> {
        self.request(|reply| ManagerCommand::Links { reply }).await
    }

    /// Closes every link, releases local media and leaves signaling. Nothing
    /// is reported after this returns. Calling it again is harmless.
    pub async fn cleanup(&self) -> Result<(), MeshError> {
        match self.request(|reply| ManagerCommand::Cleanup { reply }).await {
            Ok(()) | Err(MeshError::ManagerStopped) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
