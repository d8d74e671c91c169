use meshcall_core::{
    ClientFrame, ConnectionStatus, HubError, MeetingId, Participant, RoomHub, SignalMessage,
    TopicEvent, UserId,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("signal claims sender {claimed} on a socket owned by {owner}")]
    SpoofedSender { owner: UserId, claimed: UserId },

    #[error("signal for meeting {claimed} on a socket bound to {bound}")]
    WrongMeeting { bound: MeetingId, claimed: MeetingId },

    #[error(transparent)]
    Hub(#[from] HubError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Leave,
}

/// One remote member of a hub room, bound to the socket it arrived on.
pub struct RelaySession {
    hub: RoomHub,
    meeting_id: MeetingId,
    user_id: UserId,
}

impl RelaySession {
    /// Joins the room and returns the member's event stream.
    pub fn open(
        hub: RoomHub,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> (Self, mpsc::UnboundedReceiver<TopicEvent>) {
        let events = hub.join(&meeting_id, Participant::joining(user_id.clone()));
        if let Err(e) =
            hub.set_connection_status(&meeting_id, &user_id, ConnectionStatus::Connected)
        {
            warn!("Failed to mark {} connected: {}", user_id, e);
        }

        let session = Self {
            hub,
            meeting_id,
            user_id,
        };
        (session, events)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn meeting_id(&self) -> &MeetingId {
        &self.meeting_id
    }

    pub fn apply(&self, frame: ClientFrame) -> Result<FrameOutcome, RelayError> {
        match frame {
            ClientFrame::Signal(message) => {
                self.check_origin(&message)?;
                let delivered = self.hub.publish(message)?;
                debug!("Relayed signal from {} to {} members", self.user_id, delivered);
                Ok(FrameOutcome::Continue)
            }
            ClientFrame::UpdateState(flags) => {
                self.hub
                    .update_participant(&self.meeting_id, &self.user_id, flags)?;
                Ok(FrameOutcome::Continue)
            }
            ClientFrame::Leave => Ok(FrameOutcome::Leave),
        }
    }

    /// Decodes and applies one text frame. Bad frames are logged and
    /// skipped.
    pub fn apply_text(&self, text: &str) -> FrameOutcome {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Invalid frame from {}: {}", self.user_id, e);
                return FrameOutcome::Continue;
            }
        };

        match self.apply(frame) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Rejected frame from {}: {}", self.user_id, e);
                FrameOutcome::Continue
            }
        }
    }

    /// Removes the member from the room.
    pub fn close(&self) -> bool {
        let removed = self.hub.leave(&self.meeting_id, &self.user_id);
        info!("{} left {} (removed: {})", self.user_id, self.meeting_id, removed);
        removed
    }

    fn check_origin(&self, message: &SignalMessage) -> Result<(), RelayError> {
        if message.from != self.user_id {
            return Err(RelayError::SpoofedSender {
                owner: self.user_id.clone(),
                claimed: message.from.clone(),
            });
        }
        if message.meeting_id != self.meeting_id {
            return Err(RelayError::WrongMeeting {
                bound: self.meeting_id.clone(),
                claimed: message.meeting_id.clone(),
            });
        }
        Ok(())
    }
}
