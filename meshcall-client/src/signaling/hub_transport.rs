use crate::error::ChannelError;
use crate::signaling::SignalingTransport;
use async_trait::async_trait;
use meshcall_core::{
    HubError, MediaFlags, MeetingId, Participant, RoomHub, SignalMessage, TopicEvent, UserId,
};
use tokio::sync::mpsc;

impl From<HubError> for ChannelError {
    fn from(err: HubError) -> Self {
        ChannelError::Transport(err.to_string())
    }
}

#[async_trait]
impl SignalingTransport for RoomHub {
    async fn subscribe(
        &self,
        meeting_id: &MeetingId,
        participant: Participant,
    ) -> Result<mpsc::UnboundedReceiver<TopicEvent>, ChannelError> {
        Ok(self.join(meeting_id, participant))
    }

    async fn publish(&self, message: SignalMessage) -> Result<(), ChannelError> {
        RoomHub::publish(self, message)?;
        Ok(())
    }

    async fn snapshot(&self, meeting_id: &MeetingId) -> Result<Vec<Participant>, ChannelError> {
        Ok(RoomHub::snapshot(self, meeting_id))
    }

    async fn update_participant(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        flags: MediaFlags,
    ) -> Result<(), ChannelError> {
        RoomHub::update_participant(self, meeting_id, user_id, flags)?;
        Ok(())
    }

    async fn unsubscribe(&self, meeting_id: &MeetingId, user_id: &UserId) {
        self.leave(meeting_id, user_id);
    }
}
