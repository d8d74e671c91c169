use crate::error::ChannelError;
use async_trait::async_trait;
use meshcall_core::{MediaFlags, MeetingId, Participant, SignalMessage, TopicEvent, UserId};
use tokio::sync::mpsc;

/// Backing of a room topic: ordered per-member delivery plus the
/// participant registry.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn subscribe(
        &self,
        meeting_id: &MeetingId,
        participant: Participant,
    ) -> Result<mpsc::UnboundedReceiver<TopicEvent>, ChannelError>;

    async fn publish(&self, message: SignalMessage) -> Result<(), ChannelError>;

    async fn snapshot(&self, meeting_id: &MeetingId) -> Result<Vec<Participant>, ChannelError>;

    async fn update_participant(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        flags: MediaFlags,
    ) -> Result<(), ChannelError>;

    async fn unsubscribe(&self, meeting_id: &MeetingId, user_id: &UserId);
}
