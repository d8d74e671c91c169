use async_trait::async_trait;
use meshcall_client::ChannelError;
use meshcall_client::signaling::SignalingTransport;
use meshcall_core::{
    MediaFlags, MeetingId, Participant, Recipient, RoomHub, SignalKind, SignalMessage,
    TopicEvent, UserId,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Hub-backed transport that keeps a copy of every published signal and
/// can lose chosen ones on the way.
#[derive(Clone)]
pub struct RecordingTransport {
    hub: RoomHub,
    published: Arc<Mutex<Vec<SignalMessage>>>,
    lost: Arc<Mutex<Vec<(UserId, SignalKind)>>>,
}

impl RecordingTransport {
    pub fn new(hub: RoomHub) -> Self {
        Self {
            hub,
            published: Arc::new(Mutex::new(Vec::new())),
            lost: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The next `kind` signal published by `from` is recorded but never
    /// delivered.
    pub fn lose_next(&self, from: &UserId, kind: SignalKind) {
        self.lost.lock().unwrap().push((from.clone(), kind));
    }

    pub fn published(&self) -> Vec<SignalMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Number of offers `from` addressed to `to`.
    pub fn offers_between(&self, from: &UserId, to: &UserId) -> usize {
        self.published()
            .iter()
            .filter(|m| m.kind() == SignalKind::Offer)
            .filter(|m| &m.from == from && m.to == Recipient::User(to.clone()))
            .count()
    }

    pub fn count_of(&self, kind: SignalKind) -> usize {
        self.published()
            .iter()
            .filter(|m| m.kind() == kind)
            .count()
    }
}

#[async_trait]
impl SignalingTransport for RecordingTransport {
    async fn subscribe(
        &self,
        meeting_id: &MeetingId,
        participant: Participant,
    ) -> Result<mpsc::UnboundedReceiver<TopicEvent>, ChannelError> {
        SignalingTransport::subscribe(&self.hub, meeting_id, participant).await
    }

    async fn publish(&self, message: SignalMessage) -> Result<(), ChannelError> {
        self.published.lock().unwrap().push(message.clone());

        let lost = {
            let mut lost = self.lost.lock().unwrap();
            let key = (message.from.clone(), message.kind());
            lost.iter()
                .position(|entry| *entry == key)
                .map(|pos| lost.remove(pos))
                .is_some()
        };
        if lost {
            return Ok(());
        }
        SignalingTransport::publish(&self.hub, message).await
    }

    async fn snapshot(&self, meeting_id: &MeetingId) -> Result<Vec<Participant>, ChannelError> {
        SignalingTransport::snapshot(&self.hub, meeting_id).await
    }

    async fn update_participant(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        flags: MediaFlags,
    ) -> Result<(), ChannelError> {
        SignalingTransport::update_participant(&self.hub, meeting_id, user_id, flags).await
    }

    async fn unsubscribe(&self, meeting_id: &MeetingId, user_id: &UserId) {
        SignalingTransport::unsubscribe(&self.hub, meeting_id, user_id).await
    }
}
