use crate::error::ChannelError;
use crate::signaling::{SignalingEvent, SignalingTransport};
use meshcall_core::{
    MediaFlags, MeetingId, Participant, Recipient, SignalMessage, SignalPayload, TopicEvent,
    UserId,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Session {
    meeting_id: MeetingId,
    user_id: UserId,
    pump: JoinHandle<()>,
}

/// Point-to-point and broadcast messaging within one meeting room, plus
/// membership snapshots.
///
/// Inbound traffic is delivered through the receiver returned by
/// [`SignalingChannel::join`], filtered to the local participant and kept in
/// transport order.
pub struct SignalingChannel {
    transport: Arc<dyn SignalingTransport>,
    session: Option<Session>,
}

impl SignalingChannel {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            transport,
            session: None,
        }
    }

    pub async fn join(
        &mut self,
        meeting_id: MeetingId,
        local_user_id: UserId,
    ) -> Result<mpsc::UnboundedReceiver<SignalingEvent>, ChannelError> {
        self.join_as(meeting_id, Participant::joining(local_user_id))
            .await
    }

    /// Joins with a prepared registry row for the local participant.
    pub async fn join_as(
        &mut self,
        meeting_id: MeetingId,
        participant: Participant,
    ) -> Result<mpsc::UnboundedReceiver<SignalingEvent>, ChannelError> {
        if self.session.is_some() {
            return Err(ChannelError::AlreadyJoined);
        }

        let user_id = participant.user_id.clone();
        let inbound = self.transport.subscribe(&meeting_id, participant).await?;
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        // Initial snapshot goes out before anything the pump forwards.
        let snapshot = match self.transport.snapshot(&meeting_id).await {
            Ok(rows) => rows,
            Err(e) => {
                self.transport.unsubscribe(&meeting_id, &user_id).await;
                return Err(e);
            }
        };
        let _ = out_tx.send(SignalingEvent::Membership(snapshot));

        let pump = tokio::spawn(pump(
            self.transport.clone(),
            meeting_id.clone(),
            user_id.clone(),
            inbound,
            out_tx,
        ));

        info!("Joined signaling for meeting {} as {}", meeting_id, user_id);
        self.session = Some(Session {
            meeting_id,
            user_id,
            pump,
        });
        Ok(out_rx)
    }

    pub fn is_joined(&self) -> bool {
        self.session.is_some()
    }

    pub fn local_user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(|s| &s.user_id)
    }

    /// Fire-and-forget. Failures are logged; a peer that never answers is
    /// recovered by a fresh offer or an ICE restart.
    pub async fn send(&self, to: &UserId, payload: SignalPayload) {
        self.publish(Recipient::User(to.clone()), payload).await;
    }

    /// Sends to every other member of the room.
    pub async fn broadcast(&self, payload: SignalPayload) {
        self.publish(Recipient::Broadcast, payload).await;
    }

    /// Publishes the local participant's advisory media flags.
    pub async fn update_local_state(&self, flags: MediaFlags) -> Result<(), ChannelError> {
        let session = self.session.as_ref().ok_or(ChannelError::NotJoined)?;
        self.transport
            .update_participant(&session.meeting_id, &session.user_id, flags)
            .await
    }

    /// Unsubscribes and stops delivery. Safe to call repeatedly.
    pub async fn leave(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.pump.abort();
        self.transport
            .unsubscribe(&session.meeting_id, &session.user_id)
            .await;
        info!(
            "Left signaling for meeting {} as {}",
            session.meeting_id, session.user_id
        );
    }

    async fn publish(&self, to: Recipient, payload: SignalPayload) {
        let Some(session) = &self.session else {
            warn!(
                "Dropping {:?} to {:?}: {}",
                payload.kind(),
                to,
                ChannelError::NotJoined
            );
            return;
        };

        let message = SignalMessage {
            meeting_id: session.meeting_id.clone(),
            from: session.user_id.clone(),
            to,
            payload,
        };
        let kind = message.kind();
        if let Err(e) = self.transport.publish(message).await {
            warn!("Failed to publish {:?}: {}", kind, e);
        }
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.pump.abort();
        }
    }
}

async fn pump(
    transport: Arc<dyn SignalingTransport>,
    meeting_id: MeetingId,
    user_id: UserId,
    mut inbound: mpsc::UnboundedReceiver<TopicEvent>,
    out: mpsc::UnboundedSender<SignalingEvent>,
) {
    while let Some(event) = inbound.recv().await {
        let forwarded = match event {
            TopicEvent::Signal(message) => {
                if message.meeting_id != meeting_id || !message.is_for(&user_id) {
                    debug!("Ignoring {:?} not meant for {}", message.kind(), user_id);
                    continue;
                }
                SignalingEvent::Signal(message)
            }
            TopicEvent::Membership(rows) => SignalingEvent::Membership(rows),
            TopicEvent::Reconnected => match transport.snapshot(&meeting_id).await {
                Ok(rows) => {
                    info!("Signaling reconnected; resynchronising {} rows", rows.len());
                    SignalingEvent::Resync(rows)
                }
                Err(e) => {
                    warn!("Snapshot after reconnect failed: {}", e);
                    continue;
                }
            },
        };

        if out.send(forwarded).is_err() {
            break;
        }
    }
    debug!("Signaling pump for {} finished", user_id);
}
