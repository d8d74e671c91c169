use crate::model::ids::{MeetingId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Addressing of a signal within a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recipient {
    User(UserId),
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate(IceCandidate),
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::Offer { .. } => SignalKind::Offer,
            SignalPayload::Answer { .. } => SignalKind::Answer,
            SignalPayload::IceCandidate(_) => SignalKind::IceCandidate,
        }
    }
}

/// Negotiation metadata exchanged through the room topic. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub meeting_id: MeetingId,
    pub from: UserId,
    pub to: Recipient,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl SignalMessage {
    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }

    /// Whether `user_id` should receive this message.
    pub fn is_for(&self, user_id: &UserId) -> bool {
        if &self.from == user_id {
            return false;
        }
        match &self.to {
            Recipient::User(to) => to == user_id,
            Recipient::Broadcast => true,
        }
    }
}
