use crate::model::participant::{MediaFlags, Participant};
use crate::model::signaling::SignalMessage;
use serde::{Deserialize, Serialize};

/// Events a room topic delivers to one member, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum TopicEvent {
    Signal(SignalMessage),
    /// Full registry snapshot after any row change.
    Membership(Vec<Participant>),
    /// The subscription survived a transport gap; events may have been lost.
    Reconnected,
}

/// Frames a member sends to a remote relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientFrame {
    Signal(SignalMessage),
    UpdateState(MediaFlags),
    Leave,
}
