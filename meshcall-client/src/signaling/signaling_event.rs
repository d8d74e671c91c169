use meshcall_core::{Participant, SignalMessage};

/// What the signaling channel hands to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEvent {
    /// A message addressed to the local participant or broadcast to the room.
    Signal(SignalMessage),

    /// The complete current participant list.
    Membership(Vec<Participant>),

    /// A fresh snapshot taken after the transport recovered from a gap.
    /// Anything in flight during the gap may have been lost.
    Resync(Vec<Participant>),
}
