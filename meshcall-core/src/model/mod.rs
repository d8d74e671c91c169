mod ids;
mod meeting;
mod participant;
mod signaling;
mod topic;

pub use ids::{MeetingId, UserId, offer_initiator};
pub use meeting::{Meeting, MeetingSettings};
pub use participant::{ConnectionStatus, MediaFlags, Participant, ParticipantRole};
pub use signaling::{IceCandidate, IceServerConfig, Recipient, SignalKind, SignalMessage, SignalPayload};
pub use topic::{ClientFrame, TopicEvent};
