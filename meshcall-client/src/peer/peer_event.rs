use crate::error::PeerError;
use crate::media::MediaStream;
use meshcall_core::{Participant, UserId};

/// Everything the manager reports to the UI layer, in one ordered stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A stream became available or changed. `is_local` marks the local
    /// preview.
    Stream {
        user_id: UserId,
        stream: MediaStream,
        is_local: bool,
    },

    /// The link to `user_id` is gone.
    StreamEnded { user_id: UserId },

    /// A per-peer failure. Other links are unaffected.
    Error { user_id: UserId, error: PeerError },

    /// The full current participant registry, as delivered by signaling.
    ParticipantsChanged(Vec<Participant>),
}
