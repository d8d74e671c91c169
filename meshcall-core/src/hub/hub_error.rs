use crate::model::{MeetingId, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("user {user_id} is not a member of meeting {meeting_id}")]
    NotMember {
        meeting_id: MeetingId,
        user_id: UserId,
    },
}
