use crate::model::ids::{MeetingId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSettings {
    pub mute_on_join: bool,
    pub video_on_join: bool,
}

/// Meeting metadata, read once before joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub host_id: UserId,
    pub settings: MeetingSettings,
}
