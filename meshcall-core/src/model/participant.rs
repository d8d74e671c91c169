use crate::model::ids::UserId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRole {
    Host,
    CoHost,
    Participant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFlags {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
    pub hand_raised: bool,
}

/// One row of the participant registry.
///
/// Rows are owned by the registry; local copies are snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub role: ParticipantRole,
    #[serde(flatten)]
    pub flags: MediaFlags,
    pub connection_status: ConnectionStatus,
    /// Unix time in milliseconds.
    pub joined_at: u64,
}

impl Participant {
    /// A fresh row for a user entering a room.
    pub fn joining(user_id: UserId) -> Self {
        Self {
            user_id,
            role: ParticipantRole::Participant,
            flags: MediaFlags::default(),
            connection_status: ConnectionStatus::Connecting,
            joined_at: now_millis(),
        }
    }

    pub fn with_role(mut self, role: ParticipantRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_flags(mut self, flags: MediaFlags) -> Self {
        self.flags = flags;
        self
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
