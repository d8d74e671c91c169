use crate::error::MeshError;
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{Meeting, MeetingId};

/// Read-only access to meeting metadata kept by the room orchestrator.
#[async_trait]
pub trait MeetingDirectory: Send + Sync {
    async fn get_meeting(&self, meeting_id: &MeetingId) -> Result<Meeting, MeshError>;
}

/// In-memory directory.
#[derive(Default)]
pub struct StaticDirectory {
    meetings: DashMap<MeetingId, Meeting>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, meeting: Meeting) {
        self.meetings.insert(meeting.id.clone(), meeting);
    }
}

#[async_trait]
impl MeetingDirectory for StaticDirectory {
    async fn get_meeting(&self, meeting_id: &MeetingId) -> Result<Meeting, MeshError> {
        self.meetings
            .get(meeting_id)
            .map(|m| m.value().clone())
            .ok_or_else(|| MeshError::MeetingNotFound(meeting_id.clone()))
    }
}
