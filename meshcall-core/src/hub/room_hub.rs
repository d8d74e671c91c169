use crate::hub::HubError;
use crate::model::{
    ConnectionStatus, MediaFlags, MeetingId, Participant, Recipient, SignalMessage, TopicEvent,
    UserId,
};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

struct Member {
    participant: Participant,
    tx: mpsc::UnboundedSender<TopicEvent>,
    suspended: bool,
}

#[derive(Default)]
struct RoomTopic {
    members: BTreeMap<UserId, Member>,
}

impl RoomTopic {
    fn snapshot(&self) -> Vec<Participant> {
        self.members.values().map(|m| m.participant.clone()).collect()
    }

    fn deliver(&self, user_id: &UserId, event: TopicEvent) -> bool {
        let Some(member) = self.members.get(user_id) else {
            return false;
        };
        if member.suspended {
            debug!("Dropping event for suspended member {}", user_id);
            return false;
        }
        member.tx.send(event).is_ok()
    }

    fn broadcast_membership(&self) {
        let snapshot = self.snapshot();
        for user_id in self.members.keys() {
            self.deliver(user_id, TopicEvent::Membership(snapshot.clone()));
        }
    }

    fn member_mut(
        &mut self,
        meeting_id: &MeetingId,
        user_id: &UserId,
    ) -> Result<&mut Member, HubError> {
        self.members
            .get_mut(user_id)
            .ok_or_else(|| HubError::NotMember {
                meeting_id: meeting_id.clone(),
                user_id: user_id.clone(),
            })
    }
}

/// In-process room topics with their participant registries.
///
/// Each member gets its own ordered event stream, so messages from one sender
/// reach a recipient in the order they were published. Every registry change
/// is followed by a full membership snapshot to every member.
#[derive(Clone, Default)]
pub struct RoomHub {
    rooms: Arc<DashMap<MeetingId, RoomTopic>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `participant` to the room and returns its event stream.
    ///
    /// Joining again with the same user id replaces the previous row and
    /// closes the previous stream.
    pub fn join(
        &self,
        meeting_id: &MeetingId,
        participant: Participant,
    ) -> mpsc::UnboundedReceiver<TopicEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let user_id = participant.user_id.clone();

        let mut room = self.rooms.entry(meeting_id.clone()).or_default();
        let replaced = room
            .members
            .insert(
                user_id.clone(),
                Member {
                    participant,
                    tx,
                    suspended: false,
                },
            )
            .is_some();

        info!(
            "User {} joined meeting {} (replaced: {}, members: {})",
            user_id,
            meeting_id,
            replaced,
            room.members.len()
        );
        room.broadcast_membership();

        rx
    }

    /// Removes the user's row. Returns `false` if it was not present.
    pub fn leave(&self, meeting_id: &MeetingId, user_id: &UserId) -> bool {
        let removed = {
            let Some(mut room) = self.rooms.get_mut(meeting_id) else {
                return false;
            };
            let removed = room.members.remove(user_id).is_some();
            if removed {
                info!("User {} left meeting {}", user_id, meeting_id);
                room.broadcast_membership();
            }
            removed
        };

        self.rooms
            .remove_if(meeting_id, |_, room| room.members.is_empty());
        removed
    }

    /// Routes a signal to its recipient, or to every other member for a
    /// broadcast. Returns the number of members it was handed to.
    pub fn publish(&self, message: SignalMessage) -> Result<usize, HubError> {
        let not_member = || HubError::NotMember {
            meeting_id: message.meeting_id.clone(),
            user_id: message.from.clone(),
        };

        let room = self.rooms.get(&message.meeting_id).ok_or_else(not_member)?;
        if !room.members.contains_key(&message.from) {
            return Err(not_member());
        }

        let targets: Vec<UserId> = match &message.to {
            Recipient::User(to) if to != &message.from => vec![to.clone()],
            Recipient::User(_) => Vec::new(),
            Recipient::Broadcast => room
                .members
                .keys()
                .filter(|id| *id != &message.from)
                .cloned()
                .collect(),
        };

        let mut delivered = 0;
        for target in targets {
            if room.deliver(&target, TopicEvent::Signal(message.clone())) {
                delivered += 1;
            } else {
                debug!(
                    "{:?} from {} not delivered to {}",
                    message.kind(),
                    message.from,
                    target
                );
            }
        }
        Ok(delivered)
    }

    pub fn update_participant(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        flags: MediaFlags,
    ) -> Result<(), HubError> {
        self.modify_row(meeting_id, user_id, |row| row.flags = flags)
    }

    pub fn set_connection_status(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        status: ConnectionStatus,
    ) -> Result<(), HubError> {
        self.modify_row(meeting_id, user_id, |row| row.connection_status = status)
    }

    pub fn snapshot(&self, meeting_id: &MeetingId) -> Vec<Participant> {
        self.rooms
            .get(meeting_id)
            .map(|room| room.snapshot())
            .unwrap_or_default()
    }

    /// Starts dropping every event addressed to the member, as if its
    /// transport had gone away.
    pub fn suspend(&self, meeting_id: &MeetingId, user_id: &UserId) -> Result<(), HubError> {
        let mut room = self.room_mut(meeting_id, user_id)?;
        room.member_mut(meeting_id, user_id)?.suspended = true;
        info!("Suspended delivery to {} in {}", user_id, meeting_id);
        Ok(())
    }

    /// Ends a gap started by [`RoomHub::suspend`] and tells the member it
    /// reconnected.
    pub fn resume(&self, meeting_id: &MeetingId, user_id: &UserId) -> Result<(), HubError> {
        let mut room = self.room_mut(meeting_id, user_id)?;
        room.member_mut(meeting_id, user_id)?.suspended = false;
        room.deliver(user_id, TopicEvent::Reconnected);
        info!("Resumed delivery to {} in {}", user_id, meeting_id);
        Ok(())
    }

    pub fn member_count(&self, meeting_id: &MeetingId) -> usize {
        self.rooms
            .get(meeting_id)
            .map(|room| room.members.len())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn modify_row(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
        change: impl FnOnce(&mut Participant),
    ) -> Result<(), HubError> {
        let mut room = self.room_mut(meeting_id, user_id)?;
        change(&mut room.member_mut(meeting_id, user_id)?.participant);
        room.broadcast_membership();
        Ok(())
    }

    fn room_mut(
        &self,
        meeting_id: &MeetingId,
        user_id: &UserId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, MeetingId, RoomTopic>, HubError> {
        self.rooms
            .get_mut(meeting_id)
            .ok_or_else(|| HubError::NotMember {
                meeting_id: meeting_id.clone(),
                user_id: user_id.clone(),
            })
    }
}
