//! Integration tests for meshcall-client.
//!
//! Tests are organized by functionality:
//! - `negotiation_tests` - offer/answer, candidates, glare
//! - `lifecycle_tests` - joins, leaves, cleanup, reconnects, failures
//! - `media_tests` - local capture, toggles, screen share

pub mod lifecycle_tests;
pub mod media_tests;
pub mod negotiation_tests;

use std::sync::Arc;

use meshcall_client::media::SyntheticDevices;
use meshcall_client::peer::NegotiationState;
use meshcall_client::transport::LoopbackFactory;
use meshcall_client::{
    ManagerConfig, MeshServices, PeerConnectionManager, PeerManagerHandle, StaticDirectory,
};
use meshcall_core::{Meeting, MeetingId, MeetingSettings, RoomHub, UserId};
use tracing::Level;

use crate::utils::{EventRecorder, RecordingTransport, wait_for_links, wait_until_quiet};

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// One participant run by a real manager.
pub struct TestParticipant {
    pub user_id: UserId,
    pub handle: PeerManagerHandle,
    pub events: EventRecorder,
    pub devices: Arc<SyntheticDevices>,
}

/// A meeting on an in-process hub with loopback connections.
pub struct TestRoom {
    pub hub: RoomHub,
    pub transport: RecordingTransport,
    pub factory: LoopbackFactory,
    pub meeting_id: MeetingId,
    directory: Arc<StaticDirectory>,
}

impl TestRoom {
    pub fn new() -> Self {
        Self::with_factory(LoopbackFactory::new())
    }

    pub fn with_factory(factory: LoopbackFactory) -> Self {
        let hub = RoomHub::new();
        let meeting_id = MeetingId::new();
        let directory = Arc::new(StaticDirectory::new());
        directory.insert(Meeting {
            id: meeting_id.clone(),
            title: "standup".into(),
            host_id: UserId::from_u128(1),
            settings: MeetingSettings::default(),
        });

        Self {
            transport: RecordingTransport::new(hub.clone()),
            hub,
            factory,
            meeting_id,
            directory,
        }
    }

    /// Joins without capturing any media.
    pub async fn join(&self, user_id: UserId) -> TestParticipant {
        self.join_with_devices(user_id, Arc::new(SyntheticDevices::new()))
            .await
    }

    /// Joins and attaches camera and microphone.
    pub async fn join_with_media(&self, user_id: UserId) -> TestParticipant {
        let participant = self.join(user_id).await;
        participant
            .handle
            .attach_local_media(true, true)
            .await
            .expect("Failed to attach local media");
        participant
    }

    pub async fn join_with_devices(
        &self,
        user_id: UserId,
        devices: Arc<SyntheticDevices>,
    ) -> TestParticipant {
        let services = MeshServices {
            transport: Arc::new(self.transport.clone()),
            directory: self.directory.clone(),
            devices: devices.clone(),
            connections: Arc::new(self.factory.clone()),
        };

        let (handle, events) = PeerConnectionManager::initialize(
            services,
            ManagerConfig::default(),
            self.meeting_id.clone(),
            user_id.clone(),
        )
        .await
        .expect("Failed to initialize manager");

        TestParticipant {
            user_id,
            handle,
            events: EventRecorder::spawn(events),
            devices,
        }
    }
}

/// Waits until every participant holds `links` stable links and stays there
/// once in-flight renegotiations have landed.
pub async fn settle(participants: &[&TestParticipant], links: usize) -> bool {
    for _ in 0..2 {
        for p in participants {
            if !wait_for_links(&p.handle, links, NegotiationState::Stable).await {
                return false;
            }
        }
        wait_until_quiet().await;
    }
    true
}
