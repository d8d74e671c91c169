pub mod event_recorder;
pub mod recording_transport;
pub mod wait_helpers;

pub use event_recorder::EventRecorder;
pub use recording_transport::RecordingTransport;
pub use scripted_peer::ScriptedPeer;
pub use wait_helpers::{SETTLE_TIMEOUT_MS, wait_for, wait_for_links, wait_until_quiet};
