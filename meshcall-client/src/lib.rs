pub mod config;
pub mod directory;
pub mod error;
pub mod media;
pub mod peer;
pub mod signaling;
pub mod transport;

pub use config::ManagerConfig;
pub use directory::{MeetingDirectory, StaticDirectory};
pub use error::{ChannelError, MediaError, MeshError, PeerError};
pub use peer::{MeshServices, PeerConnectionManager, PeerEvent, PeerManagerHandle};
