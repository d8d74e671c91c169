mod manager_command;
mod manager_handle;
mod negotiation_state;
mod peer_event;
mod peer_link;
mod peer_manager;

pub use manager_command::ManagerCommand;
pub use manager_handle::PeerManagerHandle;
pub use negotiation_state::NegotiationState;
pub use peer_event::PeerEvent;
pub use peer_link::{OfferOutcome, PeerLink, PeerLinkSummary};
pub use peer_manager::{MeshServices, PeerConnectionManager};
