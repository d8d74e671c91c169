pub mod hub;
pub mod model;

pub use hub::{HubError, RoomHub};
pub use model::*;
