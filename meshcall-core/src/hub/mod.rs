mod hub_error;
mod room_hub;

pub use hub_error::HubError;
pub use room_hub::RoomHub;
