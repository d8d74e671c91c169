mod hub_transport;
mod signaling_channel;
mod signaling_event;
mod signaling_transport;

pub use signaling_channel::SignalingChannel;
pub use signaling_event::SignalingEvent;
pub use signaling_transport::SignalingTransport;
