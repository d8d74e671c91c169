mod loopback;
mod native_connection;
mod rtc_connection;
mod transport_config;
mod transport_event;

pub use loopback::{LoopbackConnection, LoopbackFactory};
pub use native_connection::{ConnectionFactory, NativeConnection, TrackSwap};
pub use rtc_connection::{RtcConnection, RtcConnectionFactory};
pub use transport_config::TransportConfig;
pub use transport_event::{ConnectionHealth, ConnectionId, TransportEvent};
