pub mod relay_server;

pub use relay_server::spawn_relay;
pub use ws_test_client::{WsTestClient, upgrade_status};
