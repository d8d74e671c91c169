use meshcall_core::RoomHub;

use crate::integration::init_tracing;
use crate::utils::{spawn_relay, upgrade_status};

#[tokio::test]
async fn test_non_uuid_path_is_rejected() {
    init_tracing();

    let hub = RoomHub::new();
    let addr = spawn_relay(hub.clone()).await.expect("Failed to start relay");

    let status = upgrade_status(addr, "/rooms/not-a-meeting/not-a-user")
        .await
        .expect("No response");

    assert_eq!(status, 400);
    assert_eq!(hub.room_count(), 0);
}
