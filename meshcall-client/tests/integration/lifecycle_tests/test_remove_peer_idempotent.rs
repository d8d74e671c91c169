use meshcall_core::UserId;

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::wait_until_quiet;

#[tokio::test]
async fn test_second_remove_is_noop() {
    init_tracing();

    let room = TestRoom::new();
    let (a, b) = tokio::join!(
        room.join(UserId::from_u128(1)),
        room.join(UserId::from_u128(2)),
    );
    assert!(settle(&[&a, &b], 1).await, "Pair never settled");

    assert!(a.handle.remove_peer(b.user_id.clone()).await.unwrap());
    assert!(!a.handle.remove_peer(b.user_id.clone()).await.unwrap());
    wait_until_quiet().await;

    assert_eq!(a.events.stream_ended_count(&b.user_id).await, 1);
    assert!(a.handle.links().await.unwrap().is_empty());
    assert_eq!(room.factory.closes(), 1);
}

#[tokio::test]
async fn test_remove_unknown_peer_returns_false() {
    init_tracing();

    let room = TestRoom::new();
    let a = room.join(UserId::from_u128(1)).await;

    assert!(!a.handle.remove_peer(UserId::from_u128(9)).await.unwrap());
    assert_eq!(a.events.stream_ended_count(&UserId::from_u128(9)).await, 0);
}
