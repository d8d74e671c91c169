use meshcall_client::PeerError;
use meshcall_client::peer::NegotiationState;
use meshcall_client::transport::ConnectionHealth;
use meshcall_core::UserId;

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::{SETTLE_TIMEOUT_MS, wait_for};

#[tokio::test]
async fn test_failure_is_reported_and_ice_restart_recovers() {
    init_tracing();

    let room = TestRoom::new();
    let (a, b) = tokio::join!(
        room.join(UserId::from_u128(1)),
        room.join(UserId::from_u128(2)),
    );
    assert!(settle(&[&a, &b], 1).await, "Pair never settled");

    assert!(
        room.factory
            .inject_health(&a.user_id, &b.user_id, ConnectionHealth::Failed)
    );

    let events = &a.events;
    let b_id = &b.user_id;
    assert!(
        wait_for(SETTLE_TIMEOUT_MS, || async move {
            !events.errors_for(b_id).await.is_empty()
        })
        .await,
        "No connectivity error was reported"
    );

    let errors = a.events.errors_for(b_id).await;
    assert!(matches!(
        &errors[0],
        PeerError::ConnectivityFailed { user_id, .. } if user_id == b_id
    ));

    // The link survives the failure.
    let links = a.handle.links().await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].health, ConnectionHealth::Failed);
    assert_eq!(a.events.stream_ended_count(b_id).await, 0);

    a.handle
        .restart_ice(b.user_id.clone())
        .await
        .expect("ICE restart failed");

    let handle = &a.handle;
    assert!(
        wait_for(SETTLE_TIMEOUT_MS, || async move {
            handle.links().await.is_ok_and(|links| {
                links.len() == 1
                    && links[0].state == NegotiationState::Stable
                    && links[0].health == ConnectionHealth::Connected
            })
        })
        .await,
        "Link did not recover after ICE restart"
    );
}

#[tokio::test]
async fn test_restart_ice_without_link_fails() {
    init_tracing();

    let room = TestRoom::new();
    let a = room.join(UserId::from_u128(1)).await;

    let err = a
        .handle
        .restart_ice(UserId::from_u128(5))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        meshcall_client::MeshError::NoSuchPeer(UserId::from_u128(5))
    );
}
