use meshcall_client::PeerEvent;
use meshcall_client::media::TrackKind;
use meshcall_core::{SignalKind, UserId};

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::{SETTLE_TIMEOUT_MS, wait_for, wait_until_quiet};

#[tokio::test]
async fn test_screen_share_swaps_video_in_place() {
    init_tracing();

    let room = TestRoom::new();
    let (a, b, c) = tokio::join!(
        room.join_with_media(UserId::from_u128(1)),
        room.join_with_media(UserId::from_u128(2)),
        room.join_with_media(UserId::from_u128(3)),
    );
    assert!(settle(&[&a, &b, &c], 2).await, "Mesh never settled");

    let before = a.handle.links().await.unwrap();
    let offers = room.transport.count_of(SignalKind::Offer);

    let screen = a
        .handle
        .start_screen_share()
        .await
        .expect("Failed to start screen share");
    assert!(screen.has_kind(TrackKind::Video));
    wait_until_quiet().await;

    assert_eq!(a.handle.links().await.unwrap(), before);
    assert_eq!(room.transport.count_of(SignalKind::Offer), offers);
    assert!(a.events.events().await.iter().any(|e| matches!(
        e,
        PeerEvent::Stream { stream, is_local: true, .. } if stream.id == screen.id
    )));

    assert!(a.handle.stop_screen_share().await.unwrap());
    assert!(!a.handle.stop_screen_share().await.unwrap());
    wait_until_quiet().await;

    assert_eq!(a.handle.links().await.unwrap(), before);
    assert_eq!(room.transport.count_of(SignalKind::Offer), offers);
}

#[tokio::test]
async fn test_host_ended_share_restores_camera() {
    init_tracing();

    let room = TestRoom::new();
    let (a, b) = tokio::join!(
        room.join_with_media(UserId::from_u128(1)),
        room.join_with_media(UserId::from_u128(2)),
    );
    assert!(settle(&[&a, &b], 1).await, "Pair never settled");

    a.handle.start_screen_share().await.unwrap();

    let hub = &room.hub;
    let meeting_id = &room.meeting_id;
    let a_id = &a.user_id;
    assert!(
        wait_for(SETTLE_TIMEOUT_MS, || async move {
            hub.snapshot(meeting_id)
                .iter()
                .any(|p| &p.user_id == a_id && p.flags.screen_sharing)
        })
        .await,
        "Registry never showed the share"
    );

    assert!(a.devices.end_screen_share().await);

    assert!(
        wait_for(SETTLE_TIMEOUT_MS, || async move {
            hub.snapshot(meeting_id)
                .iter()
                .any(|p| &p.user_id == a_id && !p.flags.screen_sharing)
        })
        .await,
        "Registry still shows the share after the host ended it"
    );
    assert!(!a.handle.stop_screen_share().await.unwrap());
    assert!(settle(&[&a, &b], 1).await);
}
