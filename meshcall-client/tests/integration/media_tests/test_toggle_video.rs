use meshcall_core::{SignalKind, UserId};

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::{SETTLE_TIMEOUT_MS, wait_for, wait_until_quiet};

#[tokio::test]
async fn test_toggle_does_not_renegotiate() {
    init_tracing();

    let room = TestRoom::new();
    let (a, b) = tokio::join!(
        room.join_with_media(UserId::from_u128(1)),
        room.join_with_media(UserId::from_u128(2)),
    );
    assert!(settle(&[&a, &b], 1).await, "Pair never settled");

    let before = a.handle.links().await.unwrap();
    let offers = room.transport.count_of(SignalKind::Offer);

    assert!(a.handle.toggle_video(false).await.unwrap());

    let hub = &room.hub;
    let meeting_id = &room.meeting_id;
    let a_id = &a.user_id;
    assert!(
        wait_for(SETTLE_TIMEOUT_MS, || async move {
            hub.snapshot(meeting_id)
                .iter()
                .any(|p| &p.user_id == a_id && !p.flags.video_enabled && p.flags.audio_enabled)
        })
        .await,
        "Registry never showed the camera off"
    );

    assert!(a.handle.toggle_video(true).await.unwrap());
    wait_until_quiet().await;

    assert_eq!(a.handle.links().await.unwrap(), before);
    assert_eq!(room.transport.count_of(SignalKind::Offer), offers);
}

#[tokio::test]
async fn test_toggle_audio_without_media_is_noop() {
    init_tracing();

    let room = TestRoom::new();
    let a = room.join(UserId::from_u128(1)).await;

    assert!(!a.handle.toggle_audio(true).await.unwrap());
}
