use meshcall_core::{
    ClientFrame, MeetingId, Participant, Recipient, RoomHub, SignalMessage, SignalPayload,
    TopicEvent, UserId,
};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{WsTestClient, spawn_relay};

#[tokio::test]
async fn test_forged_sender_is_not_relayed() {
    init_tracing();

    let hub = RoomHub::new();
    let addr = spawn_relay(hub.clone()).await.expect("Failed to start relay");
    let meeting = MeetingId::new();
    let remote = UserId::from_u128(1);
    let local = UserId::from_u128(2);
    let victim = UserId::from_u128(3);

    let mut client = WsTestClient::connect(addr, &format!("/rooms/{meeting}/{remote}"))
        .await
        .expect("Failed to connect");
    client.next_event().await.expect("No membership");

    let mut local_rx = hub.join(&meeting, Participant::joining(local.clone()));

    let signal = |from: &UserId, sdp: &str| {
        ClientFrame::Signal(SignalMessage {
            meeting_id: meeting.clone(),
            from: from.clone(),
            to: Recipient::User(local.clone()),
            payload: SignalPayload::Offer { sdp: sdp.into() },
        })
    };

    client.send_text("{ definitely not json").await.unwrap();
    client.send_frame(&signal(&victim, "forged")).await.unwrap();
    client.send_frame(&signal(&remote, "genuine")).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(event) = local_rx.recv().await {
            if let TopicEvent::Signal(message) = event {
                return Some(message);
            }
        }
        None
    })
    .await
    .expect("Timed out waiting for a signal")
    .expect("Hub stream closed");

    // Frames are applied in order, so the forged one would have come first.
    assert_eq!(first.from, remote);
    assert_eq!(first.payload, SignalPayload::Offer { sdp: "genuine".into() });
}
