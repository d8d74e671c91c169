use meshcall_core::{
    ClientFrame, MeetingId, Participant, Recipient, RoomHub, SignalMessage, SignalPayload,
    TopicEvent, UserId,
};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{WsTestClient, spawn_relay};

#[tokio::test]
async fn test_signals_flow_both_ways() {
    init_tracing();

    let hub = RoomHub::new();
    let addr = spawn_relay(hub.clone()).await.expect("Failed to start relay");
    let meeting = MeetingId::new();
    let remote = UserId::from_u128(1);
    let local = UserId::from_u128(2);

    let mut client = WsTestClient::connect(addr, &format!("/rooms/{meeting}/{remote}"))
        .await
        .expect("Failed to connect");

    // First snapshot proves the socket joined the room.
    match client.next_event().await.expect("No membership") {
        TopicEvent::Membership(rows) => assert_eq!(rows[0].user_id, remote),
        other => panic!("Expected membership, got {other:?}"),
    }

    let mut local_rx = hub.join(&meeting, Participant::joining(local.clone()));

    hub.publish(SignalMessage {
        meeting_id: meeting.clone(),
        from: local.clone(),
        to: Recipient::User(remote.clone()),
        payload: SignalPayload::Offer { sdp: "v=0 offer".into() },
    })
    .expect("Local publish failed");

    match client.next_signal().await.expect("No signal over the socket") {
        TopicEvent::Signal(message) => {
            assert_eq!(message.from, local);
            assert_eq!(message.payload, SignalPayload::Offer { sdp: "v=0 offer".into() });
        }
        other => panic!("Expected a signal, got {other:?}"),
    }

    client
        .send_frame(&ClientFrame::Signal(SignalMessage {
            meeting_id: meeting.clone(),
            from: remote.clone(),
            to: Recipient::User(local.clone()),
            payload: SignalPayload::Answer { sdp: "v=0 answer".into() },
        }))
        .await
        .expect("Failed to send answer");

    let answer = tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(event) = local_rx.recv().await {
            if let TopicEvent::Signal(message) = event {
                return Some(message);
            }
        }
        None
    })
    .await
    .expect("Timed out waiting for the answer")
    .expect("Hub stream closed");

    assert_eq!(answer.from, remote);
    assert_eq!(answer.payload, SignalPayload::Answer { sdp: "v=0 answer".into() });
}
