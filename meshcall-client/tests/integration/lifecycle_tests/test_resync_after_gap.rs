use meshcall_client::peer::NegotiationState;
use meshcall_client::transport::{ConnectionId, NativeConnection};
use meshcall_core::{SignalKind, UserId};

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::{ScriptedPeer, wait_for_links, wait_until_quiet};

#[tokio::test]
async fn test_missed_join_is_recovered_on_resync() {
    init_tracing();

    let room = TestRoom::new();
    let c_id = UserId::from_u128(1);
    let a_id = UserId::from_u128(2);

    let a = room.join(a_id.clone()).await;
    room.hub
        .suspend(&room.meeting_id, &a_id)
        .expect("Failed to suspend");

    // C joins and offers while A is not receiving.
    let c = room.join(c_id.clone()).await;
    assert!(wait_for_links(&c.handle, 1, NegotiationState::OfferSent).await);
    wait_until_quiet().await;
    assert!(a.handle.links().await.unwrap().is_empty());

    room.hub
        .resume(&room.meeting_id, &a_id)
        .expect("Failed to resume");

    assert!(wait_for_links(&a.handle, 1, NegotiationState::Stable).await);
    assert!(wait_for_links(&c.handle, 1, NegotiationState::Stable).await);
    assert_eq!(c.events.error_count().await, 0);
}

#[tokio::test]
async fn test_unsettled_link_is_recreated_on_resync() {
    init_tracing();

    let room = TestRoom::new();
    let a_id = UserId::from_u128(1);
    let s_id = UserId::from_u128(2);

    let a = room.join(a_id.clone()).await;
    let mut s = ScriptedPeer::join(
        &room.hub,
        &room.factory,
        &room.meeting_id,
        s_id.clone(),
        a_id.clone(),
    )
    .await
    .expect("Failed to join scripted peer");

    // Left unanswered.
    s.next_offer().await.expect("Manager did not offer");
    assert!(wait_for_links(&a.handle, 1, NegotiationState::OfferSent).await);

    room.hub.suspend(&room.meeting_id, &a_id).unwrap();
    room.hub.resume(&room.meeting_id, &a_id).unwrap();

    s.answer_next_offer()
        .await
        .expect("Link was not re-offered after resync");
    assert!(wait_for_links(&a.handle, 1, NegotiationState::Stable).await);

    assert_eq!(room.factory.closes(), 1);
    assert_eq!(room.transport.offers_between(&a_id, &s_id), 2);
    assert_eq!(a.events.stream_ended_count(&s_id).await, 0);
}

#[tokio::test]
async fn test_lost_answer_is_recovered_on_resync() {
    init_tracing();

    let room = TestRoom::new();
    let a_id = UserId::from_u128(1);
    let b_id = UserId::from_u128(2);

    // B answers and reaches Stable, A never hears the answer.
    room.transport.lose_next(&b_id, SignalKind::Answer);
    let b = room.join(b_id.clone()).await;
    let a = room.join(a_id.clone()).await;
    assert!(wait_for_links(&b.handle, 1, NegotiationState::Stable).await);
    assert!(wait_for_links(&a.handle, 1, NegotiationState::OfferSent).await);
    wait_until_quiet().await;

    room.hub.suspend(&room.meeting_id, &a_id).unwrap();
    room.hub.resume(&room.meeting_id, &a_id).unwrap();

    assert!(settle(&[&a, &b], 1).await, "Pair did not reconnect");
    // Both sides dropped their first connection.
    assert_eq!(room.factory.closes(), 2);
    assert_eq!(b.events.stream_ended_count(&a_id).await, 0);
    assert_eq!(a.events.error_count().await, 0);
    assert_eq!(b.events.error_count().await, 0);
}

#[tokio::test]
async fn test_offer_from_replaced_connection_gets_fresh_link() {
    init_tracing();

    let room = TestRoom::new();
    let p_id = UserId::from_u128(1);
    let q_id = UserId::from_u128(2);

    let q = room.join(q_id.clone()).await;
    let mut p = ScriptedPeer::join(
        &room.hub,
        &room.factory,
        &room.meeting_id,
        p_id.clone(),
        q_id.clone(),
    )
    .await
    .expect("Failed to join scripted peer");

    p.offer().await.expect("Failed to offer");
    let answer = p.next_answer().await.expect("Manager did not answer");
    p.connection
        .apply_remote_answer(answer)
        .await
        .expect("First answer rejected");
    assert!(wait_for_links(&q.handle, 1, NegotiationState::Stable).await);

    p.reopen(&room.factory, ConnectionId(999))
        .await
        .expect("Failed to reopen");
    p.offer().await.expect("Failed to offer again");
    let answer = p.next_answer().await.expect("Manager did not answer again");
    p.connection
        .apply_remote_answer(answer)
        .await
        .expect("Answer came from the old connection");

    assert!(wait_for_links(&q.handle, 1, NegotiationState::Stable).await);
    // P's old connection and Q's old connection.
    assert_eq!(room.factory.closes(), 2);
    assert_eq!(q.events.stream_ended_count(&p_id).await, 0);
    assert_eq!(q.events.error_count().await, 0);
}
