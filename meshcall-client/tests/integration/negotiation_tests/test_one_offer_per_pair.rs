use meshcall_client::peer::NegotiationState;
use meshcall_core::UserId;

use crate::integration::{TestRoom, init_tracing, settle};

#[tokio::test]
async fn test_simultaneous_join_sends_one_offer() {
    init_tracing();

    let room = TestRoom::new();
    let a_id = UserId::from_u128(0x10);
    let b_id = UserId::from_u128(0x20);

    let (a, b) = tokio::join!(room.join(a_id.clone()), room.join(b_id.clone()));
    assert!(settle(&[&a, &b], 1).await, "Pair never settled");

    assert_eq!(room.transport.offers_between(&a_id, &b_id), 1);
    assert_eq!(room.transport.offers_between(&b_id, &a_id), 0);

    let a_links = a.handle.links().await.unwrap();
    let b_links = b.handle.links().await.unwrap();
    assert!(a_links[0].is_initiator);
    assert!(!b_links[0].is_initiator);
    assert_eq!(a_links[0].state, NegotiationState::Stable);
}
