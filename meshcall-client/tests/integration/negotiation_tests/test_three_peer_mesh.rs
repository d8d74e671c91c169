use std::collections::HashMap;

use meshcall_client::transport::ConnectionHealth;
use meshcall_core::UserId;

use crate::integration::{TestRoom, init_tracing, settle};
use crate::utils::{SETTLE_TIMEOUT_MS, wait_for};

#[tokio::test]
async fn test_three_participants_form_full_mesh() {
    init_tracing();

    let room = TestRoom::new();
    let ids = [
        UserId::from_u128(1),
        UserId::from_u128(2),
        UserId::from_u128(3),
    ];

    let (a, b, c) = tokio::join!(
        room.join_with_media(ids[0].clone()),
        room.join_with_media(ids[1].clone()),
        room.join_with_media(ids[2].clone()),
    );
    let participants = [&a, &b, &c];
    assert!(settle(&participants, 2).await, "Mesh never settled");

    let mut initiator = HashMap::new();
    for p in participants {
        for link in p.handle.links().await.unwrap() {
            assert_eq!(link.health, ConnectionHealth::Connected);
            initiator.insert((p.user_id.clone(), link.user_id.clone()), link.is_initiator);
        }
    }
    assert_eq!(initiator.len(), 6, "Expected two links per participant");

    for x in &ids {
        for y in ids.iter().filter(|y| *y != x) {
            let xy = initiator[&(x.clone(), y.clone())];
            let yx = initiator[&(y.clone(), x.clone())];
            assert_ne!(xy, yx, "{x} and {y} disagree on the initiator");
            assert_eq!(xy, x < y);
        }
    }

    for p in participants {
        for other in ids.iter().filter(|id| **id != p.user_id) {
            let events = &p.events;
            assert!(
                wait_for(SETTLE_TIMEOUT_MS, || async move {
                    events.has_remote_stream(other, 2).await
                })
                .await,
                "{} never saw audio and video from {}",
                p.user_id,
                other
            );
        }
    }
}
