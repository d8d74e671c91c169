use meshcall_client::PeerManagerHandle;
use meshcall_client::peer::NegotiationState;
use std::future::Future;
use std::time::Duration;

/// Timeout for a mesh to finish negotiating (ms).
pub const SETTLE_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL_MS: u64 = 20;

/// Polls `condition` until it holds or `timeout_ms` passes.
pub async fn wait_for<F, Fut>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

/// Waits until `handle` holds exactly `count` links, all in `state`.
pub async fn wait_for_links(
    handle: &PeerManagerHandle,
    count: usize,
    state: NegotiationState,
) -> bool {
    wait_for(SETTLE_TIMEOUT_MS, || async move {
        match handle.links().await {
            Ok(links) => links.len() == count && links.iter().all(|l| l.state == state),
            Err(_) => false,
        }
    })
    .await
}

/// Gives in-flight signals time to land.
pub async fn wait_until_quiet() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
