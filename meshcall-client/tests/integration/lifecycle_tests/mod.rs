pub mod test_connectivity_failure;
pub mod test_remove_peer_idempotent;
pub mod test_resync_after_gap;
