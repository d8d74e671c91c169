pub mod test_one_offer_per_pair;
pub mod test_three_peer_mesh;
