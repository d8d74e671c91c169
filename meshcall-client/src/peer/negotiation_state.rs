/// The link's own mirror of where offer/answer negotiation stands.
///
/// Guards are checked against this, never against the native connection's
/// internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    /// A local offer was sent and its answer has not been applied yet.
    OfferSent,
    /// A remote offer is being applied and answered.
    AnswerPending,
    Stable,
    Closed,
}

impl NegotiationState {
    pub fn is_stable(self) -> bool {
        self == NegotiationState::Stable
    }
}
