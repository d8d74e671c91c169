use crate::error::PeerError;
use crate::media::{LocalTrack, MediaStream, TrackInfo, TrackKind};
use crate::peer::NegotiationState;
use crate::transport::{ConnectionHealth, ConnectionId, NativeConnection, TrackSwap};
use meshcall_core::{IceCandidate, SignalKind, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What became of an inbound offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Applied; the answer must go back to the sender.
    Answered(String),
    /// Collided with our own offer and we keep ours. Carries the pending
    /// local offer so it can be sent again.
    IgnoredGlare(Option<String>),
    /// The same offer was already applied.
    Duplicate,
}

/// Read-only view of a link for the UI layer and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLinkSummary {
    pub user_id: UserId,
    pub is_initiator: bool,
    pub state: NegotiationState,
    pub health: ConnectionHealth,
}

/// Bookkeeping for the connection to one remote participant.
///
/// Owns its native connection exclusively. Local tracks are only ever
/// attached or detached, never stopped.
pub struct PeerLink {
    user_id: UserId,
    connection_id: ConnectionId,
    connection: Box<dyn NativeConnection>,
    is_initiator: bool,
    state: NegotiationState,
    health: ConnectionHealth,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidate>,
    seen_candidates: HashSet<String>,
    local_offer: Option<String>,
    last_remote_offer: Option<String>,
    remote_session: Option<String>,
    remote_stream: Option<MediaStream>,
    needs_renegotiation: bool,
    negotiated_once: bool,
}

impl PeerLink {
    pub fn new(
        user_id: UserId,
        connection_id: ConnectionId,
        connection: Box<dyn NativeConnection>,
        is_initiator: bool,
    ) -> Self {
        Self {
            user_id,
            connection_id,
            connection,
            is_initiator,
            state: NegotiationState::Idle,
            health: ConnectionHealth::New,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            seen_candidates: HashSet::new(),
            local_offer: None,
            last_remote_offer: None,
            remote_session: None,
            remote_stream: None,
            needs_renegotiation: false,
            negotiated_once: false,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health
    }

    pub fn set_health(&mut self, health: ConnectionHealth) {
        self.health = health;
    }

    pub fn summary(&self) -> PeerLinkSummary {
        PeerLinkSummary {
            user_id: self.user_id.clone(),
            is_initiator: self.is_initiator,
            state: self.state,
            health: self.health,
        }
    }

    /// Attaches the tracks present when the link is created. They ride on the
    /// first offer or answer, so no renegotiation is recorded.
    pub async fn attach_initial(&mut self, tracks: &[Arc<LocalTrack>]) -> Result<(), PeerError> {
        for track in tracks {
            self.connection
                .set_outgoing_track(track.kind(), Some(track.clone()))
                .await
                .map_err(PeerError::native)?;
        }
        Ok(())
    }

    /// `true` when `sdp` comes from a different remote session than the one
    /// this link negotiated with, meaning the remote replaced its connection.
    pub fn is_new_remote_session(&self, sdp: &str) -> bool {
        if !matches!(
            self.state,
            NegotiationState::Stable | NegotiationState::OfferSent
        ) {
            return false;
        }
        match (self.remote_session.as_deref(), session_id(sdp)) {
            (Some(known), Some(offered)) => known != offered,
            _ => false,
        }
    }

    /// Creates a local offer. Allowed from `Idle`, `Stable` (renegotiation or
    /// ICE restart) and `OfferSent` (replacing an unanswered offer).
    pub async fn start_offer(&mut self, ice_restart: bool) -> Result<String, PeerError> {
        match self.state {
            NegotiationState::Idle | NegotiationState::Stable | NegotiationState::OfferSent => {}
            state => {
                return Err(PeerError::NegotiationState {
                    kind: SignalKind::Offer,
                    state,
                });
            }
        }

        let sdp = self
            .connection
            .create_offer(ice_restart)
            .await
            .map_err(PeerError::native)?;

        debug!("{:?} -> OfferSent for {}", self.state, self.user_id);
        self.state = NegotiationState::OfferSent;
        self.needs_renegotiation = false;
        self.local_offer = Some(sdp.clone());
        Ok(sdp)
    }

    /// Applies a remote offer and produces the answer.
    ///
    /// `local_wins_glare` is the tie-break result for this pair: when our own
    /// offer is outstanding, the winner keeps it and the loser rolls back.
    pub async fn accept_offer(
        &mut self,
        sdp: String,
        local_wins_glare: bool,
    ) -> Result<OfferOutcome, PeerError> {
        let repeated = self.last_remote_offer.as_deref() == Some(sdp.as_str());
        let resume_state = match self.state {
            NegotiationState::Stable | NegotiationState::OfferSent if repeated => {
                return Ok(OfferOutcome::Duplicate);
            }
            NegotiationState::Idle => NegotiationState::Idle,
            NegotiationState::Stable => NegotiationState::Stable,
            NegotiationState::OfferSent if local_wins_glare => {
                info!("Glare with {}: keeping our offer", self.user_id);
                return Ok(OfferOutcome::IgnoredGlare(self.local_offer.clone()));
            }
            NegotiationState::OfferSent => {
                info!("Glare with {}: rolling back our offer", self.user_id);
                self.connection.rollback().await.map_err(PeerError::native)?;
                self.local_offer = None;
                // Whatever our offer carried must be offered again later.
                self.needs_renegotiation |= self.negotiated_once;
                if self.negotiated_once {
                    NegotiationState::Stable
                } else {
                    NegotiationState::Idle
                }
            }
            state => {
                return Err(PeerError::NegotiationState {
                    kind: SignalKind::Offer,
                    state,
                });
            }
        };

        self.state = NegotiationState::AnswerPending;

        if let Err(e) = self.connection.apply_remote_offer(sdp.clone()).await {
            self.state = resume_state;
            return Err(PeerError::native(e));
        }
        self.remote_description_set = true;
        self.remote_session = session_id(&sdp).map(str::to_owned);
        self.last_remote_offer = Some(sdp);
        self.flush_candidates().await;

        match self.connection.create_answer().await {
            Ok(answer) => {
                debug!("AnswerPending -> Stable for {}", self.user_id);
                self.state = NegotiationState::Stable;
                self.negotiated_once = true;
                Ok(OfferOutcome::Answered(answer))
            }
            Err(e) => {
                self.state = resume_state;
                Err(PeerError::native(e))
            }
        }
    }

    /// Applies the answer to our outstanding offer. Valid only in `OfferSent`.
    pub async fn accept_answer(&mut self, sdp: String) -> Result<(), PeerError> {
        if self.state != NegotiationState::OfferSent {
            return Err(PeerError::NegotiationState {
                kind: SignalKind::Answer,
                state: self.state,
            });
        }

        let session = session_id(&sdp).map(str::to_owned);
        self.connection
            .apply_remote_answer(sdp)
            .await
            .map_err(PeerError::native)?;

        debug!("OfferSent -> Stable for {}", self.user_id);
        self.state = NegotiationState::Stable;
        self.local_offer = None;
        self.remote_description_set = true;
        self.remote_session = session;
        self.negotiated_once = true;
        self.flush_candidates().await;
        Ok(())
    }

    /// Adds a remote candidate, buffering it until a remote description is in
    /// place. Duplicates and rejected candidates are dropped quietly.
    pub async fn add_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        if self.state == NegotiationState::Closed {
            return Err(PeerError::NegotiationState {
                kind: SignalKind::IceCandidate,
                state: self.state,
            });
        }

        if !self.seen_candidates.insert(candidate.candidate.clone()) {
            debug!("Duplicate candidate from {}", self.user_id);
            return Ok(());
        }

        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return Ok(());
        }

        if let Err(e) = self.connection.add_ice_candidate(candidate).await {
            debug!("Candidate from {} swallowed: {:#}", self.user_id, e);
        }
        Ok(())
    }

    async fn flush_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.connection.add_ice_candidate(candidate).await {
                debug!("Buffered candidate from {} swallowed: {:#}", self.user_id, e);
            }
        }
    }

    /// Swaps the outgoing track of `kind`. Returns `true` when the change
    /// needs a fresh offer and the link is ready to send one now.
    pub async fn set_outgoing_track(
        &mut self,
        kind: TrackKind,
        track: Option<Arc<LocalTrack>>,
    ) -> Result<bool, PeerError> {
        let swap = self
            .connection
            .set_outgoing_track(kind, track)
            .await
            .map_err(PeerError::native)?;

        if swap == TrackSwap::NeedsRenegotiation {
            debug!("{:?} change for {} needs renegotiation", kind, self.user_id);
            self.needs_renegotiation = true;
        }
        Ok(self.needs_renegotiation && self.state.is_stable())
    }

    /// Returns `true` once if a renegotiation was deferred and the link has
    /// since become `Stable`.
    pub fn take_pending_renegotiation(&mut self) -> bool {
        if self.needs_renegotiation && self.state.is_stable() {
            self.needs_renegotiation = false;
            return true;
        }
        false
    }

    /// Records a remote track. Returns the updated stream when it changed.
    pub fn add_remote_track(&mut self, stream_id: String, track: TrackInfo) -> Option<MediaStream> {
        let stream = self.remote_stream.get_or_insert_with(|| MediaStream {
            id: stream_id,
            tracks: Vec::new(),
        });
        if stream.tracks.iter().any(|t| t.id == track.id) {
            return None;
        }
        stream.tracks.push(track);
        Some(stream.clone())
    }

    /// Closes the native connection. Consuming the link makes a second close
    /// impossible.
    pub async fn close(mut self) {
        self.state = NegotiationState::Closed;
        if let Err(e) = self.connection.close().await {
            warn!("Closing connection to {} failed: {:#}", self.user_id, e);
        }
        info!("Link to {} closed", self.user_id);
    }
}

/// Session id from the `o=` line: `o=<username> <sess-id> <sess-version> ...`.
fn session_id(sdp: &str) -> Option<&str> {
    sdp.lines()
        .find_map(|line| line.trim().strip_prefix("o="))
        .and_then(|origin| origin.split_whitespace().nth(1))
}
