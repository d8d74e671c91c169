use crate::media::{LocalTrack, TrackInfo, TrackKind};
use crate::transport::native_connection::{ConnectionFactory, NativeConnection, TrackSwap};
use crate::transport::transport_event::{ConnectionHealth, ConnectionId, TransportEvent};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{IceCandidate, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

const SDP_OWNER: &str = "o=meshcall-loopback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SdpState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

struct Description {
    session: String,
    owner: String,
    kinds: Vec<TrackKind>,
}

impl Description {
    fn render(
        owner: &UserId,
        connection: ConnectionId,
        generation: u64,
        name: &str,
        kinds: &[TrackKind],
    ) -> String {
        // Origin carries the connection as session id, like `o=- <sess-id> <version>`.
        let mut sdp = format!(
            "v=0\r\n{SDP_OWNER} {} {generation} {owner}\r\ns={name}\r\n",
            connection.0
        );
        for kind in kinds {
            let media = match kind {
                TrackKind::Audio => "audio",
                TrackKind::Video => "video",
            };
            sdp.push_str(&format!("m={media}\r\n"));
        }
        sdp
    }

    fn parse(sdp: &str) -> Result<Self> {
        let mut lines = sdp.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some("v=0") {
            bail!("session description must start with v=0");
        }

        let mut origin = None;
        let mut kinds = Vec::new();
        for line in lines {
            if let Some(rest) = line.strip_prefix(SDP_OWNER) {
                let fields: Vec<&str> = rest.split_whitespace().collect();
                if let [session, _version, owner] = fields[..] {
                    origin = Some((session.to_owned(), owner.to_owned()));
                }
            } else if let Some(media) = line.strip_prefix("m=") {
                match media {
                    "audio" => kinds.push(TrackKind::Audio),
                    "video" => kinds.push(TrackKind::Video),
                    other => bail!("unsupported media section {other:?}"),
                }
            }
        }

        let (session, owner) =
            origin.ok_or_else(|| anyhow!("session description has no origin line"))?;
        Ok(Self {
            session,
            owner,
            kinds,
        })
    }
}

struct ConnectionState {
    sdp: SdpState,
    generation: u64,
    outgoing: Vec<TrackKind>,
    local_kinds: Vec<TrackKind>,
    committed_kinds: Vec<TrackKind>,
    has_local: bool,
    has_remote: bool,
    remote_seen: HashSet<TrackKind>,
    remote_session: Option<String>,
    connected: bool,
}

/// An in-memory connection that speaks a minimal description format and
/// reports itself connected once both descriptions are in place.
///
/// Used by the simulator and by tests in place of a network stack.
pub struct LoopbackConnection {
    owner: UserId,
    peer: UserId,
    connection: ConnectionId,
    events: mpsc::Sender<TransportEvent>,
    shared: Arc<FactoryShared>,
    state: Mutex<ConnectionState>,
}

impl LoopbackConnection {
    fn emit(&self, event: TransportEvent) {
        // Never block: the receiving loop may be the one calling into us.
        if let Err(e) = self.events.try_send(event) {
            warn!("Loopback event to manager dropped: {}", e);
        }
    }

    fn after_local_description(&self, state: &mut ConnectionState) {
        state.has_local = true;
        self.emit(TransportEvent::CandidateGenerated {
            peer: self.peer.clone(),
            connection: self.connection,
            candidate: IceCandidate {
                candidate: format!(
                    "candidate:{} 1 udp 2130706431 127.0.0.1 {} typ host",
                    state.generation,
                    40000 + self.connection.0 % 20000
                ),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
            },
        });
        self.report_connected(state);
    }

    fn after_remote_description(&self, state: &mut ConnectionState, remote: Description) {
        state.has_remote = true;
        for kind in remote.kinds {
            if state.remote_seen.insert(kind) {
                self.emit(TransportEvent::RemoteTrack {
                    peer: self.peer.clone(),
                    connection: self.connection,
                    stream_id: remote.owner.clone(),
                    track: TrackInfo {
                        id: format!("{}-{:?}", remote.owner, kind).to_lowercase(),
                        kind,
                    },
                });
            }
        }
        self.report_connected(state);
    }

    fn report_connected(&self, state: &mut ConnectionState) {
        if state.connected || !state.has_local || !state.has_remote {
            return;
        }
        state.connected = true;
        self.emit(TransportEvent::HealthChanged {
            peer: self.peer.clone(),
            connection: self.connection,
            health: ConnectionHealth::Connected,
        });
    }

    /// Pins the remote session on first use. A description from another
    /// session belongs to a different remote connection.
    fn check_remote_session(state: &mut ConnectionState, remote: &Description) -> Result<()> {
        match &state.remote_session {
            Some(known) if *known != remote.session => {
                bail!(
                    "description from session {} does not belong to session {}",
                    remote.session,
                    known
                );
            }
            Some(_) => {}
            None => state.remote_session = Some(remote.session.clone()),
        }
        Ok(())
    }

    fn ensure_open(state: &ConnectionState) -> Result<()> {
        if state.sdp == SdpState::Closed {
            bail!("connection is closed");
        }
        Ok(())
    }
}

#[async_trait]
impl NativeConnection for LoopbackConnection {
    async fn set_outgoing_track(
        &self,
        kind: TrackKind,
        track: Option<Arc<LocalTrack>>,
    ) -> Result<TrackSwap> {
        let mut state = self.state.lock().await;
        Self::ensure_open(&state)?;

        state.outgoing.retain(|k| *k != kind);
        let Some(track) = track else {
            return Ok(TrackSwap::InPlace);
        };
        state.outgoing.push(kind);

        let negotiated = state.local_kinds.contains(&kind);
        if negotiated && self.shared.replace_supported.load(Ordering::SeqCst) {
            debug!("Replaced outgoing {:?} with {}", kind, track.id());
            Ok(TrackSwap::InPlace)
        } else {
            Ok(TrackSwap::NeedsRenegotiation)
        }
    }

    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let mut state = self.state.lock().await;
        Self::ensure_open(&state)?;
        if state.sdp == SdpState::HaveRemoteOffer {
            bail!("cannot create an offer while a remote offer is pending");
        }

        state.generation += 1;
        state.sdp = SdpState::HaveLocalOffer;
        state.local_kinds = state.outgoing.clone();
        if ice_restart {
            state.connected = false;
        }

        let sdp = Description::render(
            &self.owner,
            self.connection,
            state.generation,
            "offer",
            &state.local_kinds,
        );
        self.shared.record_offer(&self.owner, &self.peer);
        self.after_local_description(&mut state);
        Ok(sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.sdp != SdpState::HaveRemoteOffer {
            bail!("no remote offer to answer");
        }

        state.generation += 1;
        state.sdp = SdpState::Stable;
        state.local_kinds = state.outgoing.clone();
        state.committed_kinds = state.local_kinds.clone();

        let sdp = Description::render(
            &self.owner,
            self.connection,
            state.generation,
            "answer",
            &state.local_kinds,
        );
        self.after_local_description(&mut state);
        Ok(sdp)
    }

    async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::ensure_open(&state)?;
        if state.sdp == SdpState::HaveLocalOffer {
            bail!("remote offer collides with the pending local offer");
        }

        let remote = Description::parse(&sdp)?;
        Self::check_remote_session(&mut state, &remote)?;
        state.sdp = SdpState::HaveRemoteOffer;
        self.after_remote_description(&mut state, remote);
        Ok(())
    }

    async fn apply_remote_answer(&self, sdp: String) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sdp != SdpState::HaveLocalOffer {
            bail!("no local offer for this answer");
        }

        let remote = Description::parse(&sdp)?;
        Self::check_remote_session(&mut state, &remote)?;
        state.sdp = SdpState::Stable;
        state.committed_kinds = state.local_kinds.clone();
        self.after_remote_description(&mut state, remote);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sdp != SdpState::HaveLocalOffer {
            bail!("no local offer to roll back");
        }
        state.sdp = SdpState::Stable;
        state.local_kinds = state.committed_kinds.clone();
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let state = self.state.lock().await;
        Self::ensure_open(&state)?;
        if !state.has_remote {
            bail!("remote description is not set");
        }
        if !candidate.candidate.starts_with("candidate:") {
            bail!("malformed candidate {:?}", candidate.candidate);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sdp != SdpState::Closed {
            state.sdp = SdpState::Closed;
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            self.shared.live.remove_if(&(self.owner.clone(), self.peer.clone()), |_, live| {
                live.0 == self.connection
            });
        }
        Ok(())
    }
}

struct FactoryShared {
    replace_supported: AtomicBool,
    offers: DashMap<(UserId, UserId), usize>,
    closes: AtomicUsize,
    live: DashMap<(UserId, UserId), (ConnectionId, mpsc::Sender<TransportEvent>)>,
}

impl FactoryShared {
    fn record_offer(&self, owner: &UserId, peer: &UserId) {
        *self.offers.entry((owner.clone(), peer.clone())).or_default() += 1;
    }
}

/// Opens [`LoopbackConnection`]s and keeps counters for inspection.
#[derive(Clone)]
pub struct LoopbackFactory {
    shared: Arc<FactoryShared>,
}

impl Default for LoopbackFactory {
    fn default() -> Self {
        Self {
            shared: Arc::new(FactoryShared {
                replace_supported: AtomicBool::new(true),
                offers: DashMap::new(),
                closes: AtomicUsize::new(0),
                live: DashMap::new(),
            }),
        }
    }
}

impl LoopbackFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `false`, every outgoing track change asks for renegotiation,
    /// like a stack without in-place sender replacement.
    pub fn with_replace_supported(self, supported: bool) -> Self {
        self.shared.replace_supported.store(supported, Ordering::SeqCst);
        self
    }

    /// Offers `owner` has created towards `peer`, across all connections.
    pub fn offers_between(&self, owner: &UserId, peer: &UserId) -> usize {
        self.shared
            .offers
            .get(&(owner.clone(), peer.clone()))
            .map(|n| *n)
            .unwrap_or_default()
    }

    pub fn total_offers(&self) -> usize {
        self.shared.offers.iter().map(|n| *n.value()).sum()
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Reports `health` on the live connection `local` holds to `peer`.
    /// Returns `false` if there is none.
    pub fn inject_health(&self, local: &UserId, peer: &UserId, health: ConnectionHealth) -> bool {
        let Some(live) = self.shared.live.get(&(local.clone(), peer.clone())) else {
            return false;
        };
        let (connection, tx) = live.value();
        tx.try_send(TransportEvent::HealthChanged {
            peer: peer.clone(),
            connection: *connection,
            health,
        })
        .is_ok()
    }
}

#[async_trait]
impl ConnectionFactory for LoopbackFactory {
    async fn connect(
        &self,
        local: &UserId,
        peer: &UserId,
        connection: ConnectionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn NativeConnection>> {
        self.shared
            .live
            .insert((local.clone(), peer.clone()), (connection, events.clone()));

        Ok(Box::new(LoopbackConnection {
            owner: local.clone(),
            peer: peer.clone(),
            connection,
            events,
            shared: self.shared.clone(),
            state: Mutex::new(ConnectionState {
                sdp: SdpState::Stable,
                generation: 0,
                outgoing: Vec::new(),
                local_kinds: Vec::new(),
                committed_kinds: Vec::new(),
                has_local: false,
                has_remote: false,
                remote_seen: HashSet::new(),
                remote_session: None,
                connected: false,
            }),
        }))
    }
}
