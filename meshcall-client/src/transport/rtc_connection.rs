use crate::media::{LocalTrack, TrackInfo, TrackKind};
use crate::transport::native_connection::{ConnectionFactory, NativeConnection, TrackSwap};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{ConnectionHealth, ConnectionId, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use meshcall_core::{IceCandidate, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

const LOCAL_STREAM_ID: &str = "meshcall";

/// A `webrtc` peer connection to one remote participant.
///
/// Handles negotiation and transport only. Outgoing tracks are
/// `TrackLocalStaticSample`s that nothing here writes to; feeding encoded
/// media into them is the host's job.
pub struct RtcConnection {
    peer: UserId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<TrackKind, Arc<RTCRtpSender>>>,
}

impl RtcConnection {
    /// Builds the connection and wires its callbacks into `event_tx`.
    pub async fn new(
        peer: UserId,
        connection: ConnectionId,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let state_peer = peer.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", peer, s);
                    let health = match s {
                        RTCPeerConnectionState::New => ConnectionHealth::New,
                        RTCPeerConnectionState::Connecting => ConnectionHealth::Connecting,
                        RTCPeerConnectionState::Connected => ConnectionHealth::Connected,
                        RTCPeerConnectionState::Disconnected => ConnectionHealth::Disconnected,
                        RTCPeerConnectionState::Failed => ConnectionHealth::Failed,
                        RTCPeerConnectionState::Closed => ConnectionHealth::Closed,
                        _ => return,
                    };
                    let _ = tx
                        .send(TransportEvent::HealthChanged {
                            peer,
                            connection,
                            health,
                        })
                        .await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_peer = peer.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = ice_peer.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated {
                        peer,
                        connection,
                        candidate,
                    })
                    .await;
            })
        }));

        let track_tx = event_tx;
        let track_peer = peer.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let peer = track_peer.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        RTPCodecType::Video => TrackKind::Video,
                        _ => return,
                    };
                    debug!("Remote {:?} track {} from {}", kind, track.id(), peer);
                    let _ = tx
                        .send(TransportEvent::RemoteTrack {
                            peer,
                            connection,
                            stream_id: track.stream_id(),
                            track: TrackInfo {
                                id: track.id(),
                                kind,
                            },
                        })
                        .await;
                })
            },
        ));

        Ok(Self {
            peer,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
        })
    }

    fn local_track(track: &LocalTrack) -> Arc<dyn TrackLocal + Send + Sync> {
        let mime_type = match track.kind() {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id().to_owned(),
            LOCAL_STREAM_ID.to_owned(),
        ))
    }
}

#[async_trait]
impl NativeConnection for RtcConnection {
    async fn set_outgoing_track(
        &self,
        kind: TrackKind,
        track: Option<Arc<LocalTrack>>,
    ) -> Result<TrackSwap> {
        let mut senders = self.senders.lock().await;
        let local = track.as_deref().map(Self::local_track);

        if let Some(sender) = senders.get(&kind) {
            sender
                .replace_track(local)
                .await
                .context("Failed to replace outgoing track")?;
            return Ok(TrackSwap::InPlace);
        }

        let Some(local) = local else {
            return Ok(TrackSwap::InPlace);
        };

        let sender = self
            .peer_connection
            .add_track(local)
            .await
            .context("Failed to add outgoing track")?;

        // Drain RTCP so interceptors keep running.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        senders.insert(kind, sender);
        Ok(TrackSwap::NeedsRenegotiation)
    }

    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let options = ice_restart.then_some(RTCOfferOptions {
            voice_activity_detection: false,
            ice_restart: true,
        });
        let offer = self.peer_connection.create_offer(options).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn apply_remote_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        self.peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to roll back local offer")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing peer connection to {}", self.peer);
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Opens [`RtcConnection`]s with a fixed ICE configuration.
#[derive(Clone, Default)]
pub struct RtcConnectionFactory {
    config: TransportConfig,
}

impl RtcConnectionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionFactory for RtcConnectionFactory {
    async fn connect(
        &self,
        _local: &UserId,
        peer: &UserId,
        connection: ConnectionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn NativeConnection>> {
        let conn = RtcConnection::new(peer.clone(), connection, &self.config, events).await?;
        Ok(Box::new(conn))
    }
}
