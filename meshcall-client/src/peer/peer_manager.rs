use crate::config::ManagerConfig;
use crate::directory::MeetingDirectory;
use crate::error::{MeshError, PeerError};
use crate::media::{MediaCapture, MediaDevices, MediaStream, TrackKind};
use crate::peer::{
    ManagerCommand, NegotiationState, OfferOutcome, PeerEvent, PeerLink, PeerLinkSummary,
    PeerManagerHandle,
};
use crate::signaling::{SignalingChannel, SignalingEvent, SignalingTransport};
use crate::transport::{ConnectionFactory, ConnectionId, TransportEvent};
use meshcall_core::{
    IceCandidate, MediaFlags, MeetingId, Participant, ParticipantRole, SignalMessage,
    SignalPayload, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The collaborators a manager needs from its host.
#[derive(Clone)]
pub struct MeshServices {
    pub transport: Arc<dyn SignalingTransport>,
    pub directory: Arc<dyn MeetingDirectory>,
    pub devices: Arc<dyn MediaDevices>,
    pub connections: Arc<dyn ConnectionFactory>,
}

/// Keeps one [`PeerLink`] per remote participant and drives each through
/// negotiation.
///
/// Runs as a single task. Commands, signals, connection events and screen
/// share terminations are all handled on it one at a time, so every link is
/// mutated from one place only.
pub struct PeerConnectionManager {
    meeting_id: MeetingId,
    local_user_id: UserId,

    links: HashMap<UserId, PeerLink>,
    /// Remote participants in the last membership snapshot.
    present: HashSet<UserId>,
    next_connection: u64,

    channel: SignalingChannel,
    media: MediaCapture,
    connections: Arc<dyn ConnectionFactory>,
    local_flags: MediaFlags,

    command_rx: mpsc::Receiver<ManagerCommand>,
    signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    screen_ended_rx: mpsc::UnboundedReceiver<String>,

    /// Dropped on cleanup; nothing is reported afterwards.
    events: Option<mpsc::UnboundedSender<PeerEvent>>,
}

impl PeerConnectionManager {
    /// Reads the meeting, joins its signaling room and starts the manager
    /// loop.
    pub async fn initialize(
        services: MeshServices,
        config: ManagerConfig,
        meeting_id: MeetingId,
        local_user_id: UserId,
    ) -> Result<(PeerManagerHandle, mpsc::UnboundedReceiver<PeerEvent>), MeshError> {
        let meeting = services.directory.get_meeting(&meeting_id).await?;

        let role = if meeting.host_id == local_user_id {
            ParticipantRole::Host
        } else {
            ParticipantRole::Participant
        };
        let local_flags = MediaFlags {
            audio_enabled: !meeting.settings.mute_on_join,
            video_enabled: meeting.settings.video_on_join,
            ..MediaFlags::default()
        };
        let row = Participant::joining(local_user_id.clone())
            .with_role(role)
            .with_flags(local_flags);

        let mut channel = SignalingChannel::new(services.transport);
        let signaling_rx = channel.join_as(meeting_id.clone(), row).await?;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (transport_tx, transport_rx) = mpsc::channel(config.transport_buffer);
        let (screen_ended_tx, screen_ended_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let manager = Self {
            meeting_id: meeting_id.clone(),
            local_user_id: local_user_id.clone(),
            links: HashMap::new(),
            present: HashSet::new(),
            next_connection: 0,
            channel,
            media: MediaCapture::new(services.devices, screen_ended_tx),
            connections: services.connections,
            local_flags,
            command_rx,
            signaling_rx,
            transport_rx,
            transport_tx,
            screen_ended_rx,
            events: Some(events_tx),
        };

        info!(
            "Joining meeting {} ({}) as {:?} {}",
            meeting.title, meeting_id, role, local_user_id
        );
        tokio::spawn(manager.run());

        Ok((
            PeerManagerHandle::new(command_tx, meeting_id, local_user_id),
            events_rx,
        ))
    }

    async fn run(mut self) {
        info!("Peer manager loop started for {}", self.local_user_id);
        let mut signaling_open = true;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ManagerCommand::Cleanup { reply }) => {
                            self.cleanup().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All handles dropped. Leaving meeting.");
                            self.cleanup().await;
                            break;
                        }
                    }
                }

                evt = self.signaling_rx.recv(), if signaling_open => {
                    match evt {
                        Some(e) => self.handle_signaling_event(e).await,
                        None => {
                            warn!("Signaling stream closed");
                            signaling_open = false;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                Some(track_id) = self.screen_ended_rx.recv() => {
                    if self.media.is_screen_track(&track_id) {
                        info!("Screen share ended by the host");
                        self.stop_screen_share().await;
                    }
                }
            }
        }

        info!("Peer manager loop finished for {}", self.local_user_id);
    }

    fn emit(&self, event: PeerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn emit_error(&self, user_id: &UserId, error: PeerError) {
        warn!("Peer {}: {}", user_id, error);
        self.emit(PeerEvent::Error {
            user_id: user_id.clone(),
            error,
        });
    }

    async fn handle_command(&mut self, cmd: ManagerCommand) {
        match cmd {
            ManagerCommand::AttachLocalMedia {
                audio,
                video,
                reply,
            } => {
                let res = self.attach_local_media(audio, video).await;
                let _ = reply.send(res);
            }

            ManagerCommand::StartScreenShare { reply } => {
                let res = self.start_screen_share().await;
                let _ = reply.send(res);
            }

            ManagerCommand::StopScreenShare { reply } => {
                let stopped = self.stop_screen_share().await;
                let _ = reply.send(stopped);
            }

            ManagerCommand::ToggleAudio { enabled, reply } => {
                let found = self.media.set_enabled(TrackKind::Audio, enabled);
                if found {
                    self.local_flags.audio_enabled = enabled;
                    self.publish_flags().await;
                }
                let _ = reply.send(found);
            }

            ManagerCommand::ToggleVideo { enabled, reply } => {
                let found = self.media.set_enabled(TrackKind::Video, enabled);
                if found {
                    self.local_flags.video_enabled = enabled;
                    self.publish_flags().await;
                }
                let _ = reply.send(found);
            }

            ManagerCommand::RaiseHand { raised, reply } => {
                self.local_flags.hand_raised = raised;
                self.publish_flags().await;
                let _ = reply.send(());
            }

            ManagerCommand::CreatePeer {
                user_id,
                is_initiator,
                reply,
            } => {
                let res = if user_id == self.local_user_id || self.links.contains_key(&user_id) {
                    debug!("No link created for {}", user_id);
                    Ok(())
                } else {
                    self.create_link(user_id, is_initiator, is_initiator)
                        .await
                        .map_err(MeshError::from)
                };
                let _ = reply.send(res);
            }

            ManagerCommand::RemovePeer { user_id, reply } => {
                let removed = self.remove_peer(&user_id).await;
                let _ = reply.send(removed);
            }

            ManagerCommand::RestartIce { user_id, reply } => {
                let res = self.restart_ice(&user_id).await;
                let _ = reply.send(res);
            }

            ManagerCommand::Links { reply } => {
                let mut links: Vec<PeerLinkSummary> =
                    self.links.values().map(PeerLink::summary).collect();
                links.sort_by(|a, b| a.user_id.cmp(&b.user_id));
                let _ = reply.send(links);
            }

            // Handled by the loop itself.
            ManagerCommand::Cleanup { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn attach_local_media(
        &mut self,
        audio: bool,
        video: bool,
    ) -> Result<MediaStream, MeshError> {
        let stream = self.media.acquire(audio, video).await?;

        self.emit(PeerEvent::Stream {
            user_id: self.local_user_id.clone(),
            stream: stream.clone(),
            is_local: true,
        });

        self.local_flags.audio_enabled = stream.has_kind(TrackKind::Audio);
        self.local_flags.video_enabled = stream.has_kind(TrackKind::Video);
        self.refresh_outgoing_tracks().await;
        self.publish_flags().await;
        Ok(stream)
    }

    async fn start_screen_share(&mut self) -> Result<MediaStream, MeshError> {
        let already = self.media.is_sharing_screen();
        let stream = self.media.start_screen_share().await?;
        if already {
            return Ok(stream);
        }

        self.emit(PeerEvent::Stream {
            user_id: self.local_user_id.clone(),
            stream: stream.clone(),
            is_local: true,
        });

        self.local_flags.screen_sharing = true;
        self.refresh_outgoing_tracks().await;
        self.publish_flags().await;
        Ok(stream)
    }

    /// Shared by the explicit call and host-initiated termination.
    async fn stop_screen_share(&mut self) -> bool {
        if !self.media.stop_screen_share() {
            return false;
        }
        self.local_flags.screen_sharing = false;
        self.refresh_outgoing_tracks().await;
        self.publish_flags().await;
        true
    }

    async fn publish_flags(&self) {
        if let Err(e) = self.channel.update_local_state(self.local_flags).await {
            warn!("Failed to publish local media state: {}", e);
        }
    }

    /// Points every link at the current outgoing audio and video, offering
    /// again where an in-place swap was not possible.
    async fn refresh_outgoing_tracks(&mut self) {
        let audio = self.media.audio_track();
        let video = self.media.outgoing_video();
        let user_ids: Vec<UserId> = self.links.keys().cloned().collect();

        for user_id in user_ids {
            let Some(link) = self.links.get_mut(&user_id) else {
                continue;
            };

            let mut renegotiate = false;
            let mut failure = None;
            for (kind, track) in [
                (TrackKind::Audio, audio.clone()),
                (TrackKind::Video, video.clone()),
            ] {
                match link.set_outgoing_track(kind, track).await {
                    Ok(now) => renegotiate |= now,
                    Err(e) => failure = Some(e),
                }
            }

            if let Some(e) = failure {
                self.emit_error(&user_id, e);
                continue;
            }
            if renegotiate {
                info!("Renegotiating with {} after track change", user_id);
                self.send_offer(&user_id, false).await;
            }
        }
    }

    async fn send_offer(&mut self, user_id: &UserId, ice_restart: bool) {
        let Some(link) = self.links.get_mut(user_id) else {
            return;
        };
        match link.start_offer(ice_restart).await {
            Ok(sdp) => self.channel.send(user_id, SignalPayload::Offer { sdp }).await,
            Err(e) => self.emit_error(user_id, e),
        }
    }

    async fn restart_ice(&mut self, user_id: &UserId) -> Result<(), MeshError> {
        let link = self
            .links
            .get_mut(user_id)
            .ok_or_else(|| MeshError::NoSuchPeer(user_id.clone()))?;

        let sdp = link.start_offer(true).await?;
        info!("ICE restart offered to {}", user_id);
        self.channel.send(user_id, SignalPayload::Offer { sdp }).await;
        Ok(())
    }

    /// Opens a connection to `user_id` and registers the link. With `offer`
    /// set, the first offer goes out straight away.
    async fn create_link(
        &mut self,
        user_id: UserId,
        is_initiator: bool,
        offer: bool,
    ) -> Result<(), PeerError> {
        self.next_connection += 1;
        let connection_id = ConnectionId(self.next_connection);

        let connection = self
            .connections
            .connect(
                &self.local_user_id,
                &user_id,
                connection_id,
                self.transport_tx.clone(),
            )
            .await
            .map_err(PeerError::native)?;

        let mut link = PeerLink::new(user_id.clone(), connection_id, connection, is_initiator);
        if let Err(e) = link.attach_initial(&self.media.outgoing_tracks()).await {
            link.close().await;
            return Err(e);
        }

        let offer_sdp = if offer {
            match link.start_offer(false).await {
                Ok(sdp) => Some(sdp),
                Err(e) => {
                    link.close().await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        info!(
            "Link to {} created (initiator: {}, connection: {:?})",
            user_id, is_initiator, connection_id
        );
        self.links.insert(user_id.clone(), link);

        if let Some(sdp) = offer_sdp {
            self.channel.send(&user_id, SignalPayload::Offer { sdp }).await;
        }
        Ok(())
    }

    /// Closes and forgets the link, reporting the ended stream once.
    async fn remove_peer(&mut self, user_id: &UserId) -> bool {
        let Some(link) = self.links.remove(user_id) else {
            return false;
        };
        link.close().await;
        self.emit(PeerEvent::StreamEnded {
            user_id: user_id.clone(),
        });
        true
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Signal(message) => self.handle_signal(message).await,
            SignalingEvent::Membership(rows) => self.reconcile(rows, false).await,
            SignalingEvent::Resync(rows) => {
                info!("Resynchronising {} links after reconnect", self.links.len());
                self.reconcile(rows, true).await;
            }
        }
    }

    /// Brings the link set in line with a membership snapshot.
    ///
    /// Absent participants are torn down. New arrivals get a link using the
    /// tie-break. On `resync`, links that had not reached `Stable` are
    /// dropped and every present participant without a link gets one.
    async fn reconcile(&mut self, rows: Vec<Participant>, resync: bool) {
        self.emit(PeerEvent::ParticipantsChanged(rows.clone()));

        let present: HashSet<UserId> = rows
            .into_iter()
            .map(|p| p.user_id)
            .filter(|id| *id != self.local_user_id)
            .collect();

        let gone: Vec<UserId> = self
            .links
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        for user_id in gone {
            info!("{} left the meeting", user_id);
            self.remove_peer(&user_id).await;
        }

        if resync {
            let unsettled: Vec<UserId> = self
                .links
                .iter()
                .filter(|(_, link)| link.state() != NegotiationState::Stable)
                .map(|(id, _)| id.clone())
                .collect();
            for user_id in unsettled {
                if let Some(link) = self.links.remove(&user_id) {
                    debug!("Discarding {:?} link to {}", link.state(), user_id);
                    link.close().await;
                }
            }
        }

        let mut arrivals: Vec<UserId> = present
            .iter()
            .filter(|id| !self.links.contains_key(*id))
            .filter(|id| resync || !self.present.contains(*id))
            .cloned()
            .collect();
        arrivals.sort();

        for user_id in arrivals {
            let is_initiator = self.local_user_id.initiates_with(&user_id);
            // After a gap the peer may be waiting on an offer we never saw;
            // our offer makes it resend or answer.
            let offer = is_initiator || resync;
            if let Err(e) = self.create_link(user_id.clone(), is_initiator, offer).await {
                self.emit_error(&user_id, e);
            }
        }

        self.present = present;
    }

    async fn handle_signal(&mut self, message: SignalMessage) {
        let from = message.from;
        match message.payload {
            SignalPayload::Offer { sdp } => self.on_offer(from, sdp).await,
            SignalPayload::Answer { sdp } => self.on_answer(from, sdp).await,
            SignalPayload::IceCandidate(candidate) => self.on_candidate(from, candidate).await,
        }
    }

    async fn on_offer(&mut self, from: UserId, sdp: String) {
        let replaced = self
            .links
            .get(&from)
            .filter(|link| link.is_new_remote_session(&sdp))
            .map(|link| link.is_initiator());
        if let Some(is_initiator) = replaced {
            // The remote dropped its side; ours cannot be renegotiated.
            info!("{} offered from a new session, replacing the link", from);
            if let Some(stale) = self.links.remove(&from) {
                stale.close().await;
            }
            if let Err(e) = self.create_link(from.clone(), is_initiator, false).await {
                self.emit_error(&from, e);
                return;
            }
        }

        if !self.links.contains_key(&from) {
            if let Err(e) = self.create_link(from.clone(), false, false).await {
                self.emit_error(&from, e);
                return;
            }
        }
        let Some(link) = self.links.get_mut(&from) else {
            return;
        };

        let local_wins = self.local_user_id.initiates_with(&from);
        match link.accept_offer(sdp, local_wins).await {
            Ok(OfferOutcome::Answered(answer)) => {
                let follow_up = link.take_pending_renegotiation();
                self.channel
                    .send(&from, SignalPayload::Answer { sdp: answer })
                    .await;
                if follow_up {
                    self.send_offer(&from, false).await;
                }
            }
            Ok(OfferOutcome::IgnoredGlare(pending)) => {
                if let Some(sdp) = pending {
                    self.channel.send(&from, SignalPayload::Offer { sdp }).await;
                }
            }
            Ok(OfferOutcome::Duplicate) => {
                debug!("Duplicate offer from {} ignored", from);
            }
            Err(e @ PeerError::NegotiationState { .. }) => {
                warn!("Discarding offer from {}: {}", from, e);
            }
            Err(e) => self.emit_error(&from, e),
        }
    }

    async fn on_answer(&mut self, from: UserId, sdp: String) {
        let Some(link) = self.links.get_mut(&from) else {
            debug!("Answer from {} without a link discarded", from);
            return;
        };

        match link.accept_answer(sdp).await {
            Ok(()) => {
                if link.take_pending_renegotiation() {
                    self.send_offer(&from, false).await;
                }
            }
            Err(e @ PeerError::NegotiationState { .. }) => {
                warn!("Discarding stale answer from {}: {}", from, e);
            }
            Err(e) => self.emit_error(&from, e),
        }
    }

    async fn on_candidate(&mut self, from: UserId, candidate: IceCandidate) {
        let Some(link) = self.links.get_mut(&from) else {
            debug!("Candidate from {} without a link discarded", from);
            return;
        };
        if let Err(e) = link.add_candidate(candidate).await {
            debug!("Candidate from {} discarded: {}", from, e);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(link) = self.links.get_mut(event.peer()) else {
            debug!("Event for unknown peer {} ignored", event.peer());
            return;
        };
        if link.connection_id() != event.connection() {
            debug!(
                "Event from superseded connection {:?} to {} ignored",
                event.connection(),
                event.peer()
            );
            return;
        }

        match event {
            TransportEvent::CandidateGenerated { peer, candidate, .. } => {
                self.channel
                    .send(&peer, SignalPayload::IceCandidate(candidate))
                    .await;
            }

            TransportEvent::HealthChanged { peer, health, .. } => {
                info!("Connection to {} is {:?}", peer, health);
                link.set_health(health);
                if health.is_degraded() {
                    self.emit_error(
                        &peer,
                        PeerError::ConnectivityFailed {
                            user_id: peer.clone(),
                            reason: format!("connection is {health:?}").to_lowercase(),
                        },
                    );
                }
            }

            TransportEvent::RemoteTrack {
                peer,
                stream_id,
                track,
                ..
            } => {
                if let Some(stream) = link.add_remote_track(stream_id, track) {
                    self.emit(PeerEvent::Stream {
                        user_id: peer,
                        stream,
                        is_local: false,
                    });
                }
            }
        }
    }

    async fn cleanup(&mut self) {
        let user_ids: Vec<UserId> = self.links.keys().cloned().collect();
        for user_id in user_ids {
            self.remove_peer(&user_id).await;
        }
        self.media.release_all();
        self.channel.leave().await;
        self.events = None;

        while self.transport_rx.try_recv().is_ok() {}
        self.present.clear();
        info!("Left meeting {}", self.meeting_id);
    }
}
