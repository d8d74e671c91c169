use crate::error::MediaError;
use crate::media::local_track::{LocalTrack, MediaStream, TrackKind, TrackSource};
use crate::media::media_devices::{CapturedMedia, MediaDevices, MediaRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Sole owner of the local camera/microphone stream and the screen stream.
///
/// At most one of each is live. Only this type stops tracks.
pub struct MediaCapture {
    devices: Arc<dyn MediaDevices>,
    camera: Option<CapturedMedia>,
    screen: Option<CapturedMedia>,
    screen_ended_tx: mpsc::UnboundedSender<String>,
    screen_watch: Option<JoinHandle<()>>,
}

impl MediaCapture {
    /// `screen_ended_tx` receives the track id when the host ends a screen
    /// share on its own.
    pub fn new(devices: Arc<dyn MediaDevices>, screen_ended_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            devices,
            camera: None,
            screen: None,
            screen_ended_tx,
            screen_watch: None,
        }
    }

    /// Acquires a camera/microphone stream, replacing the current one only
    /// once the new one is in hand.
    pub async fn acquire(&mut self, audio: bool, video: bool) -> Result<MediaStream, MediaError> {
        if !self.devices.is_secure_context() {
            return Err(MediaError::InsecureContext);
        }

        let what = match (audio, video) {
            (true, true) => "camera and microphone",
            (true, false) => "microphone",
            (false, true) => "camera",
            (false, false) => {
                self.release_camera();
                return Ok(MediaStream::default());
            }
        };

        let captured = self
            .devices
            .user_media(MediaRequest { audio, video })
            .await
            .map_err(|e| e.into_media_error(what))?;

        info!(
            "Acquired local stream {} ({} tracks)",
            captured.stream_id,
            captured.tracks.len()
        );

        self.release_camera();
        let stream = captured.describe();
        self.camera = Some(captured);
        Ok(stream)
    }

    pub async fn start_screen_share(&mut self) -> Result<MediaStream, MediaError> {
        if let Some(screen) = &self.screen {
            return Ok(screen.describe());
        }
        if !self.devices.is_secure_context() {
            return Err(MediaError::InsecureContext);
        }

        let captured = self
            .devices
            .display_media()
            .await
            .map_err(|e| e.into_media_error("screen"))?;

        if let Some(track) = captured.tracks.iter().find(|t| t.kind() == TrackKind::Video) {
            let mut ended = track.ended_signal();
            let track_id = track.id().to_owned();
            let tx = self.screen_ended_tx.clone();
            self.screen_watch = Some(tokio::spawn(async move {
                if ended.wait_for(|ended| *ended).await.is_ok() {
                    let _ = tx.send(track_id);
                }
            }));
        }

        info!("Screen share {} started", captured.stream_id);
        let stream = captured.describe();
        self.screen = Some(captured);
        Ok(stream)
    }

    /// Returns `false` when nothing was being shared.
    pub fn stop_screen_share(&mut self) -> bool {
        if let Some(watch) = self.screen_watch.take() {
            watch.abort();
        }
        let Some(screen) = self.screen.take() else {
            return false;
        };
        for track in &screen.tracks {
            track.stop();
        }
        info!("Screen share {} stopped", screen.stream_id);
        true
    }

    pub fn is_screen_track(&self, track_id: &str) -> bool {
        self.screen
            .as_ref()
            .is_some_and(|s| s.tracks.iter().any(|t| t.id() == track_id))
    }

    /// Mutes or unmutes the camera/microphone track of `kind` without
    /// removing it. Returns `false` when there is no such track.
    pub fn set_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let Some(camera) = &self.camera else {
            warn!("No local stream to toggle {:?} on", kind);
            return false;
        };
        let mut found = false;
        for track in camera.tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            found = true;
        }
        found
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.camera_track_of(kind).is_some_and(|t| t.is_enabled())
    }

    pub fn audio_track(&self) -> Option<Arc<LocalTrack>> {
        self.camera_track_of(TrackKind::Audio)
    }

    pub fn camera_track(&self) -> Option<Arc<LocalTrack>> {
        self.camera_track_of(TrackKind::Video)
    }

    pub fn screen_track(&self) -> Option<Arc<LocalTrack>> {
        self.screen
            .as_ref()
            .and_then(|s| s.tracks.iter().find(|t| t.source() == TrackSource::Screen))
            .cloned()
    }

    pub fn is_sharing_screen(&self) -> bool {
        self.screen.is_some()
    }

    /// The video track peers should currently receive.
    pub fn outgoing_video(&self) -> Option<Arc<LocalTrack>> {
        self.screen_track().or_else(|| self.camera_track())
    }

    pub fn outgoing_tracks(&self) -> Vec<Arc<LocalTrack>> {
        self.audio_track()
            .into_iter()
            .chain(self.outgoing_video())
            .collect()
    }

    pub fn release_all(&mut self) {
        self.stop_screen_share();
        self.release_camera();
    }

    fn camera_track_of(&self, kind: TrackKind) -> Option<Arc<LocalTrack>> {
        self.camera
            .as_ref()
            .and_then(|c| c.tracks.iter().find(|t| t.kind() == kind))
            .cloned()
    }

    fn release_camera(&mut self) {
        if let Some(camera) = self.camera.take() {
            for track in &camera.tracks {
                track.stop();
            }
            info!("Released local stream {}", camera.stream_id);
        }
    }
}

impl Drop for MediaCapture {
    fn drop(&mut self) {
        self.release_all();
    }
}
