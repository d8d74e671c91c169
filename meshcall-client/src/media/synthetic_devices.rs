use crate::media::local_track::{LocalTrack, TrackEnder, TrackSource};
use crate::media::media_devices::{CapturedMedia, HostMediaError, MediaDevices, MediaRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Devices that hand out placeholder tracks, with failure injection.
///
/// Used by the simulator and by tests in place of real host capture.
#[derive(Default)]
pub struct SyntheticDevices {
    insecure: AtomicBool,
    user_media_error: Mutex<Option<HostMediaError>>,
    display_media_error: Mutex<Option<HostMediaError>>,
    screen_enders: Mutex<Vec<TrackEnder>>,
    captures: AtomicUsize,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_secure(&self, secure: bool) {
        self.insecure.store(!secure, Ordering::SeqCst);
    }

    /// The next camera/microphone request fails with `err`.
    pub async fn fail_user_media(&self, err: HostMediaError) {
        *self.user_media_error.lock().await = Some(err);
    }

    /// The next screen request fails with `err`.
    pub async fn fail_display_media(&self, err: HostMediaError) {
        *self.display_media_error.lock().await = Some(err);
    }

    /// Ends every live screen track as if the user stopped sharing from
    /// the operating system. Returns `false` if none were live.
    pub async fn end_screen_share(&self) -> bool {
        let enders: Vec<TrackEnder> = self.screen_enders.lock().await.drain(..).collect();
        for ender in &enders {
            ender.end();
        }
        !enders.is_empty()
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    fn is_secure_context(&self) -> bool {
        !self.insecure.load(Ordering::SeqCst)
    }

    async fn user_media(&self, request: MediaRequest) -> Result<CapturedMedia, HostMediaError> {
        if let Some(err) = self.user_media_error.lock().await.take() {
            return Err(err);
        }

        let mut tracks = Vec::new();
        if request.audio {
            tracks.push(LocalTrack::new(TrackSource::Microphone, "synthetic microphone").0);
        }
        if request.video {
            tracks.push(LocalTrack::new(TrackSource::Camera, "synthetic camera").0);
        }

        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(CapturedMedia {
            stream_id: Uuid::new_v4().to_string(),
            tracks,
        })
    }

    async fn display_media(&self) -> Result<CapturedMedia, HostMediaError> {
        if let Some(err) = self.display_media_error.lock().await.take() {
            return Err(err);
        }

        let (track, ender) = LocalTrack::new(TrackSource::Screen, "synthetic display");
        self.screen_enders.lock().await.push(ender);

        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(CapturedMedia {
            stream_id: Uuid::new_v4().to_string(),
            tracks: vec![track],
        })
    }
}
