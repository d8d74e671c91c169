use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
}

impl TrackSource {
    pub fn kind(self) -> TrackKind {
        match self {
            TrackSource::Microphone => TrackKind::Audio,
            TrackSource::Camera | TrackSource::Screen => TrackKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
}

/// A stream as seen by the UI layer: an id plus the tracks it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<TrackInfo>,
}

impl MediaStream {
    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}

/// A captured local track.
///
/// Peer links hold `Arc<LocalTrack>` references but can only read them;
/// stopping and muting are reserved to the media capture.
#[derive(Debug)]
pub struct LocalTrack {
    id: String,
    source: TrackSource,
    label: String,
    enabled: AtomicBool,
    ended: Arc<watch::Sender<bool>>,
}

/// Handed to the host alongside a track so it can report that the track
/// ended on its own (device unplugged, user stopped sharing from OS chrome).
#[derive(Debug, Clone)]
pub struct TrackEnder {
    ended: Arc<watch::Sender<bool>>,
}

impl TrackEnder {
    pub fn end(&self) {
        self.ended.send_replace(true);
    }
}

impl LocalTrack {
    pub fn new(source: TrackSource, label: impl Into<String>) -> (Arc<Self>, TrackEnder) {
        let (tx, _rx) = watch::channel(false);
        let ended = Arc::new(tx);
        let track = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            source,
            label: label.into(),
            enabled: AtomicBool::new(true),
            ended: ended.clone(),
        });
        (track, TrackEnder { ended })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.source.kind()
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            id: self.id.clone(),
            kind: self.kind(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    pub fn ended_signal(&self) -> watch::Receiver<bool> {
        self.ended.subscribe()
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        self.ended.send_replace(true);
    }
}
