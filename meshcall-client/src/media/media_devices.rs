use crate::error::MediaError;
use crate::media::local_track::{LocalTrack, MediaStream};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaRequest {
    pub audio: bool,
    pub video: bool,
}

/// Tracks handed over by the host for one capture request.
#[derive(Debug, Clone)]
pub struct CapturedMedia {
    pub stream_id: String,
    pub tracks: Vec<Arc<LocalTrack>>,
}

impl CapturedMedia {
    pub fn describe(&self) -> MediaStream {
        MediaStream {
            id: self.stream_id.clone(),
            tracks: self.tracks.iter().map(|t| t.info()).collect(),
        }
    }
}

/// Failure identifiers as the host reports them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostMediaError {
    #[error("NotAllowedError")]
    NotAllowed,
    #[error("NotFoundError")]
    NotFound,
    #[error("NotReadableError")]
    NotReadable,
    #[error("OverconstrainedError")]
    Overconstrained,
    #[error("SecurityError")]
    Security,
    #[error("AbortError")]
    Abort,
    #[error("{0}")]
    Other(String),
}

impl HostMediaError {
    pub fn from_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => HostMediaError::NotAllowed,
            "NotFoundError" | "DevicesNotFoundError" => HostMediaError::NotFound,
            "NotReadableError" | "TrackStartError" => HostMediaError::NotReadable,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                HostMediaError::Overconstrained
            }
            "SecurityError" => HostMediaError::Security,
            "AbortError" => HostMediaError::Abort,
            other => HostMediaError::Other(other.to_owned()),
        }
    }

    /// Maps onto the closed taxonomy. `what` names the device for the
    /// user-facing message.
    pub fn into_media_error(self, what: &str) -> MediaError {
        let what = what.to_owned();
        match self {
            HostMediaError::NotAllowed => MediaError::PermissionDenied { what },
            HostMediaError::NotFound | HostMediaError::Overconstrained => {
                MediaError::Unavailable { what }
            }
            HostMediaError::NotReadable | HostMediaError::Abort => MediaError::Busy { what },
            HostMediaError::Security => MediaError::InsecureContext,
            HostMediaError::Other(name) => {
                warn!("Unrecognised host media error '{}' for {}", name, what);
                MediaError::Unavailable { what }
            }
        }
    }
}

/// Host capture facilities.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Capture is refused outright on insecure origins.
    fn is_secure_context(&self) -> bool {
        true
    }

    async fn user_media(&self, request: MediaRequest) -> Result<CapturedMedia, HostMediaError>;

    async fn display_media(&self) -> Result<CapturedMedia, HostMediaError>;
}
