mod local_track;
mod media_capture;
mod media_devices;
mod synthetic_devices;

pub use local_track::{LocalTrack, MediaStream, TrackEnder, TrackInfo, TrackKind, TrackSource};
pub use media_capture::MediaCapture;
pub use media_devices::{CapturedMedia, HostMediaError, MediaDevices, MediaRequest};
pub use synthetic_devices::SyntheticDevices;
