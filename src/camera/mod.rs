//! Camera switch negotiation
//!
//! Guest-side half of the `requestCameraSwitch` control message: choose a
//! capture device that is actually different from the one in use and feed
//! it into the established peer connection.

pub mod capability;
pub mod coordinator;
pub mod types;

pub use capability::{MediaCapture, TrackSenders};
pub use coordinator::CameraSwitchCoordinator;
pub use types::{
    CameraSelector, CameraTarget, CaptureConstraints, CaptureProfile, CaptureTrackState,
    DeviceKind, FacingMode, MediaDeviceInfo, MediaStream, MediaTrack, TrackKind, TrackSettings,
    VideoSource,
};
