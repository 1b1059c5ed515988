//! Seams to the platform media stack.
//!
//! The coordinator never touches hardware or the peer connection directly.
//! Browsers, native WebRTC bindings and the synthetic devices in
//! [`crate::testing`] all plug in here.

use crate::camera::types::{CaptureConstraints, MediaDeviceInfo, MediaStream, MediaTrack, TrackKind};
use crate::errors::CaptureError;
use std::future::Future;

/// Device enumeration and stream acquisition
pub trait MediaCapture: Send + Sync {
    /// Every media device the platform exposes, in platform order
    fn enumerate_devices(&self) -> impl Future<Output = Result<Vec<MediaDeviceInfo>, CaptureError>> + Send;

    /// Acquire a new stream. May suspend on hardware access.
    fn open_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<MediaStream, CaptureError>> + Send;

    /// Release every track of a stream that will not be used
    fn stop_stream(&self, stream: &MediaStream);
}

/// Outgoing senders of an established peer connection
pub trait TrackSenders: Send + Sync {
    /// Kind of the track each sender currently carries, by sender index.
    /// `None` for a sender with no track.
    fn sender_kinds(&self) -> Vec<Option<TrackKind>>;

    /// Swap the source of one sender without renegotiating
    fn replace_track(
        &self,
        sender: usize,
        track: &MediaTrack,
    ) -> impl Future<Output = Result<(), CaptureError>> + Send;
}
