use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical camera-direction preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a switch request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraTarget {
    Facing(FacingMode),
    Device(String),
    /// Any device other than the current one
    Next,
}

impl CameraTarget {
    /// Parse the `camera` field of a `requestCameraSwitch` message.
    ///
    /// `"user"` and `"environment"` are facing values, `""` and `"next"` cycle
    /// to another device, anything else is taken as a device identifier.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "user" => CameraTarget::Facing(FacingMode::User),
            "environment" => CameraTarget::Facing(FacingMode::Environment),
            "" | "next" => CameraTarget::Next,
            other => CameraTarget::Device(other.to_string()),
        }
    }
}

impl From<&str> for CameraTarget {
    fn from(raw: &str) -> Self {
        CameraTarget::parse(raw)
    }
}

impl From<FacingMode> for CameraTarget {
    fn from(facing: FacingMode) -> Self {
        CameraTarget::Facing(facing)
    }
}

/// Camera selector currently in effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CameraSelector {
    Facing(FacingMode),
    Device(String),
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSelector::Facing(facing) => write!(f, "{}", facing),
            CameraSelector::Device(id) => write!(f, "device:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Settings a track reports about itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub device_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub settings: TrackSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.track_of(TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.track_of(TrackKind::Audio)
    }

    pub fn track_of(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// How the video source of an acquisition is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Preferred, not required: the platform may hand back any camera
    IdealFacing(FacingMode),
    ExactDevice(String),
}

/// Constraints handed to the capture capability for one acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    pub video: VideoSource,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
    pub audio: bool,
}

impl CaptureConstraints {
    pub fn facing(facing: FacingMode, profile: CaptureProfile) -> Self {
        Self::with_source(VideoSource::IdealFacing(facing), profile)
    }

    pub fn device(device_id: impl Into<String>, profile: CaptureProfile) -> Self {
        Self::with_source(VideoSource::ExactDevice(device_id.into()), profile)
    }

    fn with_source(video: VideoSource, profile: CaptureProfile) -> Self {
        let (ideal_width, ideal_height) = profile.resolution();
        Self {
            video,
            ideal_width,
            ideal_height,
            ideal_frame_rate: profile.frame_rate(),
            audio: true,
        }
    }
}

/// Acquisition quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureProfile {
    /// 1920x1080 at 30 fps, desktop class links
    #[serde(alias = "high")]
    HighQuality,
    /// 640x480 at 15 fps, for 2g/3g links
    LowBandwidth,
    #[default]
    Mobile,
}

impl CaptureProfile {
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            CaptureProfile::HighQuality => (1920, 1080),
            CaptureProfile::LowBandwidth => (640, 480),
            CaptureProfile::Mobile => (1280, 720),
        }
    }

    pub fn frame_rate(&self) -> u32 {
        match self {
            CaptureProfile::HighQuality => 30,
            CaptureProfile::LowBandwidth => 15,
            CaptureProfile::Mobile => 24,
        }
    }
}

/// Snapshot of the capture state owned by a coordinator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureTrackState {
    pub selector: Option<CameraSelector>,
    pub device_id: Option<String>,
    pub video_track_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!(CameraTarget::parse("user"), CameraTarget::Facing(FacingMode::User));
        assert_eq!(
            CameraTarget::parse("environment"),
            CameraTarget::Facing(FacingMode::Environment)
        );
        assert_eq!(CameraTarget::parse(""), CameraTarget::Next);
        assert_eq!(CameraTarget::parse("next"), CameraTarget::Next);
        assert_eq!(
            CameraTarget::parse("cam-42"),
            CameraTarget::Device("cam-42".to_string())
        );
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(CameraSelector::Facing(FacingMode::User).to_string(), "user");
        assert_eq!(CameraSelector::Device("B".into()).to_string(), "device:B");
    }

    #[test]
    fn test_profile_constraints() {
        let c = CaptureConstraints::facing(FacingMode::Environment, CaptureProfile::Mobile);
        assert_eq!(c.video, VideoSource::IdealFacing(FacingMode::Environment));
        assert_eq!((c.ideal_width, c.ideal_height), (1280, 720));
        assert_eq!(c.ideal_frame_rate, 24);
        assert!(c.audio);

        let c = CaptureConstraints::device("A", CaptureProfile::LowBandwidth);
        assert_eq!(c.video, VideoSource::ExactDevice("A".to_string()));
        assert_eq!(c.ideal_frame_rate, 15);
    }

    #[test]
    fn test_profile_serde_names() {
        let p: CaptureProfile = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, CaptureProfile::HighQuality);
        let p: CaptureProfile = serde_json::from_str("\"low_bandwidth\"").unwrap();
        assert_eq!(p, CaptureProfile::LowBandwidth);
    }
}
