//! In-memory capture devices and peer senders
//!
//! Models the hardware behaviours camera switching has to survive, most
//! notably the single virtual camera that ignores facing preferences and
//! hands back the very track already in use.

use crate::camera::{
    CaptureConstraints, DeviceKind, FacingMode, MediaCapture, MediaDeviceInfo, MediaStream,
    MediaTrack, TrackKind, TrackSenders, TrackSettings, VideoSource,
};
use crate::errors::CaptureError;
use std::sync::Mutex;
use std::time::Duration;

/// One synthetic device
#[derive(Debug, Clone)]
pub struct SyntheticDevice {
    pub info: MediaDeviceInfo,
    pub facing: Option<FacingMode>,
}

impl SyntheticDevice {
    pub fn camera(id: &str, label: &str, facing: Option<FacingMode>) -> Self {
        Self {
            info: MediaDeviceInfo {
                device_id: id.to_string(),
                kind: DeviceKind::VideoInput,
                label: label.to_string(),
            },
            facing,
        }
    }

    pub fn microphone(id: &str, label: &str) -> Self {
        Self {
            info: MediaDeviceInfo {
                device_id: id.to_string(),
                kind: DeviceKind::AudioInput,
                label: label.to_string(),
            },
            facing: None,
        }
    }
}

#[derive(Default)]
struct CaptureLog {
    active_device: Option<String>,
    opened: u64,
    stopped: u64,
    requests: Vec<CaptureConstraints>,
}

/// Synthetic [`MediaCapture`] backed by a fixed device list
pub struct SyntheticCapture {
    devices: Vec<SyntheticDevice>,
    honor_facing: bool,
    sticky_tracks: bool,
    report_device_id: bool,
    with_audio: bool,
    open_delay: Option<Duration>,
    fail_enumeration: bool,
    log: Mutex<CaptureLog>,
}

impl SyntheticCapture {
    pub fn new(devices: Vec<SyntheticDevice>) -> Self {
        Self {
            devices,
            honor_facing: true,
            sticky_tracks: false,
            report_device_id: true,
            with_audio: true,
            open_delay: None,
            fail_enumeration: false,
            log: Mutex::new(CaptureLog::default()),
        }
    }

    /// Facing requests return whichever camera is already active
    pub fn ignoring_facing(mut self) -> Self {
        self.honor_facing = false;
        self
    }

    /// Opening a device again yields the same track id
    pub fn with_sticky_tracks(mut self) -> Self {
        self.sticky_tracks = true;
        self
    }

    /// Tracks do not report their device id in their settings
    pub fn without_device_settings(mut self) -> Self {
        self.report_device_id = false;
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.with_audio = false;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn stopped_streams(&self) -> u64 {
        self.log.lock().expect("lock poisoned").stopped
    }

    pub fn opened_streams(&self) -> u64 {
        self.log.lock().expect("lock poisoned").opened
    }

    /// Every constraint set passed to `open_stream`, in call order
    pub fn requests(&self) -> Vec<CaptureConstraints> {
        self.log.lock().expect("lock poisoned").requests.clone()
    }

    fn cameras(&self) -> impl Iterator<Item = &SyntheticDevice> {
        self.devices
            .iter()
            .filter(|d| d.info.kind == DeviceKind::VideoInput)
    }

    fn resolve(&self, source: &VideoSource, active: Option<&str>) -> Result<String, CaptureError> {
        let fallback = || {
            active
                .map(str::to_string)
                .or_else(|| self.cameras().next().map(|d| d.info.device_id.clone()))
                .ok_or_else(|| CaptureError::AcquisitionFailed("no video input".to_string()))
        };

        match source {
            VideoSource::ExactDevice(id) => self
                .cameras()
                .find(|d| &d.info.device_id == id)
                .map(|d| d.info.device_id.clone())
                .ok_or_else(|| CaptureError::DeviceNotFound(id.clone())),
            VideoSource::IdealFacing(facing) if self.honor_facing => self
                .cameras()
                .find(|d| d.facing == Some(*facing))
                .map(|d| Ok(d.info.device_id.clone()))
                .unwrap_or_else(fallback),
            VideoSource::IdealFacing(_) => fallback(),
        }
    }
}

impl MediaCapture for SyntheticCapture {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CaptureError> {
        if self.fail_enumeration {
            return Err(CaptureError::EnumerationFailed("synthetic failure".to_string()));
        }
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    async fn open_stream(&self, constraints: &CaptureConstraints) -> Result<MediaStream, CaptureError> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        let mut log = self.log.lock().expect("lock poisoned");
        log.requests.push(constraints.clone());
        let device_id = self.resolve(&constraints.video, log.active_device.as_deref())?;
        log.opened += 1;
        let n = log.opened;
        log.active_device = Some(device_id.clone());

        let video_id = if self.sticky_tracks {
            format!("{}-video", device_id)
        } else {
            format!("{}-video-{}", device_id, n)
        };

        let mut tracks = vec![MediaTrack {
            id: video_id,
            kind: TrackKind::Video,
            settings: TrackSettings {
                device_id: self.report_device_id.then(|| device_id.clone()),
                width: Some(constraints.ideal_width),
                height: Some(constraints.ideal_height),
                frame_rate: Some(constraints.ideal_frame_rate as f32),
            },
        }];
        if self.with_audio && constraints.audio {
            tracks.push(MediaTrack {
                id: format!("audio-{}", n),
                kind: TrackKind::Audio,
                settings: TrackSettings::default(),
            });
        }

        Ok(MediaStream {
            id: format!("stream-{}", n),
            tracks,
        })
    }

    fn stop_stream(&self, _stream: &MediaStream) {
        self.log.lock().expect("lock poisoned").stopped += 1;
    }
}

/// [`TrackSenders`] that remembers every replacement
pub struct RecordingSenders {
    kinds: Vec<Option<TrackKind>>,
    replaced: Mutex<Vec<(usize, MediaTrack)>>,
}

impl RecordingSenders {
    pub fn new(kinds: Vec<Option<TrackKind>>) -> Self {
        Self {
            kinds,
            replaced: Mutex::new(Vec::new()),
        }
    }

    /// (sender index, new track) pairs in call order
    pub fn replacements(&self) -> Vec<(usize, MediaTrack)> {
        self.replaced.lock().expect("lock poisoned").clone()
    }
}

impl TrackSenders for RecordingSenders {
    fn sender_kinds(&self) -> Vec<Option<TrackKind>> {
        self.kinds.clone()
    }

    async fn replace_track(&self, sender: usize, track: &MediaTrack) -> Result<(), CaptureError> {
        if sender >= self.kinds.len() {
            return Err(CaptureError::ReplaceTrackFailed(format!("no sender {}", sender)));
        }
        self.replaced
            .lock()
            .expect("lock poisoned")
            .push((sender, track.clone()));
        Ok(())
    }
}
