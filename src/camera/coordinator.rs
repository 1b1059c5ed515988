use crate::camera::capability::{MediaCapture, TrackSenders};
use crate::camera::types::{
    CameraSelector, CameraTarget, CaptureConstraints, CaptureProfile, CaptureTrackState,
    DeviceKind, FacingMode, MediaStream, MediaTrack,
};
use crate::errors::{CaptureError, SwitchError};
use crate::relay::ServerEvent;
use tokio::sync::Mutex;

/// Why the direct attempt handed over to device enumeration
#[derive(Debug)]
enum Fallback {
    /// Facing request came back with the track already in use
    SameTrack(String),
    Failed(CaptureError),
    Requested,
}

impl From<CaptureError> for Fallback {
    fn from(e: CaptureError) -> Self {
        Fallback::Failed(e)
    }
}

/// Guest-side camera switching.
///
/// Acquires a stream from a different physical camera and swaps it into the
/// outgoing senders of the live peer connection, so no renegotiation round
/// trip through the relay is needed. One switch runs at a time; a request
/// arriving mid-switch is rejected with [`SwitchError::SwitchInProgress`].
pub struct CameraSwitchCoordinator<C, S> {
    capture: C,
    senders: S,
    profile: CaptureProfile,
    state: Mutex<CaptureTrackState>,
}

impl<C: MediaCapture, S: TrackSenders> CameraSwitchCoordinator<C, S> {
    pub fn new(capture: C, senders: S, profile: CaptureProfile) -> Self {
        Self {
            capture,
            senders,
            profile,
            state: Mutex::new(CaptureTrackState::default()),
        }
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn senders(&self) -> &S {
        &self.senders
    }

    pub fn profile(&self) -> CaptureProfile {
        self.profile
    }

    /// Current capture state. Waits for an in-flight switch to finish.
    pub async fn state(&self) -> CaptureTrackState {
        self.state.lock().await.clone()
    }

    /// Initial acquisition before the peer connection exists.
    ///
    /// Records the capture state but replaces nothing; the caller attaches
    /// the returned tracks to the new peer connection itself.
    pub async fn start(&self, facing: FacingMode) -> Result<MediaStream, SwitchError> {
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| SwitchError::SwitchInProgress)?;

        let stream = self
            .capture
            .open_stream(&CaptureConstraints::facing(facing, self.profile))
            .await?;
        let video = match stream.video_track() {
            Some(track) => track.clone(),
            None => {
                self.capture.stop_stream(&stream);
                return Err(CaptureError::NoVideoTrack.into());
            }
        };

        record(&mut state, CameraSelector::Facing(facing), video.settings.device_id.clone(), &video);
        log::info!(
            "Local capture started: facing={} device={:?} track={}",
            facing,
            state.device_id,
            video.id
        );
        Ok(stream)
    }

    /// Route a relayed `requestCameraSwitch` to [`switch_camera`](Self::switch_camera).
    ///
    /// Returns `None` for every other event.
    pub async fn handle_server_event(
        &self,
        event: &ServerEvent,
    ) -> Option<Result<MediaStream, SwitchError>> {
        match event {
            ServerEvent::RequestCameraSwitch { camera } => {
                log::info!("[CONTROL] Host requested camera switch to: {}", camera);
                Some(self.switch_camera(CameraTarget::parse(camera)).await)
            }
            _ => None,
        }
    }

    /// Switch the outgoing video to another capture device.
    ///
    /// On success the returned stream is live on the peer connection and its
    /// video track differs from the one in effect before the call, unless the
    /// caller pinned the device already in use.
    pub async fn switch_camera(
        &self,
        target: impl Into<CameraTarget>,
    ) -> Result<MediaStream, SwitchError> {
        let target = target.into();
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| SwitchError::SwitchInProgress)?;
        let previous_track = state.video_track_id.clone();

        log::info!(
            "Camera switch requested: {:?} (current selector={:?} device={:?})",
            target,
            state.selector,
            state.device_id
        );

        let attempt = match &target {
            CameraTarget::Facing(facing) => self.switch_by_facing(&mut state, *facing).await,
            CameraTarget::Device(device_id) => self.switch_to_device(&mut state, device_id).await,
            CameraTarget::Next => Err(Fallback::Requested),
        };

        match attempt {
            Ok(stream) => return Ok(stream),
            Err(Fallback::SameTrack(track_id)) => log::warn!(
                "Facing request returned the active track {}, falling back to device enumeration",
                track_id
            ),
            Err(Fallback::Failed(e)) => {
                log::warn!("Direct camera switch failed, falling back to device enumeration: {}", e)
            }
            Err(Fallback::Requested) => {}
        }

        self.switch_by_enumeration(&mut state, previous_track.as_deref()).await
    }

    async fn switch_by_facing(
        &self,
        state: &mut CaptureTrackState,
        facing: FacingMode,
    ) -> Result<MediaStream, Fallback> {
        let stream = self
            .capture
            .open_stream(&CaptureConstraints::facing(facing, self.profile))
            .await?;
        let video = self.require_video(&stream)?;

        if state.video_track_id.as_deref() == Some(video.id.as_str()) {
            self.capture.stop_stream(&stream);
            return Err(Fallback::SameTrack(video.id));
        }

        self.replace_outgoing(&stream).await?;
        record(state, CameraSelector::Facing(facing), video.settings.device_id.clone(), &video);
        log::info!("Switched camera by facing {} (device={:?})", facing, state.device_id);
        Ok(stream)
    }

    async fn switch_to_device(
        &self,
        state: &mut CaptureTrackState,
        device_id: &str,
    ) -> Result<MediaStream, Fallback> {
        let stream = self
            .capture
            .open_stream(&CaptureConstraints::device(device_id, self.profile))
            .await?;
        let video = self.require_video(&stream)?;

        self.replace_outgoing(&stream).await?;
        let resolved = video
            .settings
            .device_id
            .clone()
            .unwrap_or_else(|| device_id.to_string());
        record(state, CameraSelector::Device(device_id.to_string()), Some(resolved), &video);
        log::info!("Switched camera to pinned device {}", device_id);
        Ok(stream)
    }

    /// Walk the enumerated video inputs until one yields a track other than
    /// `previous_track`. Devices known to be in use are tried last.
    async fn switch_by_enumeration(
        &self,
        state: &mut CaptureTrackState,
        previous_track: Option<&str>,
    ) -> Result<MediaStream, SwitchError> {
        let inputs: Vec<_> = self
            .capture
            .enumerate_devices()
            .await?
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();

        if inputs.len() < 2 {
            log::warn!(
                "Only {} video input(s) available, no alternative camera to switch to",
                inputs.len()
            );
            return Err(SwitchError::NoAlternativeInput);
        }

        let current = state.device_id.clone();
        let (in_use, others): (Vec<_>, Vec<_>) = inputs
            .into_iter()
            .partition(|d| current.as_deref() == Some(d.device_id.as_str()));

        let mut last_error = None;
        for candidate in others.into_iter().chain(in_use) {
            log::info!(
                "Trying alternative video input {} ({})",
                candidate.device_id,
                candidate.label
            );

            let stream = match self
                .capture
                .open_stream(&CaptureConstraints::device(&candidate.device_id, self.profile))
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Video input {} unavailable: {}", candidate.device_id, e);
                    last_error = Some(e);
                    continue;
                }
            };

            let Some(video) = stream.video_track().cloned() else {
                self.capture.stop_stream(&stream);
                last_error = Some(CaptureError::NoVideoTrack);
                continue;
            };
            if previous_track == Some(video.id.as_str()) {
                log::warn!(
                    "Video input {} returned the active track {}, skipping",
                    candidate.device_id,
                    video.id
                );
                self.capture.stop_stream(&stream);
                continue;
            }

            self.replace_outgoing(&stream).await?;
            record(
                state,
                CameraSelector::Device(candidate.device_id.clone()),
                Some(candidate.device_id.clone()),
                &video,
            );
            return Ok(stream);
        }

        // only same-track results left means no second physical camera
        match last_error {
            Some(e) => Err(e.into()),
            None => Err(SwitchError::NoAlternativeInput),
        }
    }

    fn require_video(&self, stream: &MediaStream) -> Result<MediaTrack, Fallback> {
        match stream.video_track() {
            Some(track) => Ok(track.clone()),
            None => {
                self.capture.stop_stream(stream);
                Err(Fallback::Failed(CaptureError::NoVideoTrack))
            }
        }
    }

    /// Give each sender the new track of its own kind. Senders whose kind the
    /// stream lacks keep their current track.
    async fn replace_outgoing(&self, stream: &MediaStream) -> Result<(), CaptureError> {
        for (index, kind) in self.senders.sender_kinds().into_iter().enumerate() {
            let Some(kind) = kind else { continue };
            if let Some(track) = stream.track_of(kind) {
                self.senders.replace_track(index, track).await?;
            }
        }
        Ok(())
    }
}

fn record(
    state: &mut CaptureTrackState,
    selector: CameraSelector,
    device_id: Option<String>,
    video: &MediaTrack,
) {
    state.selector = Some(selector);
    state.device_id = device_id;
    state.video_track_id = Some(video.id.clone());
}
