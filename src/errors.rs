use thiserror::Error;

/// Session and guest-slot failures surfaced to the requesting connection.
///
/// These never alter registry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid or expired session")]
    SessionNotFound(String),
    #[error("Session already has a guest connected")]
    SessionFull(String),
}

impl SessionError {
    /// Identifier of the session the request targeted
    pub fn session_id(&self) -> &str {
        match self {
            SessionError::SessionNotFound(id) | SessionError::SessionFull(id) => id,
        }
    }
}

/// Failures reported by the external capture / peer-connection capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Capture device not found: {0}")]
    DeviceNotFound(String),
    #[error("Failed to acquire capture stream: {0}")]
    AcquisitionFailed(String),
    #[error("Captured stream has no video track")]
    NoVideoTrack,
    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(String),
    #[error("Track replacement failed: {0}")]
    ReplaceTrackFailed(String),
}

/// Camera switch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    /// Fewer than two video inputs exist; retrying will not help.
    #[error("No alternative video input available")]
    NoAlternativeInput,
    #[error("A camera switch is already in progress")]
    SwitchInProgress,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl SwitchError {
    /// Actionable text for the person holding the device
    pub fn user_message(&self) -> String {
        match self {
            SwitchError::NoAlternativeInput => "Multiple physical cameras not available. \
                Open the guest page directly in the phone browser, not through a virtual \
                camera bridge, to switch cameras."
                .to_string(),
            SwitchError::SwitchInProgress => "Camera switch already running, try again shortly".to_string(),
            SwitchError::Capture(e) => format!("Camera switch failed: {}", e),
        }
    }
}

/// Configuration load / save / validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
