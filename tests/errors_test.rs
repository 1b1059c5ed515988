#[cfg(test)]
mod error_tests {
    use crabrelay::errors::{CaptureError, ConfigError, SessionError, SwitchError};
    use std::error::Error;

    #[test]
    fn test_session_error_messages() {
        let error = SessionError::SessionNotFound("zz99zz99".to_string());
        assert_eq!(error.to_string(), "Invalid or expired session");
        assert_eq!(error.session_id(), "zz99zz99");

        let error = SessionError::SessionFull("ab12cd34".to_string());
        assert_eq!(error.to_string(), "Session already has a guest connected");
        assert_eq!(error.session_id(), "ab12cd34");
    }

    #[test]
    fn test_switch_error_wraps_capture_error() {
        let error: SwitchError = CaptureError::DeviceNotFound("cam-3".to_string()).into();
        assert_eq!(error.to_string(), "Capture device not found: cam-3");
        assert!(error.user_message().starts_with("Camera switch failed"));
    }

    #[test]
    fn test_switch_error_display_trait() {
        assert_eq!(
            SwitchError::NoAlternativeInput.to_string(),
            "No alternative video input available"
        );
        assert_eq!(
            SwitchError::SwitchInProgress.to_string(),
            "A camera switch is already in progress"
        );
    }

    #[test]
    fn test_capture_error_debug_format() {
        let error = CaptureError::ReplaceTrackFailed("sender closed".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ReplaceTrackFailed"));
        assert!(debug_str.contains("sender closed"));
    }

    #[test]
    fn test_config_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = ConfigError::Write(io);
        assert!(error.to_string().contains("Failed to write config file"));
        assert!(error.source().is_some());

        let error = ConfigError::Invalid("bad port".to_string());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_errors_implement_error_trait() {
        let _e: &dyn Error = &SessionError::SessionFull("x".to_string());
        let _e: &dyn Error = &SwitchError::NoAlternativeInput;
        let _e: &dyn Error = &CaptureError::NoVideoTrack;
    }

    #[test]
    fn test_errors_convert_to_anyhow() {
        let result: anyhow::Result<()> = Err(SessionError::SessionNotFound("x".to_string()).into());
        assert!(result.unwrap_err().to_string().contains("Invalid or expired session"));
    }
}
