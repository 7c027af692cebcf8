use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl VisionError {
    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by camera sources and the source manager.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No usable local camera among candidates {candidates:?}")]
    NoLocalDevice { candidates: Vec<u32> },

    #[error("Failed to open device {index}: {details}")]
    OpenFailed { index: u32, details: String },

    #[error("Network stream {url} unreachable: {details}")]
    NetworkUnreachable { url: String, details: String },

    #[error("Frame read failed: {details}")]
    ReadFailed { details: String },

    #[error("Capture source disconnected")]
    Disconnected,

    #[error("Frame decode failed: {details}")]
    Decode { details: String },

    #[error("Capture backend not available: {details}")]
    BackendUnavailable { details: String },
}

/// Errors raised by the remote labeling client.
///
/// The taxonomy mirrors the remote service's failure classes: token expiry
/// is retryable after a credential refresh, permission and credential
/// problems are fatal, everything else is transient.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Security token has expired")]
    ExpiredToken,

    #[error("Permission denied by labeling service")]
    PermissionDenied,

    #[error("No credentials configured for labeling service")]
    MissingCredentials,

    #[error("Transient labeling service error: {details}")]
    Transient { details: String },

    #[error("Malformed labeling service response: {details}")]
    Protocol { details: String },

    #[error("Labeling service initialization failed after {attempts} attempts")]
    InitFailed { attempts: u32 },
}

impl DetectorError {
    /// Whether an initialization attempt may be retried after this error.
    /// Permission and credential problems are fatal; everything else is
    /// worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PermissionDenied | Self::MissingCredentials | Self::InitFailed { .. }
        )
    }
}

/// Errors raised by the HTTP boundary.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind to address {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },

    #[error("Stream server startup failed: {details}")]
    StartupFailed { details: String },
}

pub type Result<T> = std::result::Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(DetectorError::ExpiredToken.is_retryable());
        assert!(DetectorError::Transient {
            details: "timeout".to_string()
        }
        .is_retryable());
        assert!(DetectorError::Protocol {
            details: "truncated body".to_string()
        }
        .is_retryable());
        assert!(!DetectorError::PermissionDenied.is_retryable());
        assert!(!DetectorError::MissingCredentials.is_retryable());
        assert!(!DetectorError::InitFailed { attempts: 3 }.is_retryable());
    }

    #[test]
    fn component_error_display() {
        let err = VisionError::component("pipeline", "frame encode failed");
        assert_eq!(
            err.to_string(),
            "Component error in pipeline: frame encode failed"
        );
    }
}
