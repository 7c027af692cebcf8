use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    pub camera: CameraConfig,
    pub network: NetworkCameraConfig,
    pub detector: DetectorConfig,
    pub stream: StreamConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Local device indices to probe, in order (e.g. 0 for /dev/video0)
    #[serde(default = "default_local_candidates")]
    pub local_candidates: Vec<u32>,

    /// Working resolution every frame is normalized to (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Target frames per second for the pipeline loop
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkCameraConfig {
    /// Host of the phone/IP camera MJPEG server
    #[serde(default = "default_network_host")]
    pub host: String,

    /// Port of the phone/IP camera MJPEG server
    #[serde(default = "default_network_port")]
    pub port: u16,

    /// Path of the MJPEG stream on the camera server
    #[serde(default = "default_network_path")]
    pub path: String,
}

impl NetworkCameraConfig {
    /// Full stream URL for the configured endpoint.
    pub fn stream_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Base URL of the remote image-labeling service
    #[serde(default = "default_detector_endpoint")]
    pub endpoint: String,

    /// Minimum confidence for returned labels, in [0,1]
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,

    /// Maximum labels requested from the service per frame
    #[serde(default = "default_max_labels")]
    pub max_labels: u32,

    /// Maximum detections kept per frame after mapping
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,

    /// Attempts for initialization and expired-token recovery
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed backoff between initialization attempts, in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// JPEG quality used when submitting frames to the service
    #[serde(default = "default_submit_jpeg_quality")]
    pub submit_jpeg_quality: u8,

    /// Request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// JPEG quality of emitted stream frames
    #[serde(default = "default_stream_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Path to TrueType font file for text overlays
    #[serde(default = "default_font_path")]
    pub font_path: String,
}

impl VisionConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("visionlingo.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default(
                "camera.local_candidates",
                default_local_candidates()
                    .into_iter()
                    .map(|i| i as i64)
                    .collect::<Vec<i64>>(),
            )?
            .set_default(
                "camera.resolution",
                vec![
                    default_camera_resolution().0 as i64,
                    default_camera_resolution().1 as i64,
                ],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("network.host", default_network_host())?
            .set_default("network.port", default_network_port())?
            .set_default("network.path", default_network_path())?
            .set_default("detector.endpoint", default_detector_endpoint())?
            .set_default(
                "detector.confidence_floor",
                default_confidence_floor() as f64,
            )?
            .set_default("detector.max_labels", default_max_labels())?
            .set_default("detector.max_detections", default_max_detections() as i64)?
            .set_default("detector.max_retries", default_max_retries())?
            .set_default(
                "detector.retry_backoff_secs",
                default_retry_backoff_secs() as i64,
            )?
            .set_default(
                "detector.submit_jpeg_quality",
                default_submit_jpeg_quality() as i64,
            )?
            .set_default(
                "detector.request_timeout_secs",
                default_request_timeout_secs() as i64,
            )?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.port", default_stream_port())?
            .set_default(
                "stream.jpeg_quality",
                default_stream_jpeg_quality() as i64,
            )?
            .set_default("overlay.font_path", default_font_path())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with VISIONLINGO_ prefix
            .add_source(Environment::with_prefix("VISIONLINGO").separator("_"))
            .build()?;

        let config: VisionConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.local_candidates.is_empty() {
            return Err(ConfigError::Message(
                "At least one local camera candidate index is required".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.detector.confidence_floor) {
            return Err(ConfigError::Message(
                "Detector confidence floor must be within [0, 1]".to_string(),
            ));
        }

        if self.detector.max_labels == 0 {
            return Err(ConfigError::Message(
                "Detector max_labels must be greater than 0".to_string(),
            ));
        }

        if self.detector.max_detections == 0 {
            return Err(ConfigError::Message(
                "Detector max_detections must be greater than 0".to_string(),
            ));
        }

        if self.detector.max_retries == 0 {
            return Err(ConfigError::Message(
                "Detector max_retries must be greater than 0".to_string(),
            ));
        }

        if self.detector.submit_jpeg_quality == 0 || self.detector.submit_jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Detector submit_jpeg_quality must be within 1-100".to_string(),
            ));
        }

        if self.stream.jpeg_quality == 0 || self.stream.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Stream jpeg_quality must be within 1-100".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                local_candidates: default_local_candidates(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
            },
            network: NetworkCameraConfig {
                host: default_network_host(),
                port: default_network_port(),
                path: default_network_path(),
            },
            detector: DetectorConfig {
                endpoint: default_detector_endpoint(),
                confidence_floor: default_confidence_floor(),
                max_labels: default_max_labels(),
                max_detections: default_max_detections(),
                max_retries: default_max_retries(),
                retry_backoff_secs: default_retry_backoff_secs(),
                submit_jpeg_quality: default_submit_jpeg_quality(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                jpeg_quality: default_stream_jpeg_quality(),
            },
            overlay: OverlayConfig {
                font_path: default_font_path(),
            },
        }
    }
}

// Default value functions
fn default_local_candidates() -> Vec<u32> {
    vec![0, 1, 2]
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_network_host() -> String {
    "192.168.0.180".to_string()
}
fn default_network_port() -> u16 {
    8080
}
fn default_network_path() -> String {
    "/video".to_string()
}

fn default_detector_endpoint() -> String {
    "http://localhost:9000".to_string()
}
fn default_confidence_floor() -> f32 {
    0.5
}
fn default_max_labels() -> u32 {
    25
}
fn default_max_detections() -> usize {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_secs() -> u64 {
    2
}
fn default_submit_jpeg_quality() -> u8 {
    85
}
fn default_request_timeout_secs() -> u64 {
    15
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    5000
}
fn default_stream_jpeg_quality() -> u8 {
    90
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = VisionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.detector.max_retries, 3);
        assert_eq!(config.detector.max_labels, 25);
    }

    #[test]
    fn test_network_stream_url() {
        let config = VisionConfig::default();
        assert_eq!(
            config.network.stream_url(),
            "http://192.168.0.180:8080/video"
        );
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let mut config = VisionConfig::default();
        config.camera.resolution = (0, 480);
        assert!(config.validate().is_err());

        config.camera.resolution = (640, 480);
        config.detector.confidence_floor = 1.5;
        assert!(config.validate().is_err());

        config.detector.confidence_floor = 0.5;
        config.stream.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.stream.jpeg_quality = 90;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[camera]
local_candidates = [1]
fps = 15

[stream]
port = 8123
"#
        )
        .unwrap();

        let config = VisionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.local_candidates, vec![1]);
        assert_eq!(config.camera.fps, 15);
        assert_eq!(config.stream.port, 8123);
        // Untouched keys keep their defaults
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.detector.max_retries, 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = VisionConfig::load_from_file("/nonexistent/visionlingo.toml").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.stream.port, default_stream_port());
    }
}
