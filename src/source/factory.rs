use super::device::{CaptureDevice, DeviceFactory};
use super::network::HttpMjpegDevice;
use crate::config::CameraConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use std::time::Duration;

#[cfg(all(target_os = "linux", feature = "local-camera"))]
use super::gst::GstLocalDevice;
#[cfg(not(all(target_os = "linux", feature = "local-camera")))]
use super::pattern::TestPatternDevice;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Production device factory: GStreamer for local cameras where the
/// feature is enabled, a test pattern otherwise, and MJPEG-over-HTTP
/// for network cameras.
pub struct DefaultDeviceFactory {
    camera: CameraConfig,
    http: reqwest::Client,
}

impl DefaultDeviceFactory {
    pub fn new(camera: CameraConfig) -> Result<Self, CameraError> {
        // No total timeout on the client: stream responses are unbounded
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CameraError::BackendUnavailable {
                details: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { camera, http })
    }
}

#[async_trait]
impl DeviceFactory for DefaultDeviceFactory {
    #[cfg(all(target_os = "linux", feature = "local-camera"))]
    async fn open_local(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let device = GstLocalDevice::open(index, self.camera.resolution, self.camera.fps)?;
        Ok(Box::new(device))
    }

    #[cfg(not(all(target_os = "linux", feature = "local-camera")))]
    async fn open_local(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CameraError> {
        tracing::warn!(
            "Local camera backend unavailable; serving test pattern for device {}",
            index
        );
        Ok(Box::new(TestPatternDevice::new(index, self.camera.resolution)))
    }

    async fn open_network(&self, url: &str) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let device = HttpMjpegDevice::open(&self.http, url).await?;
        Ok(Box::new(device))
    }
}
