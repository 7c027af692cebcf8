use crate::error::CameraError;
use async_trait::async_trait;
use image::RgbImage;

/// One open capture resource: a local device or a network stream.
///
/// Exclusive ownership of the underlying resource; dropping the device
/// releases it.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Read the next frame. Errors indicate the device is unhealthy or
    /// the read failed; the caller decides whether to keep the device.
    async fn read(&mut self) -> Result<RgbImage, CameraError>;

    /// Whether the underlying resource is still usable.
    fn is_open(&self) -> bool;

    /// Human-readable description for diagnostics.
    fn describe(&self) -> String;
}

/// Factory seam for opening capture devices, so the source manager can
/// be exercised against mock devices in tests.
#[async_trait]
pub trait DeviceFactory: Send + Sync {
    async fn open_local(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CameraError>;

    async fn open_network(&self, url: &str) -> Result<Box<dyn CaptureDevice>, CameraError>;
}
