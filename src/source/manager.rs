use super::device::{CaptureDevice, DeviceFactory};
use crate::config::{CameraConfig, NetworkCameraConfig};
use crate::error::CameraError;
use crate::frame::resize_to;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tracing::{info, warn};

/// Which kind of source is currently feeding the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Network,
    Static,
}

impl SourceKind {
    /// Status label rendered onto outgoing frames.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Local => "LOCAL CAM",
            SourceKind::Network => "NETWORK CAM",
            SourceKind::Static => "PHOTO",
        }
    }

    /// Accent color for the status label.
    pub fn accent(&self) -> Rgb<u8> {
        match self {
            SourceKind::Local => Rgb([80, 140, 255]),
            SourceKind::Network => Rgb([0, 200, 0]),
            SourceKind::Static => Rgb([255, 165, 0]),
        }
    }
}

enum ActiveSource {
    None,
    Device {
        kind: SourceKind,
        device: Box<dyn CaptureDevice>,
    },
    Still {
        image: RgbImage,
    },
}

/// Owner of the single active frame source.
///
/// At most one source is live at a time; switching drops the previous
/// device first so its resource is released before the next one opens.
/// The async mutex also serializes switches against in-flight reads.
pub struct SourceManager {
    active: tokio::sync::Mutex<ActiveSource>,
    factory: Arc<dyn DeviceFactory>,
    camera: CameraConfig,
    network: parking_lot::RwLock<NetworkCameraConfig>,
    current_kind: parking_lot::RwLock<Option<SourceKind>>,
}

impl SourceManager {
    pub fn new(
        factory: Arc<dyn DeviceFactory>,
        camera: CameraConfig,
        network: NetworkCameraConfig,
    ) -> Self {
        Self {
            active: tokio::sync::Mutex::new(ActiveSource::None),
            factory,
            camera,
            network: parking_lot::RwLock::new(network),
            current_kind: parking_lot::RwLock::new(None),
        }
    }

    /// Switch to the first local device that opens and produces a frame.
    ///
    /// The previous source is released before probing, so a device held
    /// by this process does not block its own reopen.
    pub async fn switch_to_local(&self) -> Result<(), CameraError> {
        let mut active = self.active.lock().await;
        self.activate_local(&mut active).await
    }

    /// Switch to the network camera stream, updating the stored endpoint
    /// when overrides are given. On failure the manager falls back to a
    /// local device so the pipeline keeps producing frames, but the
    /// network error is still returned to the caller.
    pub async fn switch_to_network(
        &self,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<(), CameraError> {
        {
            let mut network = self.network.write();
            if let Some(host) = host {
                network.host = host;
            }
            if let Some(port) = port {
                network.port = port;
            }
        }
        let url = self.network.read().stream_url();

        let mut active = self.active.lock().await;
        self.release(&mut active);

        match self.probe_network(&url).await {
            Ok(device) => {
                info!("Switched to network camera at {}", url);
                *active = ActiveSource::Device {
                    kind: SourceKind::Network,
                    device,
                };
                *self.current_kind.write() = Some(SourceKind::Network);
                Ok(())
            }
            Err(e) => {
                warn!("Network camera at {} unavailable ({}); falling back to local", url, e);
                if let Err(fallback) = self.activate_local(&mut active).await {
                    warn!("Local fallback also failed: {}", fallback);
                }
                Err(e)
            }
        }
    }

    /// Replace the active source with a still image, normalized to the
    /// working resolution. Never fails and releases any open device.
    pub async fn switch_to_static(&self, image: RgbImage) {
        let (width, height) = self.camera.resolution;
        let image = resize_to(image, width, height);

        let mut active = self.active.lock().await;
        self.release(&mut active);
        *active = ActiveSource::Still { image };
        *self.current_kind.write() = Some(SourceKind::Static);
        info!("Switched to static photo source");
    }

    /// Read one frame from the active source. `None` means the source
    /// could not produce a frame; the caller substitutes a placeholder.
    pub async fn read_frame(&self) -> Option<RgbImage> {
        let mut active = self.active.lock().await;
        match &mut *active {
            ActiveSource::None => None,
            ActiveSource::Still { image } => Some(image.clone()),
            ActiveSource::Device { device, .. } => match device.read().await {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("Frame read from {} failed: {}", device.describe(), e);
                    None
                }
            },
        }
    }

    /// Kind of the active source, if any.
    pub fn kind(&self) -> Option<SourceKind> {
        *self.current_kind.read()
    }

    /// Status string for API responses.
    pub fn status(&self) -> String {
        match self.kind() {
            Some(kind) => kind.label().to_string(),
            None => "NO CAM".to_string(),
        }
    }

    async fn activate_local(
        &self,
        active: &mut ActiveSource,
    ) -> Result<(), CameraError> {
        self.release(active);

        for &index in &self.camera.local_candidates {
            match self.probe_local(index).await {
                Ok(device) => {
                    info!("Switched to local camera {}", index);
                    *active = ActiveSource::Device {
                        kind: SourceKind::Local,
                        device,
                    };
                    *self.current_kind.write() = Some(SourceKind::Local);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Local camera {} unusable: {}", index, e);
                }
            }
        }

        Err(CameraError::NoLocalDevice {
            candidates: self.camera.local_candidates.clone(),
        })
    }

    async fn probe_local(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let mut device = self.factory.open_local(index).await?;
        device.read().await?;
        Ok(device)
    }

    async fn probe_network(&self, url: &str) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let mut device = self.factory.open_network(url).await?;
        device.read().await?;
        Ok(device)
    }

    fn release(&self, active: &mut ActiveSource) {
        if let ActiveSource::Device { device, .. } = &*active {
            info!("Releasing {}", device.describe());
        }
        *active = ActiveSource::None;
        *self.current_kind.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockDeviceFactory;
    use std::sync::atomic::Ordering;

    fn camera_config() -> CameraConfig {
        CameraConfig {
            local_candidates: vec![0, 1, 2],
            resolution: (640, 480),
            fps: 30,
        }
    }

    fn network_config() -> NetworkCameraConfig {
        NetworkCameraConfig {
            host: "192.168.0.180".to_string(),
            port: 8080,
            path: "/video".to_string(),
        }
    }

    fn manager(factory: MockDeviceFactory) -> (SourceManager, Arc<MockDeviceFactory>) {
        let factory = Arc::new(factory);
        let manager = SourceManager::new(
            Arc::clone(&factory) as Arc<dyn DeviceFactory>,
            camera_config(),
            network_config(),
        );
        (manager, factory)
    }

    #[tokio::test]
    async fn local_switch_picks_first_readable_candidate() {
        let (manager, factory) = manager(MockDeviceFactory::new(&[1], true));

        manager.switch_to_local().await.unwrap();
        assert_eq!(manager.kind(), Some(SourceKind::Local));
        assert_eq!(
            *factory.opens.lock(),
            vec!["local:0".to_string(), "local:1".to_string()]
        );
        assert!(manager.read_frame().await.is_some());
    }

    #[tokio::test]
    async fn local_switch_fails_when_no_candidate_opens() {
        let (manager, _factory) = manager(MockDeviceFactory::new(&[], true));

        let err = manager.switch_to_local().await.unwrap_err();
        assert!(matches!(err, CameraError::NoLocalDevice { .. }));
        assert_eq!(manager.kind(), None);
        assert!(manager.read_frame().await.is_none());
    }

    #[tokio::test]
    async fn failed_network_switch_falls_back_to_local() {
        let (manager, _factory) = manager(MockDeviceFactory::new(&[0], false));

        let err = manager.switch_to_network(None, None).await.unwrap_err();
        assert!(matches!(err, CameraError::NetworkUnreachable { .. }));
        // Pipeline keeps a live source despite the reported failure
        assert_eq!(manager.kind(), Some(SourceKind::Local));
        assert!(manager.read_frame().await.is_some());
    }

    #[tokio::test]
    async fn network_switch_releases_previous_device() {
        let (manager, factory) = manager(MockDeviceFactory::new(&[0], true));

        manager.switch_to_local().await.unwrap();
        manager.switch_to_network(None, None).await.unwrap();
        assert_eq!(manager.kind(), Some(SourceKind::Network));
        assert!(factory.device_drops.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn network_overrides_persist_in_stream_url() {
        let (manager, factory) = manager(MockDeviceFactory::new(&[0], true));

        manager
            .switch_to_network(Some("10.0.0.5".to_string()), Some(9999))
            .await
            .unwrap();
        assert!(factory
            .opens
            .lock()
            .contains(&"network:http://10.0.0.5:9999/video".to_string()));

        // Next switch without overrides reuses the stored endpoint
        manager.switch_to_network(None, None).await.unwrap();
        assert_eq!(
            factory.opens.lock().last().unwrap(),
            "network:http://10.0.0.5:9999/video"
        );
    }

    #[tokio::test]
    async fn static_source_repeats_the_same_frame() {
        let (manager, _factory) = manager(MockDeviceFactory::new(&[], false));

        let photo = RgbImage::from_pixel(100, 100, Rgb([200, 100, 50]));
        manager.switch_to_static(photo).await;
        assert_eq!(manager.kind(), Some(SourceKind::Static));
        assert_eq!(manager.status(), "PHOTO");

        let first = manager.read_frame().await.unwrap();
        let second = manager.read_frame().await.unwrap();
        assert_eq!(first.dimensions(), (640, 480));
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[tokio::test]
    async fn status_reports_no_source_initially() {
        let (manager, _factory) = manager(MockDeviceFactory::new(&[], false));
        assert_eq!(manager.status(), "NO CAM");
    }
}
