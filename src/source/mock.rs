//! Scripted capture devices for exercising the source manager in tests.

use super::device::{CaptureDevice, DeviceFactory};
use crate::error::CameraError;
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Capture device that emits solid-color frames and tracks when it is
/// dropped, so tests can assert the previous source was released.
pub struct MockDevice {
    label: String,
    fill: Rgb<u8>,
    resolution: (u32, u32),
    readable: bool,
    drops: Arc<AtomicU32>,
}

#[async_trait]
impl CaptureDevice for MockDevice {
    async fn read(&mut self) -> Result<RgbImage, CameraError> {
        if self.readable {
            let (w, h) = self.resolution;
            Ok(RgbImage::from_pixel(w, h, self.fill))
        } else {
            Err(CameraError::ReadFailed {
                details: format!("{} scripted to fail", self.label),
            })
        }
    }

    fn is_open(&self) -> bool {
        self.readable
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

/// Factory whose local indices and network endpoints succeed or fail
/// according to test configuration. Every open is logged.
pub struct MockDeviceFactory {
    readable_locals: HashSet<u32>,
    network_available: bool,
    resolution: (u32, u32),
    pub opens: Mutex<Vec<String>>,
    pub device_drops: Arc<AtomicU32>,
}

impl MockDeviceFactory {
    pub fn new(readable_locals: &[u32], network_available: bool) -> Self {
        Self {
            readable_locals: readable_locals.iter().copied().collect(),
            network_available,
            resolution: (640, 480),
            opens: Mutex::new(Vec::new()),
            device_drops: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl DeviceFactory for MockDeviceFactory {
    async fn open_local(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CameraError> {
        self.opens.lock().push(format!("local:{}", index));
        if self.readable_locals.contains(&index) {
            Ok(Box::new(MockDevice {
                label: format!("mock local {}", index),
                fill: Rgb([10, 20, 30]),
                resolution: self.resolution,
                readable: true,
                drops: Arc::clone(&self.device_drops),
            }))
        } else {
            Err(CameraError::OpenFailed {
                index,
                details: "not present".to_string(),
            })
        }
    }

    async fn open_network(&self, url: &str) -> Result<Box<dyn CaptureDevice>, CameraError> {
        self.opens.lock().push(format!("network:{}", url));
        if self.network_available {
            Ok(Box::new(MockDevice {
                label: format!("mock network {}", url),
                fill: Rgb([40, 50, 60]),
                resolution: self.resolution,
                readable: true,
                drops: Arc::clone(&self.device_drops),
            }))
        } else {
            Err(CameraError::NetworkUnreachable {
                url: url.to_string(),
                details: "scripted unreachable".to_string(),
            })
        }
    }
}
