//! Synthetic test-pattern capture device.
//!
//! Stands in for a real local camera on hosts without the `local-camera`
//! feature, so the rest of the pipeline can run unchanged.

use super::device::CaptureDevice;
use crate::error::CameraError;
use async_trait::async_trait;
use image::{Rgb, RgbImage};

/// Deterministic frame generator keyed on an internal frame counter.
///
/// Renders a static gradient with a square orbiting the frame so that
/// consecutive reads are visibly distinct in the stream.
pub struct TestPatternDevice {
    index: u32,
    width: u32,
    height: u32,
    counter: u64,
}

impl TestPatternDevice {
    pub fn new(index: u32, resolution: (u32, u32)) -> Self {
        Self {
            index,
            width: resolution.0,
            height: resolution.1,
            counter: 0,
        }
    }
}

#[async_trait]
impl CaptureDevice for TestPatternDevice {
    async fn read(&mut self) -> Result<RgbImage, CameraError> {
        let frame = render_pattern(self.width, self.height, self.counter);
        self.counter = self.counter.wrapping_add(1);
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("test pattern device {}", self.index)
    }
}

fn render_pattern(width: u32, height: u32, tick: u64) -> RgbImage {
    let mut frame = RgbImage::new(width, height);

    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        *pixel = Rgb([r, g, 64]);
    }

    // Moving square, one pixel per tick, wrapping horizontally
    let size = height / 8;
    let sx = ((tick as u32) % width.saturating_sub(size).max(1)) as u32;
    let sy = height / 2 - size / 2;
    for y in sy..(sy + size).min(height) {
        for x in sx..(sx + size).min(width) {
            frame.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consecutive_frames_differ() {
        let mut device = TestPatternDevice::new(0, (320, 240));
        let first = device.read().await.unwrap();
        let second = device.read().await.unwrap();
        assert_eq!(first.dimensions(), (320, 240));
        assert_ne!(first.as_raw(), second.as_raw());
    }

    #[tokio::test]
    async fn device_reports_open() {
        let device = TestPatternDevice::new(1, (64, 48));
        assert!(device.is_open());
        assert!(device.describe().contains('1'));
    }
}
