//! GStreamer-backed local camera device (Linux, `local-camera` feature).

use super::device::CaptureDevice;
use crate::error::CameraError;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbImage;
use tracing::{debug, info};

const SAMPLE_TIMEOUT_SECS: u64 = 5;

/// Exclusive handle on a v4l2 device, decoded to raw RGB by the
/// pipeline so reads come out ready for the overlay stage.
pub struct GstLocalDevice {
    pipeline: Pipeline,
    appsink: AppSink,
    index: u32,
    open: bool,
}

impl GstLocalDevice {
    pub fn open(index: u32, resolution: (u32, u32), fps: u32) -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::BackendUnavailable {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let (width, height) = resolution;
        let desc = format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             videoconvert ! video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=2 drop=true",
            index, width, height, fps
        );

        debug!("Creating GStreamer pipeline: {}", desc);

        let pipeline = gstreamer::parse::launch(&desc)
            .map_err(|e| CameraError::OpenFailed {
                index,
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::OpenFailed {
                index,
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::OpenFailed {
                index,
                details: "Appsink missing from pipeline".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::OpenFailed {
                index,
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::OpenFailed {
                index,
                details: format!("Failed to start pipeline: {}", e),
            })?;

        info!("Opened local camera /dev/video{} ({}x{} @ {}fps)", index, width, height, fps);

        Ok(Self {
            pipeline,
            appsink,
            index,
            open: true,
        })
    }

    fn pull_frame(&self) -> Result<RgbImage, CameraError> {
        let sample = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_seconds(SAMPLE_TIMEOUT_SECS))
            .ok_or_else(|| CameraError::ReadFailed {
                details: format!("No sample from /dev/video{} within {}s", self.index, SAMPLE_TIMEOUT_SECS),
            })?;

        let buffer = sample.buffer().ok_or_else(|| CameraError::ReadFailed {
            details: "No buffer in sample".to_string(),
        })?;
        let caps = sample.caps().ok_or_else(|| CameraError::ReadFailed {
            details: "No caps in sample".to_string(),
        })?;
        let info = VideoInfo::from_caps(caps).map_err(|e| CameraError::ReadFailed {
            details: format!("Failed to get video info: {}", e),
        })?;

        let map = buffer.map_readable().map_err(|e| CameraError::ReadFailed {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let width = info.width();
        let height = info.height();
        let stride = info.stride()[0] as usize;
        let row_bytes = width as usize * 3;

        // Rows may carry padding; copy the visible bytes per row
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            data.extend_from_slice(&map.as_slice()[start..start + row_bytes]);
        }

        RgbImage::from_raw(width, height, data).ok_or_else(|| CameraError::ReadFailed {
            details: "Sample size does not match caps".to_string(),
        })
    }
}

#[async_trait]
impl CaptureDevice for GstLocalDevice {
    async fn read(&mut self) -> Result<RgbImage, CameraError> {
        let result = tokio::task::block_in_place(|| self.pull_frame());
        if matches!(result, Err(CameraError::ReadFailed { .. })) {
            self.open = false;
        }
        result
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("local camera /dev/video{}", self.index)
    }
}

impl Drop for GstLocalDevice {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        debug!("Released local camera /dev/video{}", self.index);
    }
}
