//! The frame pipeline: read, detect, annotate, encode, publish.

mod latest;

pub use latest::{LatestFrame, LatestFrameStatsSnapshot};

use crate::app::VisionState;
use crate::config::VisionConfig;
use crate::detect::{DetectionClient, DisplayDetection};
use crate::error::VisionError;
use crate::frame::{self, EncodedFrame};
use crate::labels;
use crate::overlay;
use crate::source::SourceManager;
use image::RgbImage;
use rusttype::Font;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Delay before retrying after the source failed to produce a frame.
const SOURCE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// What one pipeline iteration produced, deciding the delay before the
/// next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A live frame was annotated and published
    Published,
    /// The source produced nothing; a placeholder was published
    SourceFailed,
}

/// Continuous loop turning source frames into annotated JPEG output.
///
/// A read failure never terminates the loop: a placeholder frame is
/// published instead and the source is retried after a short delay.
pub struct FramePipeline {
    sources: Arc<SourceManager>,
    detector: DetectionClient,
    state: Arc<VisionState>,
    latest: Arc<LatestFrame>,
    config: VisionConfig,
    font: Option<Font<'static>>,
    cancel: CancellationToken,
    frame_counter: u64,
}

/// Wall-clock seconds driving the overlay pulse animations, so the
/// rendered geometry is a function of the timestamp alone and stays in
/// phase across pipeline restarts.
fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl FramePipeline {
    pub fn new(
        sources: Arc<SourceManager>,
        detector: DetectionClient,
        state: Arc<VisionState>,
        latest: Arc<LatestFrame>,
        config: VisionConfig,
        cancel: CancellationToken,
    ) -> Self {
        let font = frame::load_font(&config.overlay.font_path);
        Self {
            sources,
            detector,
            state,
            latest,
            config,
            font,
            cancel,
            frame_counter: 0,
        }
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        let frame_interval =
            Duration::from_millis(1000 / u64::from(self.config.camera.fps.max(1)));
        info!("Frame pipeline started ({:?} per frame)", frame_interval);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let delay = match self.run_iteration().await {
                Ok(IterationOutcome::Published) => frame_interval,
                Ok(IterationOutcome::SourceFailed) => SOURCE_RETRY_DELAY,
                Err(e) => {
                    warn!("Pipeline iteration failed: {}", e);
                    frame_interval
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Frame pipeline stopped after {} frames", self.frame_counter);
    }

    /// One pass: read a frame, detect, overlay, encode, publish.
    pub async fn run_iteration(&mut self) -> Result<IterationOutcome, VisionError> {
        let (width, height) = self.config.camera.resolution;

        let Some(frame) = self.sources.read_frame().await else {
            let placeholder = frame::placeholder_frame(
                width,
                height,
                frame::PLACEHOLDER_MESSAGE,
                self.font.as_ref(),
            );
            self.publish(&placeholder).await?;
            return Ok(IterationOutcome::SourceFailed);
        };

        let mut frame = frame::resize_to(frame, width, height);

        let detections = self.detector.detect(&frame).await;
        let display: Vec<DisplayDetection> = detections
            .iter()
            .map(|d| DisplayDetection {
                en: labels::format_english(&d.label),
                cn: labels::lookup_chinese(&d.label),
                confidence: d.confidence,
            })
            .collect();
        self.state.set_detections(display);

        let t_secs = wall_clock_secs();
        let selected = self.state.selection.current();
        overlay::render_overlay(&mut frame, &detections, selected, t_secs, self.font.as_ref());

        if let Some(kind) = self.sources.kind() {
            overlay::draw_status_label(&mut frame, kind.label(), kind.accent(), self.font.as_ref());
        }

        self.publish(&frame).await?;
        Ok(IterationOutcome::Published)
    }

    async fn publish(&mut self, frame: &RgbImage) -> Result<(), VisionError> {
        let jpeg = frame::encode_jpeg(frame, self.config.stream.jpeg_quality)?;
        self.frame_counter += 1;
        self.latest
            .publish(EncodedFrame::new(self.frame_counter, jpeg))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::mock::MockLabelTransport;
    use crate::detect::{LabelEntry, LabelResponse};
    use crate::source::mock::MockDeviceFactory;
    use crate::source::DeviceFactory;

    fn build_pipeline(factory: MockDeviceFactory, transport: Arc<MockLabelTransport>) -> FramePipeline {
        let config = VisionConfig::default();
        let sources = Arc::new(SourceManager::new(
            Arc::new(factory) as Arc<dyn DeviceFactory>,
            config.camera.clone(),
            config.network.clone(),
        ));
        let detector = DetectionClient::new(transport, config.detector.clone());
        FramePipeline::new(
            sources,
            detector,
            Arc::new(VisionState::new()),
            Arc::new(LatestFrame::new()),
            config,
            CancellationToken::new(),
        )
    }

    #[test]
    fn overlay_phase_is_derived_from_wall_clock() {
        let reference = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        let t = wall_clock_secs();
        // Seconds since the epoch, not since pipeline construction
        assert!(t >= reference);
        assert!(t - reference < 1.0);
    }

    #[tokio::test]
    async fn source_failure_publishes_placeholder() {
        let mut pipeline =
            build_pipeline(MockDeviceFactory::new(&[], false), Arc::new(MockLabelTransport::new()));

        let outcome = pipeline.run_iteration().await.unwrap();
        assert_eq!(outcome, IterationOutcome::SourceFailed);

        // Placeholder went out as a real frame
        let frame = pipeline.latest.current().await.unwrap();
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn live_frame_updates_detection_snapshot() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_labels(LabelResponse {
            labels: vec![LabelEntry {
                name: "Dog".to_string(),
                confidence: 95.0,
                instances: Vec::new(),
            }],
        });

        let mut pipeline = build_pipeline(MockDeviceFactory::new(&[0], false), transport);
        pipeline.sources.switch_to_local().await.unwrap();

        let outcome = pipeline.run_iteration().await.unwrap();
        assert_eq!(outcome, IterationOutcome::Published);

        let detections = pipeline.state.detections();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].en, "Dog");
        assert_eq!(detections[0].cn, "狗");
        assert!((detections[0].confidence - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stale_selection_does_not_disturb_the_loop() {
        let transport = Arc::new(MockLabelTransport::new());
        let mut pipeline = build_pipeline(MockDeviceFactory::new(&[0], false), transport);
        pipeline.sources.switch_to_local().await.unwrap();

        // Selection far beyond the (empty) detection list
        pipeline.state.selection.select(Some(5));
        let outcome = pipeline.run_iteration().await.unwrap();
        assert_eq!(outcome, IterationOutcome::Published);
        // Selection survives; it may come back into range later
        assert_eq!(pipeline.state.selection.current(), Some(5));
    }

    #[tokio::test]
    async fn empty_snapshot_replaces_previous_detections() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_labels(LabelResponse {
            labels: vec![LabelEntry {
                name: "Cat".to_string(),
                confidence: 80.0,
                instances: Vec::new(),
            }],
        });

        let mut pipeline = build_pipeline(MockDeviceFactory::new(&[0], false), transport);
        pipeline.sources.switch_to_local().await.unwrap();

        pipeline.run_iteration().await.unwrap();
        assert_eq!(pipeline.state.detection_count(), 1);

        // Next frame returns nothing; snapshot must empty out
        pipeline.run_iteration().await.unwrap();
        assert_eq!(pipeline.state.detection_count(), 0);
    }
}
