use super::transport::{LabelResponse, LabelTransport};
use super::types::{BoundingBox, Detection};
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::frame;
use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Hook invoked when the client hits a fatal-auth or expired-token
/// condition, so the host environment can rotate credentials or page an
/// operator instead of blocking on console input.
pub type AuthFailureHook = Box<dyn Fn(&DetectorError) + Send + Sync>;

/// Client for the remote image-labeling service.
///
/// Owns the connection/credential lifecycle: initialization performs
/// bounded retries with a fixed backoff and verifies connectivity with a
/// lightweight identity call; an expired token mid-detection triggers a
/// transparent re-initialize-and-retry of the same frame. Detection
/// failures degrade to "no objects this frame" and never escape.
pub struct DetectionClient {
    transport: Arc<dyn LabelTransport>,
    config: DetectorConfig,
    auth_hook: Option<AuthFailureHook>,
}

impl DetectionClient {
    pub fn new(transport: Arc<dyn LabelTransport>, config: DetectorConfig) -> Self {
        Self {
            transport,
            config,
            auth_hook: None,
        }
    }

    /// Install a hook called on expired-token and fatal-auth failures.
    pub fn with_auth_failure_hook(mut self, hook: AuthFailureHook) -> Self {
        self.auth_hook = Some(hook);
        self
    }

    fn notify_auth_failure(&self, err: &DetectorError) {
        if let Some(hook) = &self.auth_hook {
            hook(err);
        }
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(self.config.retry_backoff_secs)
    }

    /// Establish the service connection.
    ///
    /// Retries up to `max_retries` times with a fixed backoff. Expired
    /// tokens invoke the auth hook before the next attempt; permission
    /// and missing-credential failures are fatal and not retried.
    pub async fn initialize(&self) -> Result<(), DetectorError> {
        let attempts = self.config.max_retries;

        for attempt in 1..=attempts {
            info!(
                "Connecting to labeling service (attempt {}/{})",
                attempt, attempts
            );

            match self.try_connect().await {
                Ok(identity) => {
                    info!("Labeling service connected as {}", identity);
                    return Ok(());
                }
                Err(err) if !err.is_retryable() => {
                    error!("Labeling service initialization failed: {}", err);
                    self.notify_auth_failure(&err);
                    return Err(err);
                }
                Err(DetectorError::ExpiredToken) => {
                    warn!(
                        "Security token expired (attempt {}); requesting credential refresh",
                        attempt
                    );
                    self.notify_auth_failure(&DetectorError::ExpiredToken);
                    if attempt < attempts {
                        sleep(self.backoff()).await;
                    }
                }
                Err(err) => {
                    warn!("Labeling service connection error: {}", err);
                    if attempt < attempts {
                        sleep(self.backoff()).await;
                    }
                }
            }
        }

        Err(DetectorError::InitFailed { attempts })
    }

    async fn try_connect(&self) -> Result<String, DetectorError> {
        self.transport.connect().await?;
        // Lightweight identity call confirms connectivity and credentials
        self.transport.caller_identity().await
    }

    /// Detect objects in a frame.
    ///
    /// Returns at most `max_detections` detections in the service's own
    /// ranking order. An expired token mid-call re-initializes the client
    /// and retries the same frame up to `max_retries` times; any other
    /// failure returns an empty list rather than raising.
    pub async fn detect(&self, frame: &RgbImage) -> Vec<Detection> {
        let jpeg = match frame::encode_jpeg(frame, self.config.submit_jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("Failed to encode frame for detection: {}", e);
                return Vec::new();
            }
        };

        let min_confidence_pct = self.config.confidence_floor * 100.0;

        for attempt in 1..=self.config.max_retries {
            match self
                .transport
                .detect_labels(&jpeg, min_confidence_pct, self.config.max_labels)
                .await
            {
                Ok(response) => {
                    return map_response(
                        response,
                        frame.width(),
                        frame.height(),
                        self.config.max_detections,
                    );
                }
                Err(DetectorError::ExpiredToken) => {
                    warn!(
                        "Token expired during detection; refreshing (attempt {})",
                        attempt
                    );
                    if self.initialize().await.is_err() {
                        return Vec::new();
                    }
                }
                Err(err) => {
                    warn!("Detection error: {}", err);
                    return Vec::new();
                }
            }
        }

        error!(
            "Failed to detect objects after {} attempts",
            self.config.max_retries
        );
        Vec::new()
    }
}

/// Map a service response onto canonical detections in pixel coordinates.
///
/// Labels carrying instance boxes yield one detection per instance;
/// labels without instances yield one synthetic box centered on the
/// frame with half-extent 1/8 of the shorter dimension. Service order is
/// preserved and the list is capped, no re-sorting.
fn map_response(
    response: LabelResponse,
    width: u32,
    height: u32,
    max_detections: usize,
) -> Vec<Detection> {
    let mut detections = Vec::new();

    for (class_index, label) in response.labels.into_iter().enumerate() {
        let name = label.name.to_lowercase();
        let confidence = label.confidence / 100.0;

        if label.instances.is_empty() {
            let (cx, cy) = (width / 2, height / 2);
            let half = width.min(height) / 8;
            let bounding_box = BoundingBox::centered(cx, cy, half, width, height);
            detections.push(Detection {
                center: bounding_box.center(),
                bounding_box,
                confidence,
                class_index,
                label: name.clone(),
            });
            continue;
        }

        for instance in label.instances {
            let bounding_box = match instance.bounding_box {
                Some(frac) => {
                    let x1 = ((frac.left * width as f32).max(0.0)) as u32;
                    let y1 = ((frac.top * height as f32).max(0.0)) as u32;
                    let x2 = (x1 + (frac.width * width as f32) as u32).min(width);
                    let y2 = (y1 + (frac.height * height as f32) as u32).min(height);
                    BoundingBox::new(x1.min(width), y1.min(height), x2, y2)
                }
                // Instance without coordinates falls back to the middle
                // third of the frame
                None => BoundingBox::new(
                    width / 3,
                    height / 3,
                    2 * width / 3,
                    2 * height / 3,
                ),
            };

            detections.push(Detection {
                center: bounding_box.center(),
                bounding_box,
                confidence,
                class_index,
                label: name.clone(),
            });
        }
    }

    if detections.len() > max_detections {
        debug!(
            "Capping {} detections to {}",
            detections.len(),
            max_detections
        );
        detections.truncate(max_detections);
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::mock::MockLabelTransport;
    use crate::detect::transport::{FractionalBox, LabelEntry, LabelInstance};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc as StdArc;

    fn test_config() -> DetectorConfig {
        let mut config = crate::config::VisionConfig::default().detector;
        // Keep test retries fast
        config.retry_backoff_secs = 0;
        config
    }

    fn label(name: &str, confidence_pct: f32, instances: Vec<LabelInstance>) -> LabelEntry {
        LabelEntry {
            name: name.to_string(),
            confidence: confidence_pct,
            instances,
        }
    }

    fn frame() -> RgbImage {
        RgbImage::from_pixel(640, 480, image::Rgb([50, 50, 50]))
    }

    #[tokio::test]
    async fn label_without_instances_maps_to_synthetic_centered_box() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_labels(LabelResponse {
            labels: vec![label("Dog", 95.0, vec![])],
        });

        let client = DetectionClient::new(transport, test_config());
        let detections = client.detect(&frame()).await;

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.label, "dog");
        assert!((det.confidence - 0.95).abs() < 1e-6);
        assert_eq!(det.class_index, 0);
        // Centered, half-extent = min(640, 480) / 8 = 60
        assert_eq!(det.bounding_box, BoundingBox::new(260, 180, 380, 300));
        assert_eq!(det.center, (320, 240));
    }

    #[tokio::test]
    async fn instance_boxes_scale_to_pixels_and_clamp() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_labels(LabelResponse {
            labels: vec![label(
                "Person",
                80.0,
                vec![
                    LabelInstance {
                        bounding_box: Some(FractionalBox {
                            left: 0.25,
                            top: 0.25,
                            width: 0.5,
                            height: 0.5,
                        }),
                    },
                    LabelInstance {
                        bounding_box: Some(FractionalBox {
                            left: 0.9,
                            top: 0.9,
                            width: 0.5,
                            height: 0.5,
                        }),
                    },
                ],
            )],
        });

        let client = DetectionClient::new(transport, test_config());
        let detections = client.detect(&frame()).await;

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].bounding_box, BoundingBox::new(160, 120, 480, 360));
        // Overhanging instance clamps to the frame edge
        assert_eq!(detections[1].bounding_box.x2, 640);
        assert_eq!(detections[1].bounding_box.y2, 480);
        // Both instances share the label's ordinal
        assert_eq!(detections[0].class_index, 0);
        assert_eq!(detections[1].class_index, 0);
    }

    #[tokio::test]
    async fn detections_are_capped_in_service_order() {
        let labels = (0..15)
            .map(|i| label(&format!("thing{}", i), 90.0, vec![]))
            .collect();
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_labels(LabelResponse { labels });

        let client = DetectionClient::new(transport, test_config());
        let detections = client.detect(&frame()).await;

        assert_eq!(detections.len(), 10);
        assert_eq!(detections[0].label, "thing0");
        assert_eq!(detections[9].label, "thing9");
    }

    #[tokio::test]
    async fn transient_error_degrades_to_empty_list() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_failure(DetectorError::Transient {
            details: "timeout".to_string(),
        });

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let detections = client.detect(&frame()).await;

        assert!(detections.is_empty());
        assert_eq!(transport.detect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn expired_token_reinitializes_and_retries_same_frame() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_failure(DetectorError::ExpiredToken);
        transport.push_labels(LabelResponse {
            labels: vec![label("Cat", 88.0, vec![])],
        });

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let detections = client.detect(&frame()).await;

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cat");
        // Retry re-established the session first
        assert!(transport.connect_calls.load(Ordering::Relaxed) >= 1);
        assert_eq!(transport.detect_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn expired_token_retries_are_bounded() {
        let transport = Arc::new(MockLabelTransport::new());
        for _ in 0..5 {
            transport.push_failure(DetectorError::ExpiredToken);
        }

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let detections = client.detect(&frame()).await;

        assert!(detections.is_empty());
        // max_retries detect attempts, never more
        assert_eq!(transport.detect_calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn initialize_fails_fast_on_fatal_errors() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_connect_failure(DetectorError::PermissionDenied);

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let result = client.initialize().await;

        assert!(matches!(result, Err(DetectorError::PermissionDenied)));
        assert_eq!(transport.connect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn initialize_retries_protocol_errors() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_connect_failure(DetectorError::Protocol {
            details: "truncated body".to_string(),
        });

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let result = client.initialize().await;

        assert!(result.is_ok());
        assert_eq!(transport.connect_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn initialize_retries_transient_errors_to_exhaustion() {
        let transport = Arc::new(MockLabelTransport::new());
        for _ in 0..3 {
            transport.push_connect_failure(DetectorError::Transient {
                details: "connection refused".to_string(),
            });
        }

        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config());
        let result = client.initialize().await;

        assert!(matches!(
            result,
            Err(DetectorError::InitFailed { attempts: 3 })
        ));
        assert_eq!(transport.connect_calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn auth_hook_fires_on_expired_token() {
        let transport = Arc::new(MockLabelTransport::new());
        transport.push_connect_failure(DetectorError::ExpiredToken);

        let fired = StdArc::new(AtomicU32::new(0));
        let observed = StdArc::clone(&fired);
        let client = DetectionClient::new(Arc::clone(&transport) as _, test_config())
            .with_auth_failure_hook(Box::new(move |err| {
                if matches!(err, DetectorError::ExpiredToken) {
                    observed.fetch_add(1, Ordering::Relaxed);
                }
            }));

        let result = client.initialize().await;
        assert!(result.is_ok());
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }
}
