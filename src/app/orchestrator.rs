use super::VisionState;
use crate::config::VisionConfig;
use crate::detect::{DetectionClient, HttpLabelTransport, LabelTransport};
use crate::error::Result;
use crate::pipeline::{FramePipeline, LatestFrame};
use crate::server::AppServer;
use crate::source::{DefaultDeviceFactory, DeviceFactory, SourceManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level application: wires the pipeline, sources, detector and
/// HTTP server together and owns their lifecycle.
pub struct App {
    config: VisionConfig,
}

impl App {
    pub fn new(config: VisionConfig) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C, then shut the pipeline down gracefully.
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        let state = Arc::new(VisionState::new());
        let latest = Arc::new(LatestFrame::new());
        let cancel = CancellationToken::new();

        let factory: Arc<dyn DeviceFactory> =
            Arc::new(DefaultDeviceFactory::new(config.camera.clone())?);
        let sources = Arc::new(SourceManager::new(
            factory,
            config.camera.clone(),
            config.network.clone(),
        ));

        let transport: Arc<dyn LabelTransport> =
            Arc::new(HttpLabelTransport::new(&config.detector));
        let detector = DetectionClient::new(transport, config.detector.clone())
            .with_auth_failure_hook(Box::new(|err| {
                error!("Labeling service credential failure: {}", err);
            }));

        // Neither startup step is fatal: the pipeline serves placeholder
        // frames without a camera and empty detections without the
        // labeling service.
        if let Err(e) = detector.initialize().await {
            warn!("Labeling service unavailable at startup: {}", e);
        }
        if let Err(e) = sources.switch_to_local().await {
            warn!("No local camera at startup: {}", e);
        }

        let pipeline = FramePipeline::new(
            Arc::clone(&sources),
            detector,
            Arc::clone(&state),
            Arc::clone(&latest),
            config.clone(),
            cancel.clone(),
        );
        let pipeline_task = tokio::spawn(pipeline.run());

        let server = AppServer::new(
            config.stream.clone(),
            Arc::clone(&latest),
            Arc::clone(&state),
            Arc::clone(&sources),
            config.camera.fps,
        );

        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C; shutting down");
                signal_cancel.cancel();
            }
        });

        let server_result = server.start(cancel.clone()).await;

        info!("Beginning graceful shutdown");
        cancel.cancel();
        match timeout(SHUTDOWN_TIMEOUT, pipeline_task).await {
            Ok(Ok(())) => info!("Frame pipeline stopped cleanly"),
            Ok(Err(e)) => error!("Frame pipeline task failed: {}", e),
            Err(_) => warn!("Frame pipeline did not stop within {:?}", SHUTDOWN_TIMEOUT),
        }

        server_result?;
        info!("Shutdown complete");
        Ok(())
    }
}
