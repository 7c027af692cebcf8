use crate::app::VisionState;
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::pipeline::LatestFrame;
use crate::source::SourceManager;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handlers::{
    clear_selection_handler, get_detections_handler, health_handler, mjpeg_stream_handler,
    select_object_handler, stream_page_handler, switch_camera_handler, upload_photo_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) latest: Arc<LatestFrame>,
    pub(crate) state: Arc<VisionState>,
    pub(crate) sources: Arc<SourceManager>,
    pub(crate) target_frame_interval: Duration,
}

/// HTTP server exposing the annotated stream and the control API.
pub struct AppServer {
    config: StreamConfig,
    latest: Arc<LatestFrame>,
    state: Arc<VisionState>,
    sources: Arc<SourceManager>,
    target_frame_interval: Duration,
}

impl AppServer {
    pub fn new(
        config: StreamConfig,
        latest: Arc<LatestFrame>,
        state: Arc<VisionState>,
        sources: Arc<SourceManager>,
        target_fps: u32,
    ) -> Self {
        let target_frame_interval = Duration::from_micros(1_000_000u64 / target_fps.max(1) as u64);

        Self {
            config,
            latest,
            state,
            sources,
            target_frame_interval,
        }
    }

    pub fn router(&self) -> Router {
        let state = ServerState {
            latest: Arc::clone(&self.latest),
            state: Arc::clone(&self.state),
            sources: Arc::clone(&self.sources),
            target_frame_interval: self.target_frame_interval,
        };

        Router::new()
            .route("/", get(stream_page_handler))
            .route("/video_feed", get(mjpeg_stream_handler))
            .route("/select_object", post(select_object_handler))
            .route("/clear_selection", post(clear_selection_handler))
            .route("/switch_camera", post(switch_camera_handler))
            .route("/upload_photo", post(upload_photo_handler))
            .route("/get_detections", get(get_detections_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Bind and serve until the token is cancelled.
    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.config.ip, self.config.port);

        info!("Starting HTTP server on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| StreamError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|e| StreamError::StartupFailed {
                details: format!("Server error: {}", e),
            })?;

        Ok(())
    }
}
