use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::server::ServerState;
use crate::frame::{self, EncodedFrame};

/// Handler for the MJPEG streaming endpoint
pub async fn mjpeg_stream_handler(State(state): State<ServerState>) -> impl IntoResponse {
    info!("New MJPEG stream client connected");

    let stream = async_stream::stream! {
        let mut frame_interval = interval(state.target_frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame: Option<EncodedFrame> = None;
        let mut frames_streamed = 0u64;

        loop {
            frame_interval.tick().await;

            if let Some(frame) = state.latest.current().await {
                last_frame = Some(frame);
            }

            // Repeat the last known frame until a newer one lands
            if let Some(frame) = last_frame.as_ref() {
                frames_streamed += 1;
                debug!(
                    "Streaming frame {} ({} bytes, {} sent)",
                    frame.id,
                    frame.jpeg.len(),
                    frames_streamed
                );

                let part_header = format!(
                    "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nX-Frame-ID: {}\r\nX-Timestamp: {}\r\n\r\n",
                    frame.jpeg.len(),
                    frame.id,
                    frame.timestamp_millis(),
                );

                yield Ok::<_, axum::Error>(bytes::Bytes::from(part_header));
                yield Ok(bytes::Bytes::from(frame.jpeg.as_ref().clone()));
                yield Ok(bytes::Bytes::from("\r\n"));
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .header(header::CACHE_CONTROL, "no-cache, private")
        .header(header::PRAGMA, "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET")
        .body(axum::body::Body::from_stream(stream))
        .unwrap()
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: Option<i64>,
}

/// Store a selection index. The value is not validated against the
/// current detection list; stale or out-of-range values simply render
/// nothing until they come back into range.
pub async fn select_object_handler(
    State(state): State<ServerState>,
    Json(request): Json<SelectRequest>,
) -> impl IntoResponse {
    debug!("Selection set to {:?}", request.index);
    state.state.selection.select(request.index);
    Json(serde_json::json!({
        "success": true,
        "selected": request.index,
    }))
}

/// Reset the selection to nothing.
pub async fn clear_selection_handler(State(state): State<ServerState>) -> impl IntoResponse {
    state.state.selection.clear();
    Json(serde_json::json!({ "status": "cleared" }))
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Switch the active camera source.
pub async fn switch_camera_handler(
    State(state): State<ServerState>,
    Json(request): Json<SwitchRequest>,
) -> impl IntoResponse {
    let result = match request.kind.as_str() {
        "local" => state.sources.switch_to_local().await,
        "network" => {
            state
                .sources
                .switch_to_network(request.host, request.port)
                .await
        }
        other => {
            return Json(serde_json::json!({
                "success": false,
                "status": state.sources.status(),
                "error": format!("Unknown camera type '{}'", other),
            }));
        }
    };

    match result {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "status": state.sources.status(),
        })),
        Err(e) => {
            warn!("Camera switch failed: {}", e);
            Json(serde_json::json!({
                "success": false,
                "status": state.sources.status(),
                "error": e.to_string(),
            }))
        }
    }
}

/// Replace the active source with an uploaded photo. An undecodable
/// upload leaves the current source untouched.
pub async fn upload_photo_handler(
    State(state): State<ServerState>,
    body: Bytes,
) -> impl IntoResponse {
    match frame::decode_image(&body) {
        Ok(image) => {
            state.sources.switch_to_static(image).await;
            Json(serde_json::json!({
                "success": true,
                "status": state.sources.status(),
            }))
        }
        Err(e) => {
            warn!("Rejected photo upload: {}", e);
            Json(serde_json::json!({
                "success": false,
                "status": state.sources.status(),
                "error": format!("Could not decode image: {}", e),
            }))
        }
    }
}

/// Current detection snapshot with bilingual labels.
pub async fn get_detections_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "detections": state.state.detections(),
        "camera_status": state.sources.status(),
    }))
}

/// Handler for the health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let latest_frame = state.latest.current().await;
    let stats = state.latest.stats();

    let health_info = serde_json::json!({
        "status": "healthy",
        "frames_available": latest_frame.is_some(),
        "latest_frame_id": latest_frame.map(|f| f.id),
        "camera_status": state.sources.status(),
        "detections": state.state.detection_count(),
        "frame_stats": {
            "frames_published": stats.frames_published,
            "frames_retrieved": stats.frames_retrieved,
        },
    });

    (StatusCode::OK, Json(health_info))
}

/// Simple HTML page for viewing the annotated stream
pub async fn stream_page_handler() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>VisionLingo</title>
    <style>
        :root { color-scheme: dark; }
        body {
            margin: 0;
            background: #000;
            display: flex;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
        }
        img.stream {
            display: block;
            max-width: 100vw;
            max-height: 100vh;
            width: auto;
            height: auto;
            object-fit: contain;
            background: #000;
        }
    </style>
</head>
<body>
    <img class="stream" src="/video_feed" alt="VisionLingo stream">
</body>
</html>
"#,
    )
}
