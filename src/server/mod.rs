//! HTTP surface: the MJPEG stream, the control API, and the viewer page.

mod handlers;
mod server;

pub use server::{AppServer, ServerState};

#[cfg(test)]
mod tests {
    use super::handlers::*;
    use super::server::ServerState;
    use crate::app::VisionState;
    use crate::detect::DisplayDetection;
    use crate::frame;
    use crate::pipeline::LatestFrame;
    use crate::source::mock::MockDeviceFactory;
    use crate::source::{DeviceFactory, SourceManager};
    use axum::body::{to_bytes, Bytes};
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::Json;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state(factory: MockDeviceFactory) -> ServerState {
        let config = crate::config::VisionConfig::default();
        ServerState {
            latest: Arc::new(LatestFrame::new()),
            state: Arc::new(VisionState::new()),
            sources: Arc::new(SourceManager::new(
                Arc::new(factory) as Arc<dyn DeviceFactory>,
                config.camera,
                config.network,
            )),
            target_frame_interval: Duration::from_millis(33),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn select_accepts_any_index() {
        let state = test_state(MockDeviceFactory::new(&[], false));

        let response =
            select_object_handler(State(state.clone()), Json(SelectRequest { index: Some(42) }))
                .await
                .into_response();
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(state.state.selection.current(), Some(42));
    }

    #[tokio::test]
    async fn clear_resets_selection() {
        let state = test_state(MockDeviceFactory::new(&[], false));
        state.state.selection.select(Some(1));

        let response = clear_selection_handler(State(state.clone()))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["status"], "cleared");
        assert_eq!(state.state.selection.current(), None);
    }

    #[tokio::test]
    async fn switch_to_unknown_type_is_rejected() {
        let state = test_state(MockDeviceFactory::new(&[0], true));

        let response = switch_camera_handler(
            State(state.clone()),
            Json(SwitchRequest {
                kind: "hologram".to_string(),
                host: None,
                port: None,
            }),
        )
        .await
        .into_response();
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn failed_network_switch_reports_error_but_keeps_a_source() {
        let state = test_state(MockDeviceFactory::new(&[0], false));

        let response = switch_camera_handler(
            State(state.clone()),
            Json(SwitchRequest {
                kind: "network".to_string(),
                host: None,
                port: None,
            }),
        )
        .await
        .into_response();
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        // Fallback landed on the local camera
        assert_eq!(json["status"], "LOCAL CAM");
    }

    #[tokio::test]
    async fn photo_upload_switches_to_static_source() {
        let state = test_state(MockDeviceFactory::new(&[], false));

        let image = RgbImage::from_pixel(32, 32, Rgb([1, 2, 3]));
        let jpeg = frame::encode_jpeg(&image, 90).unwrap();

        let response = upload_photo_handler(State(state.clone()), Bytes::from(jpeg))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "PHOTO");
        assert!(state.sources.read_frame().await.is_some());
    }

    #[tokio::test]
    async fn bad_photo_upload_leaves_source_unchanged() {
        let state = test_state(MockDeviceFactory::new(&[0], false));
        state.sources.switch_to_local().await.unwrap();

        let response =
            upload_photo_handler(State(state.clone()), Bytes::from_static(b"not an image"))
                .await
                .into_response();
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(state.sources.status(), "LOCAL CAM");
    }

    #[tokio::test]
    async fn detections_endpoint_returns_snapshot_and_status() {
        let state = test_state(MockDeviceFactory::new(&[], false));
        state.state.set_detections(vec![DisplayDetection {
            en: "Dog".to_string(),
            cn: "狗".to_string(),
            confidence: 0.95,
        }]);

        let response = get_detections_handler(State(state.clone()))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["detections"][0]["en"], "Dog");
        assert_eq!(json["detections"][0]["cn"], "狗");
        assert_eq!(json["camera_status"], "NO CAM");
    }
}
