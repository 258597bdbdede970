//! Detection mode and video playback routes
//!
//! Each call goes to the backend first; the client loop only hears about
//! changes the backend accepted.

use axum::{extract::State, Json};
use hazard_protocol::DetectionMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use stream_client::ClientEvent;
use tracing::{info, warn};

use super::RouteError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: DetectionMode,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Local path of the video file
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub mode: DetectionMode,
}

async fn notify(state: &AppState, event: ClientEvent) -> Result<(), RouteError> {
    state
        .events
        .send(event)
        .await
        .map_err(|_| RouteError::ClientStopped)
}

/// Switch the detection source
pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<ActionResponse>, RouteError> {
    state.backend.set_mode(req.mode).await?;
    notify(&state, ClientEvent::ModeChanged(req.mode)).await?;

    Ok(Json(ActionResponse {
        success: true,
        filename: None,
        mode: req.mode,
    }))
}

/// Upload a local video file for detection playback
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<ActionResponse>, RouteError> {
    notify(&state, ClientEvent::UploadStarted).await?;

    let result = state
        .backend
        .upload_video(&req.path, |pct| info!("Uploading: {}%", pct))
        .await;

    match result {
        Ok(receipt) => {
            let filename = receipt
                .filename
                .or_else(|| req.path.file_name().map(|n| n.to_string_lossy().into_owned()));
            notify(
                &state,
                ClientEvent::UploadFinished {
                    filename: filename.clone(),
                },
            )
            .await?;
            Ok(Json(ActionResponse {
                success: true,
                filename,
                mode: DetectionMode::Video,
            }))
        }
        Err(e) => {
            warn!("Video upload failed: {}", e);
            notify(&state, ClientEvent::UploadFinished { filename: None }).await?;
            Err(e.into())
        }
    }
}

/// Stop video playback and return to the live camera
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<ActionResponse>, RouteError> {
    state.backend.stop_video().await?;
    notify(&state, ClientEvent::VideoStopped).await?;

    Ok(Json(ActionResponse {
        success: true,
        filename: None,
        mode: DetectionMode::Live,
    }))
}

#[cfg(test)]
mod tests {
    use crate::tests::spawn_app;
    use axum::{routing::post, Json, Router};
    use hazard_protocol::DetectionMode;
    use serde_json::{json, Value};
    use stream_client::ClientEvent;

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/set-mode",
                post(|| async { Json(json!({ "success": true })) }),
            )
            .route(
                "/api/stop-video",
                post(|| async { Json(json!({ "success": true })) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_mode_switch_forwarded() {
        let backend = spawn_backend().await;
        let (base, mut rx) = spawn_app(&backend).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/v1/mode", base))
            .json(&json!({ "mode": "video" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(
            rx.recv().await,
            Some(ClientEvent::ModeChanged(DetectionMode::Video))
        );
    }

    #[tokio::test]
    async fn test_stop_forwarded() {
        let backend = spawn_backend().await;
        let (base, mut rx) = spawn_app(&backend).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/video/stop", base))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(rx.recv().await, Some(ClientEvent::VideoStopped));
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_format() {
        let (base, mut rx) = spawn_app("http://127.0.0.1:1").await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/video/upload", base))
            .json(&json!({ "path": "/tmp/report.pdf" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("Unsupported"));

        assert_eq!(rx.recv().await, Some(ClientEvent::UploadStarted));
        assert_eq!(
            rx.recv().await,
            Some(ClientEvent::UploadFinished { filename: None })
        );
    }

    #[tokio::test]
    async fn test_backend_down_is_bad_gateway() {
        let (base, _rx) = spawn_app("http://127.0.0.1:1").await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/video/stop", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 502);
    }
}
