//! Detection backend HTTP client

use std::path::Path;
use std::time::Duration;

use hazard_protocol::{DetectionMode, Location};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::upload::{mime_for_file, percent, validate_video};
use crate::ApiError;

/// Upload body chunk size
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend HTTP root
    pub base_url: String,
    /// Connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Timeout for control requests (seconds)
    pub timeout_secs: u64,
    /// Timeout for a whole video upload (seconds)
    pub upload_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
            upload_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModeResponse {
    mode: DetectionMode,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModeRequest {
    mode: DetectionMode,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    hazard_type: &'a str,
    location: Location,
}

/// Accepted video upload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub success: bool,
    /// Name the backend stored the video under
    #[serde(default)]
    pub filename: Option<String>,
}

/// Accepted hazard report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportReceipt {
    pub success: bool,
    #[serde(default)]
    pub report_id: String,
}

impl ReportReceipt {
    /// First 8 characters of the report id, for display
    pub fn short_id(&self) -> &str {
        match self.report_id.char_indices().nth(8) {
            Some((idx, _)) => &self.report_id[..idx],
            None => &self.report_id,
        }
    }
}

/// Client for the detection backend's control endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl BackendClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        info!("Backend API client for {}", config.base_url);
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Current detection source
    pub async fn get_mode(&self) -> Result<DetectionMode, ApiError> {
        let response = self
            .http
            .get(self.url("/api/get-mode"))
            .timeout(self.timeout())
            .send()
            .await?;
        let body: ModeResponse = parse(response).await?;
        debug!("Backend mode: {:?}", body.mode);
        Ok(body.mode)
    }

    /// Switch detection source
    pub async fn set_mode(&self, mode: DetectionMode) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/api/set-mode"))
            .timeout(self.timeout())
            .json(&ModeRequest { mode })
            .send()
            .await?;
        let body: SuccessResponse = parse(response).await?;
        if !body.success {
            return Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "mode switch refused".to_string()),
            ));
        }
        info!("Switched to {} mode", mode.label());
        Ok(())
    }

    /// Upload a video for playback through the detector.
    ///
    /// The format is checked before any request is made. `progress`
    /// receives whole percentages as the body streams, each value once.
    pub async fn upload_video<F>(&self, path: &Path, progress: F) -> Result<UploadReceipt, ApiError>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::UnsupportedFormat(path.display().to_string()))?
            .to_string();
        validate_video(&name, None)?;

        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        info!("Uploading {} ({} bytes)", name, total);

        if total == 0 {
            progress(100);
        }
        let body = futures_util::stream::try_unfold(
            (file, 0u64, None::<u8>, progress),
            move |(mut file, mut sent, mut last, progress)| async move {
                let mut buf = vec![0u8; UPLOAD_CHUNK];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Ok(None);
                }
                buf.truncate(n);
                sent += n as u64;
                let pct = percent(sent, total);
                if last != Some(pct) {
                    last = Some(pct);
                    progress(pct);
                }
                Ok::<_, std::io::Error>(Some((buf, (file, sent, last, progress))))
            },
        );

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(name.clone())
            .mime_str(mime_for_file(&name))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/upload-video"))
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .multipart(form)
            .send()
            .await?;
        let receipt: UploadReceipt = parse(response).await?;
        if !receipt.success {
            return Err(ApiError::Rejected(format!("upload of {} refused", name)));
        }
        info!(
            "Video uploaded: {}",
            receipt.filename.as_deref().unwrap_or(&name)
        );
        Ok(receipt)
    }

    /// Stop video playback; the backend falls back to the live camera
    pub async fn stop_video(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/api/stop-video"))
            .timeout(self.timeout())
            .send()
            .await?;
        let body: SuccessResponse = parse(response).await?;
        if !body.success {
            return Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "stop refused".to_string()),
            ));
        }
        info!("Video stopped, back to live camera");
        Ok(())
    }

    /// Submit a hazard report at the given position
    pub async fn report_hazard(
        &self,
        hazard_type: &str,
        location: Location,
    ) -> Result<ReportReceipt, ApiError> {
        let response = self
            .http
            .post(self.url("/api/report-hazard"))
            .timeout(self.timeout())
            .json(&ReportRequest {
                hazard_type,
                location,
            })
            .send()
            .await?;
        let receipt: ReportReceipt = parse(response).await?;
        if !receipt.success {
            return Err(ApiError::Rejected(format!("report of {} refused", hazard_type)));
        }
        Ok(receipt)
    }
}

/// Decode a JSON body, turning error statuses into `ApiError::Status`
async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
        let detail = match response.json::<serde_json::Value>().await {
            Ok(body) => detail_of(&body).unwrap_or(fallback),
            Err(_) => fallback,
        };
        warn!("Backend error {}: {}", status.as_u16(), detail);
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(response.json::<T>().await?)
}

fn detail_of(body: &serde_json::Value) -> Option<String> {
    match body.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Json, Multipart};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn upload(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() != Some("file") {
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.unwrap();
            if filename.starts_with("corrupt") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "detail": "Could not open video" })),
                );
            }
            return (
                StatusCode::OK,
                Json(json!({ "success": true, "filename": format!("{}:{}", filename, data.len()) })),
            );
        }
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "msg": "field required" }] })),
        )
    }

    async fn spawn_backend(reports: Arc<Mutex<Vec<Value>>>) -> BackendClient {
        let app = Router::new()
            .route("/api/get-mode", get(|| async { Json(json!({ "mode": "video" })) }))
            .route(
                "/api/set-mode",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "success": body["mode"] == "live" }))
                }),
            )
            .route("/api/upload-video", post(upload))
            .route(
                "/api/stop-video",
                post(|| async { Json(json!({ "success": true })) }),
            )
            .route(
                "/api/report-hazard",
                post(move |Json(body): Json<Value>| {
                    let reports = Arc::clone(&reports);
                    async move {
                        reports.lock().unwrap().push(body);
                        Json(json!({
                            "success": true,
                            "report_id": "3f2a9c1e-77b0-4d7e-9c55-0a1b2c3d4e5f"
                        }))
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        BackendClient::new(ApiConfig {
            base_url: format!("http://{}/", addr),
            ..Default::default()
        })
        .unwrap()
    }

    fn temp_video(name: &str, len: usize) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("backend-api-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, vec![7u8; len]).unwrap();
        path
    }

    #[test]
    fn test_short_id() {
        let receipt = ReportReceipt {
            success: true,
            report_id: "3f2a9c1e-77b0".to_string(),
        };
        assert_eq!(receipt.short_id(), "3f2a9c1e");

        let short = ReportReceipt {
            success: true,
            report_id: "abc".to_string(),
        };
        assert_eq!(short.short_id(), "abc");
    }

    #[tokio::test]
    async fn test_mode_round_trip() {
        let client = spawn_backend(Arc::default()).await;
        assert_eq!(client.get_mode().await.unwrap(), DetectionMode::Video);
        assert!(client.set_mode(DetectionMode::Live).await.is_ok());
        assert!(matches!(
            client.set_mode(DetectionMode::Video).await,
            Err(ApiError::Rejected(_))
        ));
        assert!(client.stop_video().await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_reports_progress() {
        let client = spawn_backend(Arc::default()).await;
        let path = temp_video("drive.mp4", 3 * UPLOAD_CHUNK + 10);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let receipt = client
            .upload_video(&path, move |pct| sink.lock().unwrap().push(pct))
            .await
            .unwrap();

        assert!(receipt.success);
        assert_eq!(
            receipt.filename.as_deref(),
            Some(format!("drive.mp4:{}", 3 * UPLOAD_CHUNK + 10).as_str())
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_upload_progress_per_read() {
        let client = spawn_backend(Arc::default()).await;
        let path = temp_video("whole.mp4", 4 * UPLOAD_CHUNK);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let receipt = client
            .upload_video(&path, move |pct| sink.lock().unwrap().push(pct))
            .await
            .unwrap();

        assert_eq!(
            receipt.filename.as_deref(),
            Some(format!("whole.mp4:{}", 4 * UPLOAD_CHUNK).as_str())
        );
        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_upload_empty_file() {
        let client = spawn_backend(Arc::default()).await;
        let path = temp_video("empty.mp4", 0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let receipt = client
            .upload_video(&path, move |pct| sink.lock().unwrap().push(pct))
            .await
            .unwrap();

        assert_eq!(receipt.filename.as_deref(), Some("empty.mp4:0"));
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_upload_error_carries_detail() {
        let client = spawn_backend(Arc::default()).await;
        let path = temp_video("corrupt.mov", 128);

        match client.upload_video(&path, |_| {}).await {
            Err(ApiError::Status { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Could not open video");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_format_without_request() {
        // No server: validation must fail before connecting
        let client = BackendClient::new(ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        let result = client
            .upload_video(Path::new("/tmp/notes.txt"), |_| {})
            .await;
        assert!(matches!(result, Err(ApiError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_report_hazard() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let client = spawn_backend(Arc::clone(&reports)).await;

        let receipt = client
            .report_hazard("pothole", Location::new(12.97, 77.59))
            .await
            .unwrap();
        assert_eq!(receipt.short_id(), "3f2a9c1e");

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["hazard_type"], "pothole");
        assert_eq!(reports[0]["location"]["lat"], 12.97);
        assert_eq!(reports[0]["location"]["lng"], 77.59);
    }

    #[test]
    fn test_detail_of() {
        assert_eq!(detail_of(&json!({ "detail": "bad" })).as_deref(), Some("bad"));
        assert!(detail_of(&json!({ "error": "x" })).is_none());
        assert!(detail_of(&json!({ "detail": [1] })).unwrap().contains('1'));
    }
}
