//! API Routes

pub mod session;
pub mod video;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use backend_api::ApiError;
use serde_json::json;

/// Handler error rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum RouteError {
    Backend(ApiError),
    ClientStopped,
}

impl From<ApiError> for RouteError {
    fn from(err: ApiError) -> Self {
        RouteError::Backend(err)
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            RouteError::Backend(ApiError::UnsupportedFormat(msg)) => {
                (StatusCode::BAD_REQUEST, format!("Unsupported file format: {}", msg))
            }
            RouteError::Backend(ApiError::Io(msg)) => (StatusCode::BAD_REQUEST, msg),
            RouteError::Backend(ApiError::Status { detail, .. }) => (StatusCode::BAD_GATEWAY, detail),
            RouteError::Backend(ApiError::Rejected(msg)) => (StatusCode::CONFLICT, msg),
            RouteError::Backend(other) => (StatusCode::BAD_GATEWAY, other.to_string()),
            RouteError::ClientStopped => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Stream client stopped".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
