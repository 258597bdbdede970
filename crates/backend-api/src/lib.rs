//! Backend API Client
//!
//! Request/response calls to the detection backend that sit beside the
//! stream: detection mode control, video upload with progress, and
//! hazard report submission.

mod client;
mod notify;
mod upload;

pub use client::{ApiConfig, BackendClient, ReportReceipt, UploadReceipt};
pub use notify::{LogReportNotifier, ReportNotifier};
pub use upload::{mime_for_file, validate_video, ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES};

use thiserror::Error;

/// Backend API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(String),

    /// Non-2xx response; `detail` is the server's explanation when it sent one
    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Request(err.to_string())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}
