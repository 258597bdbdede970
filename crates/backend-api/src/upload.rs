//! Video upload validation

use std::path::Path;

use crate::ApiError;

/// File extensions the backend can play back
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv"];

/// MIME types accepted regardless of extension
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/avi",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    "video/x-matroska",
];

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Accept a file when either its MIME type or its extension is known
pub fn validate_video(name: &str, mime: Option<&str>) -> Result<(), ApiError> {
    if mime.is_some_and(|m| ALLOWED_MIME_TYPES.contains(&m)) {
        return Ok(());
    }
    match extension(name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ApiError::UnsupportedFormat(format!(
            "{} (expected MP4, AVI, MOV, MKV, WEBM, FLV or WMV)",
            name
        ))),
    }
}

/// Content type sent with the multipart file part
pub fn mime_for_file(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("flv") => "video/x-flv",
        Some("wmv") => "video/x-ms-wmv",
        _ => "application/octet-stream",
    }
}

/// Whole percentage of `sent` out of `total`
pub(crate) fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 * 100.0 / total as f64).round() as u64).min(100) as u8
}
