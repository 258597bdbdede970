//! Stream endpoint resolution

use tokio_tungstenite::tungstenite::http::Uri;

use crate::ClientError;

/// Pick the stream URL.
///
/// A local development origin goes through its dev-server proxy at
/// `proxy_path` on the same host. Any other origin (or none) connects
/// straight to the backend.
pub fn resolve_stream_url(
    origin: Option<&str>,
    backend_url: &str,
    proxy_path: &str,
) -> Result<String, ClientError> {
    if let Some(origin) = origin {
        let uri: Uri = origin
            .parse()
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", origin, e)))?;

        if matches!(uri.host(), Some("localhost") | Some("127.0.0.1")) {
            let scheme = match uri.scheme_str() {
                Some("https") | Some("wss") => "wss",
                _ => "ws",
            };
            let authority = uri
                .authority()
                .map(|a| a.as_str())
                .ok_or_else(|| ClientError::InvalidEndpoint(origin.to_string()))?;
            return Ok(format!("{}://{}{}", scheme, authority, proxy_path));
        }
    }

    if !(backend_url.starts_with("ws://") || backend_url.starts_with("wss://")) {
        return Err(ClientError::InvalidEndpoint(backend_url.to_string()));
    }
    Ok(backend_url.to_string())
}
