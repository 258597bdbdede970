//! Protocol Error Types

use thiserror::Error;

/// Errors raised while decoding or encoding stream messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text frame was not a valid telemetry object
    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),

    /// Outbound message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::MalformedTelemetry(err.to_string())
    }
}
