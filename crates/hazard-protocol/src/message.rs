//! Inbound classification and outbound encoding

use serde::Serialize;
use tracing::debug;

use crate::error::ProtocolError;
use crate::telemetry::{Location, TelemetryMessage};
use crate::KEEPALIVE_TOKEN;

/// Encoded image bytes for exactly one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePayload(Vec<u8>);

impl FramePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A stream message classified by payload kind
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Keepalive marker, carries no state
    Keepalive,
    /// Control JSON
    Telemetry(TelemetryMessage),
    /// Binary image frame
    Frame(FramePayload),
}

/// Classify a text frame
pub fn decode_text(text: &str) -> Result<InboundMessage, ProtocolError> {
    if text == KEEPALIVE_TOKEN {
        return Ok(InboundMessage::Keepalive);
    }
    let telemetry = TelemetryMessage::from_json(text)?;
    Ok(InboundMessage::Telemetry(telemetry))
}

/// Classify a binary frame. Every binary payload is an image.
pub fn decode_binary(bytes: Vec<u8>) -> InboundMessage {
    debug!("Frame payload: {} bytes", bytes.len());
    InboundMessage::Frame(FramePayload::new(bytes))
}

/// Messages the client sends upstream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Latest device position
    Gps { gps: Location },
}

impl OutboundMessage {
    pub fn gps(location: Location) -> Self {
        OutboundMessage::Gps { gps: location }
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}
