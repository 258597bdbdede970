//! Hazard Stream Protocol
//!
//! Wire types for the detection backend's push stream. The stream carries
//! no envelope: text frames are telemetry JSON (or the keepalive token),
//! binary frames are encoded images.

mod error;
mod message;
mod telemetry;

pub use error::ProtocolError;
pub use message::{decode_binary, decode_text, FramePayload, InboundMessage, OutboundMessage};
pub use telemetry::{DetectionMode, LaneHazards, Location, TelemetryMessage};

/// Text frame the backend sends to keep idle connections open
pub const KEEPALIVE_TOKEN: &str = "ping";
