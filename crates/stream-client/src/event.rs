//! Events fed into the client loop from outside the stream

use hazard_protocol::{DetectionMode, Location};

/// Sensor and user-action events queued for the client loop
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// New fix from the device position source
    Location(Location),
    /// Position source failed or was denied
    LocationError(String),
    /// Backend confirmed a mode switch
    ModeChanged(DetectionMode),
    /// Video upload in progress
    UploadStarted,
    /// Video upload ended; `filename` is set when the backend accepted it
    UploadFinished { filename: Option<String> },
    /// Backend stopped video playback and fell back to the live camera
    VideoStopped,
}
