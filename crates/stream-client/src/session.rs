//! Session state
//!
//! Written only by the client loop, published through a watch channel so
//! presentation and notifiers always read a whole snapshot.

use hazard_protocol::{DetectionMode, LaneHazards, Location};
use serde::Serialize;
use tokio::sync::watch;

use crate::ClientError;

/// Externally observable status of the stream session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    /// Stream connection open
    pub connected: bool,
    /// Consecutive reconnect attempts since the last successful open
    pub retry: u32,
    /// Detection source
    pub mode: DetectionMode,
    /// Uploaded video playback progress (0-100)
    pub video_progress: f64,
    /// Lane hazard count and distances from the latest telemetry
    pub lane_hazards: LaneHazards,
    /// Hazard class from the latest telemetry
    pub hazard_type: Option<String>,
    /// Lane warning engaged
    pub alert_active: bool,
    /// Last published frames per second
    pub fps: u32,
    /// Drawing surface size
    pub frame_size: Option<(u32, u32)>,
    /// Frames dropped because the decode queue was full
    pub frames_dropped: u64,
    /// Video upload in progress
    pub uploading: bool,
    /// Most recent device position
    pub location: Option<Location>,
    /// Position source failure shown to the user
    pub location_warning: Option<String>,
}

impl SessionState {
    pub fn mode_label(&self) -> &'static str {
        self.mode.label()
    }
}

/// Write side, owned by the client loop
#[derive(Debug)]
pub(crate) struct SessionWriter {
    tx: watch::Sender<SessionState>,
}

impl SessionWriter {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx }
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionState)) {
        self.tx.send_modify(f);
    }

    pub(crate) fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side handed to presentation and notifier collaborators
#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
}

impl SessionReader {
    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next update and return it
    pub async fn changed(&mut self) -> Result<SessionState, ClientError> {
        self.rx.changed().await.map_err(|_| ClientError::Stopped)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the state satisfies `f`
    pub async fn wait_for(
        &mut self,
        f: impl FnMut(&SessionState) -> bool,
    ) -> Result<SessionState, ClientError> {
        let state = self.rx.wait_for(f).await.map_err(|_| ClientError::Stopped)?;
        Ok(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_protocol::TelemetryMessage;

    #[test]
    fn test_reader_sees_whole_update() {
        let writer = SessionWriter::new();
        let reader = writer.reader();
        let msg = TelemetryMessage::from_json(
            r#"{"driver_lane_hazard_count":2,"hazard_distances":[5.1,12.3]}"#,
        )
        .unwrap();

        writer.update(|s| s.lane_hazards = msg.lane_hazards());

        let snap = reader.snapshot();
        assert_eq!(snap.lane_hazards.count(), 2);
        assert_eq!(snap.lane_hazards.distances(), &[5.1, 12.3]);
    }

    #[tokio::test]
    async fn test_changed_after_drop_is_stopped() {
        let writer = SessionWriter::new();
        let mut reader = writer.reader();
        writer.update(|s| s.fps = 12);
        assert_eq!(reader.changed().await.unwrap().fps, 12);

        drop(writer);
        assert!(matches!(reader.changed().await, Err(ClientError::Stopped)));
    }
}
