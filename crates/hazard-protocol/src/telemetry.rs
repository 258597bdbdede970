//! Telemetry Payloads
//!
//! Structured hazard telemetry pushed by the detection backend alongside
//! the annotated frames.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Detection source currently feeding the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Live camera
    #[default]
    Live,
    /// Uploaded video file
    Video,
}

impl DetectionMode {
    /// Human readable label for badges and logs
    pub fn label(&self) -> &'static str {
        match self {
            DetectionMode::Live => "Live Camera",
            DetectionMode::Video => "Video File",
        }
    }
}

/// Device position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One parsed telemetry frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryMessage {
    /// Class of the most recent hazard, if any
    #[serde(default)]
    pub hazard_type: Option<String>,

    /// Hazards inside the driver's lane (missing or null = 0)
    #[serde(default, deserialize_with = "null_as_default")]
    pub driver_lane_hazard_count: u32,

    /// Distances (meters) to each detected hazard, in backend order
    #[serde(default, deserialize_with = "null_as_default")]
    pub hazard_distances: Vec<f64>,

    /// Present only when the backend switched source; unknown values are ignored
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: Option<DetectionMode>,

    /// Playback progress of an uploaded video (0-100)
    #[serde(default)]
    pub video_progress: Option<f64>,
}

impl TelemetryMessage {
    /// Parse a telemetry text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Lane count and distances as one unit
    pub fn lane_hazards(&self) -> LaneHazards {
        LaneHazards {
            count: self.driver_lane_hazard_count,
            distances: self.hazard_distances.clone(),
        }
    }
}

/// Lane hazard count together with the distances reported in the same message.
///
/// Only built from a single [`TelemetryMessage`], so readers never see a
/// distance list that belongs to a different count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LaneHazards {
    count: u32,
    distances: Vec<f64>,
}

impl LaneHazards {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Closest reported hazard, used by emergency braking readers
    pub fn nearest(&self) -> Option<f64> {
        self.distances
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn in_lane(&self) -> bool {
        self.count > 0
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<Option<DetectionMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match DetectionMode::deserialize(&raw) {
        Ok(mode) => Ok(Some(mode)),
        Err(_) => {
            warn!("Ignoring unknown detection mode {}", raw);
            Ok(None)
        }
    }
}
