//! Session Routes

use axum::{extract::State, http::StatusCode, Json};
use hazard_protocol::Location;
use serde::Deserialize;
use std::sync::Arc;
use stream_client::{ClientEvent, SessionState};

use super::RouteError;
use crate::AppState;

/// Body of a position source update: a fix or a failure
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LocationUpdate {
    Fix { lat: f64, lng: f64 },
    Failure { error: String },
}

/// Current session snapshot
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    Json(state.session.snapshot())
}

/// Feed a device position update into the client loop
pub async fn post_location(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LocationUpdate>,
) -> Result<StatusCode, RouteError> {
    let event = match update {
        LocationUpdate::Fix { lat, lng } => ClientEvent::Location(Location::new(lat, lng)),
        LocationUpdate::Failure { error } => ClientEvent::LocationError(error),
    };
    state
        .events
        .send(event)
        .await
        .map_err(|_| RouteError::ClientStopped)?;
    Ok(StatusCode::ACCEPTED)
}
