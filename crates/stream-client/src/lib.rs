//! Hazard Stream Client
//!
//! Keeps one persistent connection to the detection backend and turns the
//! pushed messages into session state, painted frames and lane warnings.
//! Everything runs on a single event loop task: transport events, timer
//! firings and sensor/user events are handled one at a time to completion.

mod backoff;
mod client;
mod config;
mod endpoint;
mod event;
mod session;

pub use backoff::{LogThrottle, ReconnectPolicy};
pub use client::{ClientHandle, StreamClient};
pub use config::ClientConfig;
pub use endpoint::resolve_stream_url;
pub use event::ClientEvent;
pub use session::{SessionReader, SessionState};

use thiserror::Error;

/// Stream client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid stream endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Stream client stopped")]
    Stopped,

    #[error("Stream client task failed: {0}")]
    Task(String),
}
