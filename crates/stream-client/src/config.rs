//! Stream client configuration

use frame_renderer::RendererConfig;
use serde::{Deserialize, Serialize};

use crate::backoff::ReconnectPolicy;

/// Stream client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin the client is served from; a localhost origin routes through the dev proxy
    pub origin: Option<String>,
    /// Direct backend stream address
    pub backend_url: String,
    /// Stream path behind the dev proxy
    pub proxy_path: String,
    /// Reconnection backoff
    pub reconnect: ReconnectPolicy,
    /// Frame decode queue
    pub renderer: RendererConfig,
    /// Grace period for the closing handshake on shutdown (ms)
    pub close_timeout_ms: u64,
    /// Capacity of the client event queue
    pub event_queue: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: None,
            backend_url: "ws://127.0.0.1:8000/ws".to_string(),
            proxy_path: "/ws".to_string(),
            reconnect: ReconnectPolicy::default(),
            renderer: RendererConfig::default(),
            close_timeout_ms: 1000,
            event_queue: 64,
        }
    }
}
