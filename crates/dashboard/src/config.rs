//! Dashboard configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `HAZARD_EYE__SECTION__KEY` environment variables.

use std::net::SocketAddr;
use std::path::Path;

use alerting::{AlertConfig, ThrottleConfig};
use backend_api::ApiConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use stream_client::ClientConfig;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "hazard-eye.toml";

/// Local status server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Prometheus exporter; disabled unless `listen` is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub listen: Option<SocketAddr>,
}

/// Full dashboard settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stream: ClientConfig,
    pub alert: AlertConfig,
    pub api: ApiConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub report: ThrottleConfig,
}

impl Settings {
    /// Load settings; a missing file is not an error
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(file).required(path.is_some()))
            .add_source(
                Environment::with_prefix("HAZARD_EYE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
