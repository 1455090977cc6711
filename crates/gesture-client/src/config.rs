//! Client configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `KINECT_TRITON_*` environment variables (nested keys use `__`, e.g.
//! `KINECT_TRITON_KINECT__FRAME_TIMEOUT_MS`). CLI flags are applied last.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use kinect_capture::KinectConfig;
use serde::{Deserialize, Serialize};
use triton_client::ClientOptions;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Inference server `host:port`
    pub url: String,
    /// Model with INPUT0/INPUT1 → OUTPUT0 (sum) / OUTPUT1 (difference)
    pub model_name: String,
    /// Gesture classifier
    pub gesture_model: String,
    /// Input slot of the gesture classifier
    pub gesture_input: String,
    /// Output read back from the gesture classifier
    pub gesture_output: String,
    /// Pause between starting and stopping the capture
    pub capture_duration_ms: u64,
    /// Channel establishment timeout
    pub connect_timeout_ms: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Use the simulated sensor instead of libfreenect2
    pub simulate: bool,
    pub kinect: KinectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "localhost:8001".to_string(),
            model_name: "simple".to_string(),
            gesture_model: "GestureNet".to_string(),
            gesture_input: "input_1".to_string(),
            gesture_output: "activation_18".to_string(),
            capture_duration_ms: 5000,
            connect_timeout_ms: 5000,
            log_level: "info".to_string(),
            log_json: false,
            simulate: !cfg!(feature = "freenect2"),
            kinect: KinectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load defaults, `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix("KINECT_TRITON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn capture_duration(&self) -> Duration {
        Duration::from_millis(self.capture_duration_ms)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..Default::default()
        }
    }
}
