//! Configuration for channel displays

use serde::{Deserialize, Serialize};

/// Channel display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Channel to subscribe to
    pub channel: String,

    /// Prefer best-effort transport over guaranteed delivery
    pub unreliable: bool,

    /// Frame filter queue depth (items buffered while unresolvable)
    pub queue_depth: usize,

    /// Reference frame items are resolved into
    pub fixed_frame: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            unreliable: false,
            queue_depth: 10,
            fixed_frame: "map".to_string(),
        }
    }
}

impl DisplayConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DisplayConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = DisplayConfig::default();

        if let Ok(channel) = std::env::var("PARALLAX_CHANNEL") {
            config.channel = channel;
        }

        if let Ok(frame) = std::env::var("PARALLAX_FIXED_FRAME") {
            config.fixed_frame = frame;
        }

        if let Ok(unreliable) = std::env::var("PARALLAX_UNRELIABLE") {
            config.unreliable = unreliable
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad unreliable flag: {}", e)))?;
        }

        if let Ok(depth) = std::env::var("PARALLAX_QUEUE_DEPTH") {
            config.queue_depth = depth
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad queue depth: {}", e)))?;
        }

        Ok(config)
    }
}
