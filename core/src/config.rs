//! Bridge configuration.
//!
//! Every field has a default matching the stock Android setup, so an empty
//! TOML document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serializing config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// The single input method installed into the default group.
    pub input_method: String,

    /// Addon exposing the bridge-facing operations.
    pub frontend_addon: String,

    /// Program name the input context is created for.
    pub program_name: String,

    /// Tag attached to relayed stdout/stderr lines.
    pub engine_log_tag: String,

    /// Tag attached to the bridge's own log output.
    pub bridge_log_tag: String,

    /// Language model directory, relative to the app data directory.
    pub libime_subdir: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            input_method: "pinyin".to_string(),
            frontend_addon: "androidfrontend".to_string(),
            program_name: "fcitx5-android".to_string(),
            engine_log_tag: "fcitx5".to_string(),
            bridge_log_tag: "JNI".to_string(),
            libime_subdir: "fcitx5/libime".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
