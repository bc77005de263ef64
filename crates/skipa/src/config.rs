//! Scene configuration.
//!
//! A [`SceneConfig`] is plain data, loadable from JSON. Every field has a
//! default, so `{}` is a valid document and a file only needs the fields it
//! changes:
//!
//! ```json
//! { "name": "arena", "fixed_timestep": 0.016666668 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors from loading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but holds a value the scene cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Shown in log lines.
    pub name: String,
    /// Initial capacity of the entity storage.
    pub entity_capacity: usize,
    /// Seconds per frame. When set, every frame advances the clock by exactly
    /// this much instead of reading the wall clock.
    pub fixed_timestep: Option<f32>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "scene".to_string(),
            entity_capacity: 64,
            fixed_timestep: None,
        }
    }
}

impl SceneConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(step) = self.fixed_timestep {
            if step <= 0.0 || Duration::try_from_secs_f32(step).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "fixed_timestep must be a positive number of seconds, got {step}"
                )));
            }
        }
        Ok(())
    }
}
