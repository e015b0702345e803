//! Engine configuration loaded from JSON.

use crate::time::{DEFAULT_MAX_STEPS, DEFAULT_TICK_RATE_HZ};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAX_ENTITIES: usize = 2000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of every component pool.
    pub max_entities: usize,
    pub fixed_tick_hz: u32,
    pub max_steps_per_frame: u32,
    /// Multiplier on simulated time; 0 freezes the simulation.
    pub time_scale: f32,
    pub startup_scene: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            fixed_tick_hz: DEFAULT_TICK_RATE_HZ,
            max_steps_per_frame: DEFAULT_MAX_STEPS,
            time_scale: 1.0,
            startup_scene: "main".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json(Path::new("inline"), r#"{ "max_entities": 16 }"#).unwrap();
        assert_eq!(config.max_entities, 16);
        assert_eq!(config.fixed_tick_hz, DEFAULT_TICK_RATE_HZ);
        assert_eq!(config.startup_scene, "main");
        assert_eq!(config.time_scale, 1.0);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fixed_tick_hz": 30, "startup_scene": "menu" }}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.fixed_tick_hz, 30);
        assert_eq!(config.startup_scene, "menu");
    }

    #[test]
    fn bad_json_reports_path() {
        let err = EngineConfig::from_json(Path::new("bad.json"), "{").unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
