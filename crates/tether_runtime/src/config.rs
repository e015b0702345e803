//! Runtime configuration: engine settings, scripting, assets and the
//! entities of the startup scene, all in one JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tether_core::config::EngineConfig;
use tether_core::ecs::components::{Animation, Audio, RigidBody, ScriptEntry, Sprite};
use tether_core::glam::Vec2;
use tether_script::ScriptConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub scripts: ScriptConfig,
    /// JSON asset manifest; without one every asset lookup misses.
    pub asset_manifest: Option<PathBuf>,
    pub entities: Vec<EntityConfig>,
}

/// One entity to spawn at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub name: Option<String>,
    /// Defaults to the startup scene.
    pub scene: Option<String>,
    pub position: Vec2,
    pub sprite: Option<Sprite>,
    pub animation: Option<Animation>,
    pub rigid_body: Option<RigidBody>,
    pub audio: Option<Audio>,
    pub scripts: Vec<ScriptEntry>,
}

impl RuntimeConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::info!("no config given, using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
