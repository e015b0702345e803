//! Loaded scenes, prefab flags and per-entity membership.

use crate::ecs::{EcsError, EntityId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct SceneInfo {
    pub active: bool,
    pub is_prefab: bool,
    pub entities: Vec<EntityId>,
}

#[derive(Default)]
pub struct SceneRegistry {
    scenes: BTreeMap<String, SceneInfo>,
    membership: HashMap<EntityId, String>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene. Loading an already loaded scene is a no-op.
    pub fn load_scene(&mut self, name: &str, is_prefab: bool) {
        if self.scenes.contains_key(name) {
            tracing::debug!("scene '{}' already loaded", name);
            return;
        }
        self.scenes.insert(
            name.to_string(),
            SceneInfo {
                active: true,
                is_prefab,
                entities: Vec::new(),
            },
        );
    }

    /// Forget a scene and return the entities that belonged to it.
    pub(crate) fn remove_scene(&mut self, name: &str) -> Option<Vec<EntityId>> {
        let info = self.scenes.remove(name)?;
        for entity in &info.entities {
            self.membership.remove(entity);
        }
        Some(info.entities)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<(), EcsError> {
        let info = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| EcsError::UnknownScene(name.to_string()))?;
        info.active = active;
        Ok(())
    }

    pub fn is_prefab(&self, name: &str) -> bool {
        self.scenes.get(name).is_some_and(|info| info.is_prefab)
    }

    /// Active scene names in a stable order.
    pub fn active_scenes(&self) -> impl Iterator<Item = &str> {
        self.scenes
            .iter()
            .filter(|(_, info)| info.active)
            .map(|(name, _)| name.as_str())
    }

    pub fn scene_of(&self, entity: EntityId) -> Option<&str> {
        self.membership.get(&entity).map(String::as_str)
    }

    pub fn entities(&self, name: &str) -> &[EntityId] {
        self.scenes
            .get(name)
            .map(|info| info.entities.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn add_entity(&mut self, name: &str, entity: EntityId) -> Result<(), EcsError> {
        let info = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| EcsError::UnknownScene(name.to_string()))?;
        if !info.entities.contains(&entity) {
            info.entities.push(entity);
        }
        self.membership.insert(entity, name.to_string());
        Ok(())
    }

    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> Option<String> {
        let scene = self.membership.remove(&entity)?;
        if let Some(info) = self.scenes.get_mut(&scene) {
            info.entities.retain(|member| *member != entity);
        }
        Some(scene)
    }
}
