// system.rs - Per-frame logic units and their entity caches
//
// A system tracks every entity whose signature contains its required
// kinds. For each tracked entity it keeps one `ComponentHandle` per kind in
// index-aligned columns, so `columns[k][i]` always belongs to `entities[i]`.

use crate::assets::AssetProvider;
use crate::ecs::components::Name;
use crate::ecs::{
    ComponentHandle, ComponentKind, ComponentPools, EntityId, Hierarchy, LayerStack,
    SceneRegistry, SystemDescriptor,
};
use crate::time::FrameClock;
use std::any::Any;

pub trait System: Any {
    fn descriptor(&self) -> &SystemDescriptor;

    fn cache(&self) -> &SystemCache;

    fn cache_mut(&mut self) -> &mut SystemCache;

    /// Start tracking `entity`. Registering twice is a no-op.
    fn register(&mut self, entity: EntityId, pools: &ComponentPools) -> bool {
        self.cache_mut().insert(entity, pools)
    }

    /// Stop tracking `entity`.
    fn deregister(&mut self, entity: EntityId, _pools: &mut ComponentPools) -> bool {
        self.cache_mut().remove(entity).is_some()
    }

    /// Called once when the game enters its start state.
    fn on_start(&mut self, _pools: &mut ComponentPools, _scenes: &SceneRegistry) {}

    /// Run one frame for the context's active scene.
    fn update(&mut self, ctx: &mut SystemContext<'_>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Index-aligned entity list plus one handle column per required kind.
#[derive(Debug, Clone)]
pub struct SystemCache {
    kinds: Vec<ComponentKind>,
    entities: Vec<EntityId>,
    columns: Vec<Vec<ComponentHandle>>,
}

impl SystemCache {
    pub fn new(kinds: &[ComponentKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            entities: Vec::new(),
            columns: vec![Vec::new(); kinds.len()],
        }
    }

    pub fn for_descriptor(descriptor: &SystemDescriptor) -> Self {
        Self::new(descriptor.components())
    }

    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<EntityId> {
        self.entities.get(index).copied()
    }

    pub fn position(&self, entity: EntityId) -> Option<usize> {
        self.entities.iter().position(|tracked| *tracked == entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.position(entity).is_some()
    }

    /// Handle of `kind` for the entity at `index`.
    pub fn handle(&self, index: usize, kind: ComponentKind) -> Option<ComponentHandle> {
        let column = self.kinds.iter().position(|k| *k == kind)?;
        self.columns[column].get(index).copied()
    }

    pub fn column(&self, kind: ComponentKind) -> Option<&[ComponentHandle]> {
        let column = self.kinds.iter().position(|k| *k == kind)?;
        Some(&self.columns[column])
    }

    /// Append `entity` with a handle for every required kind.
    pub fn insert(&mut self, entity: EntityId, pools: &ComponentPools) -> bool {
        if self.contains(entity) {
            return false;
        }
        let mut handles = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            match pools.erased(*kind).handle_of(entity) {
                Some(handle) => handles.push(handle),
                None => {
                    tracing::warn!(
                        "entity {} lacks a {} component; not registered",
                        entity,
                        kind
                    );
                    return false;
                }
            }
        }
        self.entities.push(entity);
        for (column, handle) in self.columns.iter_mut().zip(handles) {
            column.push(handle);
        }
        true
    }

    /// Swap-remove `entity` from every column, returning its old index.
    pub fn remove(&mut self, entity: EntityId) -> Option<usize> {
        let index = self.position(entity)?;
        if !self.is_aligned() {
            tracing::error!(
                "system cache misaligned while removing entity {} ({} entities, columns {:?})",
                entity,
                self.entities.len(),
                self.columns.iter().map(Vec::len).collect::<Vec<_>>()
            );
        }
        self.entities.swap_remove(index);
        for column in &mut self.columns {
            if index < column.len() {
                column.swap_remove(index);
            }
        }
        Some(index)
    }

    /// Every column has exactly one handle per tracked entity.
    pub fn is_aligned(&self) -> bool {
        self.columns
            .iter()
            .all(|column| column.len() == self.entities.len())
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        for column in &mut self.columns {
            column.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Vec<ComponentHandle>> {
        &mut self.columns
    }
}

/// Everything a system may touch during one update.
pub struct SystemContext<'a> {
    pub pools: &'a mut ComponentPools,
    /// Scene being updated.
    pub scene: &'a str,
    pub scenes: &'a SceneRegistry,
    pub layers: &'a LayerStack,
    pub hierarchy: &'a Hierarchy,
    pub clock: &'a FrameClock,
    pub assets: &'a dyn AssetProvider,
}

impl<'a> SystemContext<'a> {
    pub fn should_process(&self, scene_tag: &str, name: &Name) -> bool {
        scene_tag == self.scene && self.layers.is_visible(name.layer) && !name.hidden
    }

    /// Scene, layer and hidden filter for the entity owning `name`.
    pub fn passes_filter(&self, name: ComponentHandle) -> bool {
        let pool = &self.pools.names;
        match (pool.scene_of_handle(name), pool.resolve(name)) {
            (Some(scene), Some(name)) => self.should_process(scene, name),
            _ => false,
        }
    }
}
