//! Entity bookkeeping: signatures, pools, scenes, layers and hierarchy.
//!
//! The registry only stores state. Operations that also have to keep the
//! system caches in step (create, add, remove, delete) live on `World`.

use crate::ecs::{
    Component, ComponentHandle, ComponentKind, ComponentPools, EntityId, Hierarchy, Layer,
    LayerStack, SceneRegistry, Signature,
};
use std::collections::{HashMap, VecDeque};

/// What is needed to bring a deleted entity back.
#[derive(Debug, Clone)]
pub struct DeletedEntity {
    pub id: EntityId,
    pub signature: Signature,
    pub scene: String,
    pub layer: Layer,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub handles: Vec<(ComponentKind, ComponentHandle)>,
}

pub struct Registry {
    pub(crate) pools: ComponentPools,
    pub(crate) signatures: HashMap<EntityId, Signature>,
    pub(crate) scenes: SceneRegistry,
    pub(crate) layers: LayerStack,
    pub(crate) hierarchy: Hierarchy,
    pub(crate) deleted: VecDeque<DeletedEntity>,
    /// Ids below `next_entity` that are neither live nor restorable.
    free: Vec<EntityId>,
    next_entity: u32,
    max_entities: usize,
}

impl Registry {
    pub fn new(max_entities: usize) -> Self {
        Self {
            pools: ComponentPools::new(max_entities),
            signatures: HashMap::new(),
            scenes: SceneRegistry::new(),
            layers: LayerStack::new(),
            hierarchy: Hierarchy::new(),
            deleted: VecDeque::new(),
            free: Vec::new(),
            next_entity: 0,
            max_entities,
        }
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.signatures.contains_key(&entity)
    }

    pub fn signature(&self, entity: EntityId) -> Option<Signature> {
        self.signatures.get(&entity).copied()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.signatures.keys().copied()
    }

    pub fn pools(&self) -> &ComponentPools {
        &self.pools
    }

    pub fn scenes(&self) -> &SceneRegistry {
        &self.scenes
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Deletion records, oldest first.
    pub fn deleted(&self) -> impl ExactSizeIterator<Item = &DeletedEntity> {
        self.deleted.iter()
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.signature(entity)
            .is_some_and(|signature| signature.test(T::KIND))
    }

    pub fn component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.has_component::<T>(entity) {
            return None;
        }
        T::pool(&self.pools).find(entity)
    }

    pub fn component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.has_component::<T>(entity) {
            return None;
        }
        T::pool_mut(&mut self.pools).find_mut(entity)
    }

    /// Reserve an id in `[0, max_entities)` with an empty signature, or
    /// `None` at capacity.
    ///
    /// Ids of forgotten records are reused first, then fresh ones. Once the
    /// range is used up the oldest deletion record gives up its id and can
    /// no longer be restored.
    pub(crate) fn allocate(&mut self) -> Option<EntityId> {
        if self.signatures.len() >= self.max_entities {
            tracing::warn!(
                "entity limit of {} reached; cannot create entity",
                self.max_entities
            );
            return None;
        }
        let entity = if let Some(entity) = self.free.pop() {
            entity
        } else if (self.next_entity as usize) < self.max_entities {
            self.next_entity += 1;
            EntityId::new(self.next_entity - 1)
        } else {
            let record = self.deleted.pop_front()?;
            tracing::debug!("reusing id {}; it can no longer be restored", record.id);
            record.id
        };
        self.signatures.insert(entity, Signature::EMPTY);
        Some(entity)
    }

    pub(crate) fn record_deleted(&mut self, record: DeletedEntity) {
        self.deleted.push_back(record);
    }

    pub(crate) fn take_deleted(&mut self, entity: EntityId) -> Option<DeletedEntity> {
        let index = self.deleted.iter().position(|record| record.id == entity)?;
        self.deleted.remove(index)
    }

    /// Drop the deletion records of `scene` and free their ids.
    pub(crate) fn forget_deleted(&mut self, scene: &str) -> usize {
        let before = self.deleted.len();
        let free = &mut self.free;
        self.deleted.retain(|record| {
            if record.scene == scene {
                free.push(record.id);
                false
            } else {
                true
            }
        });
        before - self.deleted.len()
    }
}
