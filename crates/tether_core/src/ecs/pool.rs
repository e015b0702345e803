//! Fixed-capacity component storage.
//!
//! Every pool allocates `capacity` slots up front and never grows, so a
//! [`ComponentHandle`] handed to a system keeps pointing at the same slot
//! until the owner deletes the component. Lookups go through a sparse
//! entity → slot map; free slots are kept on a stack.

use crate::ecs::{Component, ComponentHandle, ComponentKind, EcsError, EntityId};

/// Identity and liveness of a slot, kept out of band from the payload.
#[derive(Debug, Clone, Default)]
pub struct SlotMeta {
    pub live: bool,
    pub owner: Option<EntityId>,
    pub scene: String,
    pub generation: u32,
}

pub struct ComponentPool<T> {
    slots: Vec<T>,
    meta: Vec<SlotMeta>,
    sparse: Vec<Option<u32>>,
    free: Vec<u32>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, T::default);
        Self {
            slots,
            meta: vec![SlotMeta::default(); capacity],
            sparse: Vec::new(),
            // Reversed so slot 0 is handed out first.
            free: (0..capacity as u32).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.capacity() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    fn slot_of(&self, entity: EntityId) -> Option<usize> {
        self.sparse
            .get(entity.index())
            .copied()
            .flatten()
            .map(|slot| slot as usize)
    }

    /// Claim a free slot for `entity`, reset to `T::default()`.
    ///
    /// Returns `None` when the pool is exhausted or the entity already owns a
    /// slot; existing slots are left untouched in both cases.
    pub fn assign(&mut self, entity: EntityId, scene: &str) -> Option<&mut T> {
        if self.slot_of(entity).is_some() {
            tracing::warn!(
                "entity {} already owns a {} component",
                entity,
                T::NAME
            );
            return None;
        }
        let Some(slot) = self.free.pop() else {
            tracing::warn!(
                "{} pool is full ({} slots); cannot assign to entity {}",
                T::NAME,
                self.capacity(),
                entity
            );
            return None;
        };

        let index = slot as usize;
        let meta = &mut self.meta[index];
        meta.live = true;
        meta.owner = Some(entity);
        meta.scene.clear();
        meta.scene.push_str(scene);

        if self.sparse.len() <= entity.index() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(slot);

        self.slots[index] = T::default();
        Some(&mut self.slots[index])
    }

    pub fn has(&self, entity: EntityId) -> bool {
        self.slot_of(entity).is_some()
    }

    fn missing(&self, entity: EntityId) -> EcsError {
        tracing::error!("entity {} has no live {} component", entity, T::NAME);
        debug_assert!(
            false,
            "entity {} has no live {} component",
            entity,
            T::NAME
        );
        EcsError::MissingComponent {
            entity,
            component: T::NAME,
        }
    }

    /// Access a component the caller knows exists (signature already checked).
    pub fn get(&self, entity: EntityId) -> Result<&T, EcsError> {
        match self.slot_of(entity) {
            Some(slot) => Ok(&self.slots[slot]),
            None => Err(self.missing(entity)),
        }
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Result<&mut T, EcsError> {
        match self.slot_of(entity) {
            Some(slot) => Ok(&mut self.slots[slot]),
            None => Err(self.missing(entity)),
        }
    }

    /// Lookup that returns `None` instead of an error.
    pub fn find(&self, entity: EntityId) -> Option<&T> {
        self.slot_of(entity).map(|slot| &self.slots[slot])
    }

    pub fn find_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slot_of(entity).map(move |slot| &mut self.slots[slot])
    }

    /// Release the entity's slot. The payload is left in place until the slot
    /// is assigned again.
    pub fn delete(&mut self, entity: EntityId) -> bool {
        let Some(slot) = self.slot_of(entity) else {
            return false;
        };
        self.sparse[entity.index()] = None;
        let meta = &mut self.meta[slot];
        meta.live = false;
        meta.owner = None;
        meta.generation = meta.generation.wrapping_add(1);
        self.free.push(slot as u32);
        true
    }

    /// Overwrite the payload with a fresh default; owner and scene are kept.
    pub fn reset(&mut self, entity: EntityId) -> bool {
        match self.slot_of(entity) {
            Some(slot) => {
                self.slots[slot] = T::default();
                true
            }
            None => false,
        }
    }

    /// Copy `src`'s payload into `dst`, assigning `dst` a slot first if needed.
    ///
    /// `dst` keeps its own owner and scene; a freshly assigned `dst` takes the
    /// scene of `src`.
    pub fn duplicate(&mut self, src: EntityId, dst: EntityId) -> Option<&mut T> {
        let Some(src_slot) = self.slot_of(src) else {
            tracing::error!(
                "cannot duplicate {}: entity {} has none",
                T::NAME,
                src
            );
            return None;
        };
        if !self.has(dst) {
            let scene = self.meta[src_slot].scene.clone();
            self.assign(dst, &scene)?;
        }
        let dst_slot = self.slot_of(dst)?;
        if dst_slot != src_slot {
            let value = self.slots[src_slot].clone();
            self.slots[dst_slot] = value;
        }
        Some(&mut self.slots[dst_slot])
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<ComponentHandle> {
        self.slot_of(entity).map(|slot| ComponentHandle {
            slot: slot as u32,
            generation: self.meta[slot].generation,
        })
    }

    fn check(&self, handle: ComponentHandle) -> Option<usize> {
        let slot = handle.slot as usize;
        let meta = self.meta.get(slot)?;
        (meta.live && meta.generation == handle.generation).then_some(slot)
    }

    /// Resolve a cached handle; stale handles yield `None`.
    pub fn resolve(&self, handle: ComponentHandle) -> Option<&T> {
        self.check(handle).map(|slot| &self.slots[slot])
    }

    pub fn resolve_mut(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        self.check(handle).map(move |slot| &mut self.slots[slot])
    }

    pub fn owner_of(&self, handle: ComponentHandle) -> Option<EntityId> {
        self.check(handle).and_then(|slot| self.meta[slot].owner)
    }

    pub fn scene_of_handle(&self, handle: ComponentHandle) -> Option<&str> {
        self.check(handle).map(|slot| self.meta[slot].scene.as_str())
    }

    pub fn scene_of(&self, entity: EntityId) -> Option<&str> {
        self.slot_of(entity).map(|slot| self.meta[slot].scene.as_str())
    }

    pub fn set_scene(&mut self, entity: EntityId, scene: &str) -> bool {
        match self.slot_of(entity) {
            Some(slot) => {
                let meta = &mut self.meta[slot];
                meta.scene.clear();
                meta.scene.push_str(scene);
                true
            }
            None => false,
        }
    }

    /// Bring a deleted slot back for its previous owner, provided nobody
    /// claimed it in the meantime. `handle` is the handle taken before delete.
    pub fn revive(&mut self, entity: EntityId, handle: ComponentHandle, scene: &str) -> bool {
        if !self.can_revive(entity, handle) {
            return false;
        }
        let slot = handle.slot;
        self.free.retain(|free| *free != slot);
        let meta = &mut self.meta[slot as usize];
        meta.live = true;
        meta.owner = Some(entity);
        meta.scene.clear();
        meta.scene.push_str(scene);
        if self.sparse.len() <= entity.index() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(slot);
        true
    }

    pub fn can_revive(&self, entity: EntityId, handle: ComponentHandle) -> bool {
        let Some(meta) = self.meta.get(handle.slot as usize) else {
            return false;
        };
        !meta.live && meta.generation == handle.generation.wrapping_add(1) && !self.has(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.meta
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(meta, value)| match (meta.live, meta.owner) {
                (true, Some(owner)) => Some((owner, value)),
                _ => None,
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.meta
            .iter()
            .zip(self.slots.iter_mut())
            .filter_map(|(meta, value)| match (meta.live, meta.owner) {
                (true, Some(owner)) => Some((owner, value)),
                _ => None,
            })
    }
}

/// Type-erased pool operations used by the registry when it only knows a
/// [`ComponentKind`].
pub trait ErasedPool {
    fn kind(&self) -> ComponentKind;
    fn has(&self, entity: EntityId) -> bool;
    fn assign_default(&mut self, entity: EntityId, scene: &str) -> bool;
    fn delete(&mut self, entity: EntityId) -> bool;
    fn reset(&mut self, entity: EntityId) -> bool;
    fn duplicate(&mut self, src: EntityId, dst: EntityId) -> bool;
    fn set_scene(&mut self, entity: EntityId, scene: &str) -> bool;
    fn handle_of(&self, entity: EntityId) -> Option<ComponentHandle>;
    fn can_revive(&self, entity: EntityId, handle: ComponentHandle) -> bool;
    fn revive(&mut self, entity: EntityId, handle: ComponentHandle, scene: &str) -> bool;
    fn live_count(&self) -> usize;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn kind(&self) -> ComponentKind {
        T::KIND
    }

    fn has(&self, entity: EntityId) -> bool {
        ComponentPool::has(self, entity)
    }

    fn assign_default(&mut self, entity: EntityId, scene: &str) -> bool {
        self.assign(entity, scene).is_some()
    }

    fn delete(&mut self, entity: EntityId) -> bool {
        ComponentPool::delete(self, entity)
    }

    fn reset(&mut self, entity: EntityId) -> bool {
        ComponentPool::reset(self, entity)
    }

    fn duplicate(&mut self, src: EntityId, dst: EntityId) -> bool {
        ComponentPool::duplicate(self, src, dst).is_some()
    }

    fn set_scene(&mut self, entity: EntityId, scene: &str) -> bool {
        ComponentPool::set_scene(self, entity, scene)
    }

    fn handle_of(&self, entity: EntityId) -> Option<ComponentHandle> {
        ComponentPool::handle_of(self, entity)
    }

    fn can_revive(&self, entity: EntityId, handle: ComponentHandle) -> bool {
        ComponentPool::can_revive(self, entity, handle)
    }

    fn revive(&mut self, entity: EntityId, handle: ComponentHandle, scene: &str) -> bool {
        ComponentPool::revive(self, entity, handle, scene)
    }

    fn live_count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{RigidBody, Sprite};
    use glam::Vec2;

    fn e(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    #[test]
    fn assign_then_has_and_get_owner() {
        let mut pool = ComponentPool::<Sprite>::new(4);
        assert!(pool.assign(e(3), "level").is_some());
        assert!(pool.has(e(3)));
        assert!(pool.get(e(3)).is_ok());

        let handle = pool.handle_of(e(3)).unwrap();
        assert_eq!(pool.owner_of(handle), Some(e(3)));
        assert_eq!(pool.scene_of(e(3)), Some("level"));
    }

    #[test]
    fn delete_is_idempotent_failure() {
        let mut pool = ComponentPool::<Sprite>::new(2);
        pool.assign(e(0), "s");
        assert!(pool.delete(e(0)));
        assert!(!pool.has(e(0)));
        assert!(!pool.delete(e(0)));
    }

    #[test]
    fn capacity_overflow_returns_none_and_leaves_slots_alone() {
        let capacity = 8;
        let mut pool = ComponentPool::<Sprite>::new(capacity);
        for raw in 0..capacity as u32 {
            let sprite = pool.assign(e(raw), "s").unwrap();
            sprite.image = format!("img{raw}");
        }
        assert!(pool.is_full());
        assert!(pool.assign(e(99), "s").is_none());
        for raw in 0..capacity as u32 {
            assert_eq!(pool.find(e(raw)).unwrap().image, format!("img{raw}"));
        }

        assert!(pool.delete(e(2)));
        assert!(pool.assign(e(99), "s").is_some());
        assert_eq!(pool.len(), capacity);
    }

    #[test]
    fn assign_resets_a_recycled_slot() {
        let mut pool = ComponentPool::<Sprite>::new(1);
        pool.assign(e(0), "s").unwrap().image = "old".into();
        pool.delete(e(0));
        let fresh = pool.assign(e(1), "other").unwrap();
        assert!(fresh.image.is_empty());
        assert_eq!(pool.scene_of(e(1)), Some("other"));
    }

    #[test]
    fn duplicate_copies_payload_but_keeps_identity() {
        let mut pool = ComponentPool::<RigidBody>::new(4);
        {
            let body = pool.assign(e(1), "a").unwrap();
            body.velocity = Vec2::new(3.0, 4.0);
            body.mass = 7.0;
        }
        pool.assign(e(2), "b");

        let copy = pool.duplicate(e(1), e(2)).unwrap();
        assert_eq!(copy.velocity, Vec2::new(3.0, 4.0));
        assert_eq!(copy.mass, 7.0);
        assert_eq!(pool.scene_of(e(2)), Some("b"));
        let handle = pool.handle_of(e(2)).unwrap();
        assert_eq!(pool.owner_of(handle), Some(e(2)));

        // Absent destination gets a slot.
        assert!(pool.duplicate(e(1), e(3)).is_some());
        assert_eq!(pool.scene_of(e(3)), Some("a"));
    }

    #[test]
    fn reset_preserves_owner_and_scene() {
        let mut pool = ComponentPool::<Sprite>::new(2);
        pool.assign(e(5), "menu").unwrap().image = "logo".into();
        assert!(pool.reset(e(5)));
        assert!(pool.find(e(5)).unwrap().image.is_empty());
        assert_eq!(pool.scene_of(e(5)), Some("menu"));
        assert!(pool.has(e(5)));
    }

    #[test]
    fn handles_go_stale_after_delete_and_reuse() {
        let mut pool = ComponentPool::<Sprite>::new(1);
        pool.assign(e(0), "s");
        let handle = pool.handle_of(e(0)).unwrap();
        pool.delete(e(0));
        assert!(pool.resolve(handle).is_none());

        pool.assign(e(1), "s");
        assert!(pool.resolve(handle).is_none());
        assert!(pool.resolve(pool.handle_of(e(1)).unwrap()).is_some());
    }

    #[test]
    fn revive_restores_untouched_slot() {
        let mut pool = ComponentPool::<Sprite>::new(2);
        pool.assign(e(0), "s").unwrap().image = "keep".into();
        let handle = pool.handle_of(e(0)).unwrap();
        pool.delete(e(0));

        assert!(pool.revive(e(0), handle, "s"));
        assert_eq!(pool.get(e(0)).unwrap().image, "keep");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn revive_fails_once_slot_is_reused() {
        let mut pool = ComponentPool::<Sprite>::new(1);
        pool.assign(e(0), "s");
        let handle = pool.handle_of(e(0)).unwrap();
        pool.delete(e(0));
        pool.assign(e(1), "s");
        assert!(!pool.revive(e(0), handle, "s"));
    }

    #[test]
    fn iter_yields_live_owners() {
        let mut pool = ComponentPool::<Sprite>::new(4);
        pool.assign(e(0), "s");
        pool.assign(e(1), "s");
        pool.assign(e(2), "s");
        pool.delete(e(1));
        let mut owners: Vec<_> = pool.iter().map(|(owner, _)| owner).collect();
        owners.sort();
        assert_eq!(owners, vec![e(0), e(2)]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "has no live Sprite component")]
    fn get_missing_component_asserts() {
        let pool = ComponentPool::<Sprite>::new(1);
        let _ = pool.get(e(0));
    }
}
