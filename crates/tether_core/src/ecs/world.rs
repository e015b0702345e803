use crate::assets::{AssetProvider, NoAssets};
use crate::config::EngineConfig;
use crate::ecs::components::{Name, Transform};
use crate::ecs::{
    Component, ComponentPools, DeletedEntity, EcsError, EntityId, Layer, Registry, Signature,
    System, SystemContext, SystemHandle, SystemRegistrationError, SystemRegistry,
};
use crate::time::FrameClock;
use std::time::Duration;
use tether_metrics::{time_scope, SystemProfiler};

/// Top-level game state driving which systems run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameState {
    /// Run every system's start hook on the next update, then switch to `Running`.
    Start,
    Running,
    Stop,
    Wait,
    Terminate,
}

/// Registry, systems and clock for one running game.
pub struct World {
    registry: Registry,
    systems: SystemRegistry,
    clock: FrameClock,
    state: GameState,
    profiler: SystemProfiler,
    assets: Box<dyn AssetProvider>,
}

impl World {
    pub fn new(config: &EngineConfig) -> Self {
        let mut clock = FrameClock::new(config.fixed_tick_hz, config.max_steps_per_frame);
        clock.set_time_scale(config.time_scale);
        Self {
            registry: Registry::new(config.max_entities),
            systems: SystemRegistry::new(),
            clock,
            state: GameState::Stop,
            profiler: SystemProfiler::new(),
            assets: Box::new(NoAssets),
        }
    }

    pub fn set_assets(&mut self, assets: Box<dyn AssetProvider>) {
        self.assets = assets;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pools(&self) -> &ComponentPools {
        &self.registry.pools
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn set_state(&mut self, state: GameState) {
        if self.state != state {
            tracing::info!("game state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Add a system at the end of the update order and register every
    /// existing entity that matches it.
    pub fn register_system<S: System>(
        &mut self,
        mut system: S,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let required = system.descriptor().signature();
        let mut matching: Vec<EntityId> = self
            .registry
            .signatures
            .iter()
            .filter(|(_, signature)| signature.contains(required))
            .map(|(entity, _)| *entity)
            .collect();
        matching.sort_unstable();
        for entity in matching {
            system.register(entity, &self.registry.pools);
        }
        let handle = self.systems.register(Box::new(system))?;
        tracing::debug!("registered system #{}", handle);
        Ok(handle)
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems.get::<S>()
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// Run `f` with a system and the component pools borrowed together.
    pub fn with_system<S: System, R>(
        &mut self,
        f: impl FnOnce(&mut S, &mut ComponentPools) -> R,
    ) -> Option<R> {
        let system = self.systems.get_mut::<S>()?;
        Some(f(system, &mut self.registry.pools))
    }

    // ------------------------------------------------------------------
    // Scenes
    // ------------------------------------------------------------------

    pub fn load_scene(&mut self, name: &str, is_prefab: bool) {
        self.registry.scenes.load_scene(name, is_prefab);
    }

    pub fn set_scene_active(&mut self, name: &str, active: bool) -> Result<(), EcsError> {
        self.registry.scenes.set_active(name, active)
    }

    /// Delete every entity of the scene and forget it, along with the
    /// deletion records that pointed into it. Returns how many entities
    /// were removed.
    pub fn unload_scene(&mut self, name: &str) -> usize {
        let entities = self.registry.scenes.entities(name).to_vec();
        let before = self.registry.entity_count();
        for entity in entities {
            // Children may already be gone with their parent.
            if self.registry.contains(entity) {
                self.delete_entity(entity);
            }
        }
        self.registry.scenes.remove_scene(name);
        self.registry.forget_deleted(name);
        before - self.registry.entity_count()
    }

    // ------------------------------------------------------------------
    // Entities and components
    // ------------------------------------------------------------------

    /// Create an entity with `Name` and `Transform` in `scene`.
    pub fn create_entity(&mut self, scene: &str) -> Option<EntityId> {
        if !self.registry.scenes.is_loaded(scene) {
            tracing::error!("cannot create entity: scene '{}' is not loaded", scene);
            return None;
        }
        let entity = self.registry.allocate()?;
        if let Err(err) = self.registry.scenes.add_entity(scene, entity) {
            tracing::error!("{}", err);
        }
        self.registry.layers.add_entity(Layer::DEFAULT, entity);
        self.add_component::<Name>(entity);
        self.add_component::<Transform>(entity);
        Some(entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.registry.contains(entity)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.registry.has_component::<T>(entity)
    }

    pub fn component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.registry.component::<T>(entity)
    }

    pub fn component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.registry.component_mut::<T>(entity)
    }

    /// Attach a default `T` and register the entity with newly matching systems.
    pub fn add_component<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let Some(mut signature) = self.registry.signature(entity) else {
            tracing::warn!("cannot add {}: entity {} does not exist", T::NAME, entity);
            return None;
        };
        if signature.test(T::KIND) {
            tracing::warn!("entity {} already has a {} component", entity, T::NAME);
            return None;
        }
        let scene = self
            .registry
            .scenes
            .scene_of(entity)
            .unwrap_or_default()
            .to_string();
        T::pool_mut(&mut self.registry.pools).assign(entity, &scene)?;

        signature.set(T::KIND);
        self.registry.signatures.insert(entity, signature);
        self.systems
            .register_matching(entity, signature, &self.registry.pools);
        T::pool_mut(&mut self.registry.pools).find_mut(entity)
    }

    /// Detach `T` and deregister the entity from systems that required it.
    /// Systems that still match keep tracking it untouched.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        let Some(before) = self.registry.signature(entity) else {
            tracing::warn!("cannot remove {}: entity {} does not exist", T::NAME, entity);
            return false;
        };
        if !before.test(T::KIND) {
            tracing::warn!("entity {} has no {} component", entity, T::NAME);
            return false;
        }
        let mut after = before;
        after.reset(T::KIND);
        self.systems
            .deregister_lost(entity, before, after, &mut self.registry.pools);
        T::pool_mut(&mut self.registry.pools).delete(entity);
        self.registry.signatures.insert(entity, after);
        true
    }

    /// Move the entity to another display layer.
    pub fn set_layer(&mut self, entity: EntityId, layer: Layer) -> bool {
        let Some(name) = self.registry.pools.names.find_mut(entity) else {
            return false;
        };
        let previous = name.layer;
        name.layer = layer;
        self.registry
            .layers
            .swap_entity_layer(layer, previous, entity)
    }

    /// Flag the entity (and optionally its descendants) hidden or visible.
    pub fn set_hidden(&mut self, entity: EntityId, hidden: bool, with_children: bool) -> bool {
        let mut targets = vec![entity];
        if with_children {
            targets.extend(self.registry.hierarchy.descendants(entity));
        }
        let mut found = false;
        for target in targets {
            if let Some(name) = self.registry.pools.names.find_mut(target) {
                name.hidden = hidden;
                found = true;
            }
        }
        found
    }

    pub fn set_parent(&mut self, parent: EntityId, child: EntityId) -> Result<(), EcsError> {
        for entity in [parent, child] {
            if !self.registry.contains(entity) {
                return Err(EcsError::UnknownEntity(entity));
            }
        }
        self.registry.hierarchy.set_parent(parent, child)
    }

    pub fn remove_parent(&mut self, child: EntityId) -> Option<EntityId> {
        self.registry.hierarchy.remove_parent(child)
    }

    /// Remove the entity and its children, keeping enough to restore them.
    pub fn delete_entity(&mut self, entity: EntityId) -> bool {
        let Some(signature) = self.registry.signature(entity) else {
            tracing::error!("cannot delete entity {}: it does not exist", entity);
            return false;
        };

        let parent = self.registry.hierarchy.remove_parent(entity);
        self.systems
            .deregister_matching(entity, signature, &mut self.registry.pools);

        let scene = self
            .registry
            .scenes
            .remove_entity(entity)
            .unwrap_or_default();
        let layer = self
            .registry
            .pools
            .names
            .find(entity)
            .map(|name| name.layer)
            .unwrap_or_default();
        self.registry.layers.remove_entity(layer, entity);

        let children = self.registry.hierarchy.children(entity).to_vec();
        for child in &children {
            self.delete_entity(*child);
        }

        let mut handles = Vec::new();
        for kind in signature.kinds() {
            let pool = self.registry.pools.erased_mut(kind);
            if let Some(handle) = pool.handle_of(entity) {
                handles.push((kind, handle));
            }
            pool.delete(entity);
        }

        self.registry.hierarchy.clear(entity);
        self.registry.signatures.remove(&entity);
        self.registry.record_deleted(DeletedEntity {
            id: entity,
            signature,
            scene,
            layer,
            parent,
            children,
            handles,
        });
        tracing::debug!("deleted entity {}", entity);
        true
    }

    /// Bring back a deleted entity (and its children) if its scene is still
    /// loaded and none of its component slots were reused.
    pub fn restore_entity(&mut self, entity: EntityId) -> bool {
        if self.registry.contains(entity) {
            tracing::warn!("entity {} is already live", entity);
            return false;
        }
        let Some(record) = self.registry.take_deleted(entity) else {
            tracing::warn!("entity {} has no deletion record", entity);
            return false;
        };
        let restorable = self.registry.scenes.is_loaded(&record.scene)
            && self.registry.entity_count() < self.registry.max_entities()
            && record.handles.iter().all(|(kind, handle)| {
                self.registry
                    .pools
                    .erased(*kind)
                    .can_revive(entity, *handle)
            });
        if !restorable {
            tracing::warn!(
                "entity {} cannot be restored (scene '{}' unloaded or slots reused)",
                entity,
                record.scene
            );
            self.registry.record_deleted(record);
            return false;
        }

        for (kind, handle) in &record.handles {
            self.registry
                .pools
                .erased_mut(*kind)
                .revive(entity, *handle, &record.scene);
        }
        self.registry.signatures.insert(entity, record.signature);
        if let Err(err) = self.registry.scenes.add_entity(&record.scene, entity) {
            tracing::error!("{}", err);
        }
        self.registry.layers.add_entity(record.layer, entity);
        if let Some(parent) = record.parent {
            if self.registry.contains(parent) {
                if let Err(err) = self.registry.hierarchy.set_parent(parent, entity) {
                    tracing::warn!("restoring parent of {}: {}", entity, err);
                }
            }
        }
        self.systems
            .register_matching(entity, record.signature, &self.registry.pools);

        for child in record.children {
            self.restore_entity(child);
        }
        true
    }

    /// Copy `src` with all its components and children into `scene` (or the
    /// source's own scene).
    pub fn duplicate_entity(&mut self, src: EntityId, scene: Option<&str>) -> Option<EntityId> {
        let Some(signature) = self.registry.signature(src) else {
            tracing::error!("cannot duplicate entity {}: it does not exist", src);
            return None;
        };
        let scene = match scene {
            Some(scene) => scene.to_string(),
            None => self.registry.scenes.scene_of(src)?.to_string(),
        };
        let dst = self.create_entity(&scene)?;

        let mut copied = Signature::EMPTY;
        for kind in signature.kinds() {
            let pool = self.registry.pools.erased_mut(kind);
            if pool.duplicate(src, dst) {
                pool.set_scene(dst, &scene);
                copied.set(kind);
            }
        }
        self.registry.signatures.insert(dst, copied);

        let layer = self
            .registry
            .pools
            .names
            .find(dst)
            .map(|name| name.layer)
            .unwrap_or_default();
        self.registry
            .layers
            .swap_entity_layer(layer, Layer::DEFAULT, dst);

        self.systems
            .register_matching(dst, copied, &self.registry.pools);

        if let Some(parent) = self.registry.hierarchy.parent(src) {
            if let Err(err) = self.registry.hierarchy.set_parent(parent, dst) {
                tracing::warn!("parenting duplicate {}: {}", dst, err);
            }
        }
        let children = self.registry.hierarchy.children(src).to_vec();
        for child in children {
            if let Some(copy) = self.duplicate_entity(child, Some(&scene)) {
                if let Err(err) = self.registry.hierarchy.set_parent(dst, copy) {
                    tracing::warn!("parenting duplicate child {}: {}", copy, err);
                }
            }
        }
        Some(dst)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Advance the clock and run every system once per active scene.
    pub fn update(&mut self, frame: Duration) {
        if self.state == GameState::Terminate {
            return;
        }
        self.profiler.begin_frame();
        self.clock.advance(frame);

        if self.state == GameState::Start {
            self.clock.reset_run_time();
            let Registry { pools, scenes, .. } = &mut self.registry;
            for system in self.systems.systems_mut() {
                system.on_start(pools, scenes);
            }
            self.set_state(GameState::Running);
        }
        let running = self.state == GameState::Running;
        if running {
            self.clock.add_run_time();
        }

        let active: Vec<String> = self
            .registry
            .scenes
            .active_scenes()
            .map(str::to_owned)
            .collect();

        let World {
            registry,
            systems,
            clock,
            profiler,
            assets,
            ..
        } = self;
        let Registry {
            pools,
            scenes,
            layers,
            hierarchy,
            ..
        } = registry;

        for system in systems.systems_mut() {
            if !running && !system.descriptor().runs_when_paused() {
                continue;
            }
            if !system.cache().is_aligned() {
                tracing::error!(
                    "system '{}' has misaligned caches; skipping this frame",
                    system.descriptor().name()
                );
                continue;
            }
            let name = system.descriptor().name().to_string();
            time_scope!(profiler, &name, {
                for scene in &active {
                    let mut ctx = SystemContext {
                        pools: &mut *pools,
                        scene: scene.as_str(),
                        scenes: &*scenes,
                        layers: &*layers,
                        hierarchy: &*hierarchy,
                        clock: &*clock,
                        assets: &**assets,
                    };
                    system.update(&mut ctx);
                }
            });
        }
    }
}
