//! Attaches script instances to entities and runs their lifecycle.
//!
//! Per enabled script: `Awake(entity)` once when the instance is created,
//! `Start` on the first update after that, then `Update` every update.
//! `LateUpdate` runs in a second pass after every entity's `Update`.

use crate::bridge::ScriptBridge;
use crate::error::{ScriptError, ScriptFault};
use crate::host::{Invocation, ManagedHost};
use crate::natives::CommandQueue;
use crate::value::{decode_override, ScriptValue};
use std::any::Any;
use std::collections::HashSet;
use tether_core::ecs::components::{ObjectHandle, Script, ScriptEntry, ScriptInstance};
use tether_core::ecs::{
    ComponentKind, ComponentPools, EntityId, SceneRegistry, System, SystemCache, SystemContext,
    SystemDescriptor,
};

type ScriptKey = (EntityId, String);

pub struct LogicSystem<H: ManagedHost> {
    descriptor: SystemDescriptor,
    cache: SystemCache,
    host: H,
    queue: CommandQueue,
    /// Scripts whose instance could not be created; not retried until the
    /// next reload.
    failed: HashSet<ScriptKey>,
}

impl<H: ManagedHost + 'static> LogicSystem<H> {
    pub const NAME: &'static str = "logic";

    pub fn new(host: H, queue: CommandQueue) -> Self {
        let descriptor = SystemDescriptor::new(Self::NAME)
            .requires([ComponentKind::Name, ComponentKind::Script])
            .only_when_running();
        Self {
            cache: SystemCache::for_descriptor(&descriptor),
            descriptor,
            host,
            queue,
            failed: HashSet::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Create, pin and initialise an instance of every script on every
    /// tracked entity outside prefab scenes, then call `Awake` on each.
    /// Returns the number of instances created.
    pub fn start_logic(&mut self, pools: &mut ComponentPools, scenes: &SceneRegistry) -> usize {
        self.failed.clear();
        let mut created = 0;
        for index in 0..self.cache.len() {
            let (Some(entity), Some(name), Some(script)) = (
                self.cache.entity(index),
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Script),
            ) else {
                continue;
            };
            let prefab = pools
                .names
                .scene_of_handle(name)
                .is_some_and(|scene| scenes.is_prefab(scene));
            if prefab {
                continue;
            }
            let Some(script) = pools.scripts.resolve_mut(script) else {
                continue;
            };

            release_instances(&mut self.host, script);
            let instances = instantiate(&mut self.host, &mut self.failed, entity, script);
            created += instances.len();
            for (class, object) in instances {
                match awake(&mut self.host, &class, object, entity) {
                    Ok(_) => {}
                    Err(fault @ ScriptFault::Exception { .. }) => {
                        tracing::warn!("entity {}: {}", entity, fault);
                    }
                    Err(fault) => {
                        tracing::error!("start aborted at entity {}: {}", entity, fault);
                        return created;
                    }
                }
            }
        }
        tracing::info!("started {} script instance(s)", created);
        created
    }

    /// Drop every instance and pin, then release them in the host.
    pub fn release_all(&mut self, pools: &mut ComponentPools) {
        for (_, script) in pools.scripts.iter_mut() {
            release_instances(&mut self.host, script);
        }
        self.failed.clear();
        self.host.collect_garbage();
    }

    /// Compile and reload user logic. On a failed build nothing is touched.
    /// Instances are recreated on the next update, with `Awake` then `Start`.
    pub fn hot_reload(
        &mut self,
        pools: &mut ComponentPools,
        bridge: &ScriptBridge,
    ) -> Result<usize, ScriptError> {
        if let Err(err) = bridge.compile() {
            tracing::error!("hot reload aborted, keeping loaded scripts: {}", err);
            return Err(err);
        }
        self.release_all(pools);
        bridge.reload(&mut self.host)
    }

    fn update_pass(&mut self, ctx: &mut SystemContext<'_>, skipped: &mut HashSet<ScriptKey>) {
        for index in 0..self.cache.len() {
            let (Some(entity), Some(name), Some(handle)) = (
                self.cache.entity(index),
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Script),
            ) else {
                continue;
            };
            if !ctx.passes_filter(name) {
                continue;
            }
            let Some(script) = ctx.pools.scripts.resolve_mut(handle) else {
                continue;
            };

            for (class, object) in instantiate(&mut self.host, &mut self.failed, entity, script) {
                match awake(&mut self.host, &class, object, entity) {
                    Ok(_) => {}
                    Err(fault @ ScriptFault::Exception { .. }) => {
                        tracing::warn!("entity {}: {}", entity, fault);
                        skipped.insert((entity, class));
                    }
                    Err(fault) => {
                        tracing::error!("update aborted at entity {}: {}", entity, fault);
                        return;
                    }
                }
            }

            let mut stale = false;
            for entry in script.scripts.iter().filter(|entry| entry.enabled) {
                let key = (entity, entry.name.clone());
                if skipped.contains(&key) {
                    continue;
                }
                let Some(instance) = script.instances.get_mut(&entry.name) else {
                    continue;
                };
                let method = if instance.started {
                    "Update"
                } else {
                    // Exactly once, even if Start throws.
                    instance.started = true;
                    "Start"
                };
                let outcome = self
                    .host
                    .invoke(&entry.name, method, Some(instance.object), &[]);
                if method == "Start" {
                    skipped.insert(key.clone());
                }
                match outcome {
                    Ok(_) => {}
                    Err(fault @ ScriptFault::Exception { .. }) => {
                        tracing::warn!("entity {}: {}", entity, fault);
                        skipped.insert(key);
                    }
                    Err(ScriptFault::StaleHandle) => {
                        stale = true;
                        break;
                    }
                    Err(fault) => {
                        tracing::error!("update aborted at entity {}: {}", entity, fault);
                        return;
                    }
                }
            }
            if stale {
                tracing::warn!(
                    "entity {}: script instances outlived their domain; rebuilding",
                    entity
                );
                release_instances(&mut self.host, script);
                for entry in &script.scripts {
                    skipped.insert((entity, entry.name.clone()));
                }
            }
        }
    }

    fn late_update_pass(&mut self, ctx: &mut SystemContext<'_>, skipped: &HashSet<ScriptKey>) {
        for index in 0..self.cache.len() {
            let (Some(entity), Some(name), Some(handle)) = (
                self.cache.entity(index),
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Script),
            ) else {
                continue;
            };
            if !ctx.passes_filter(name) {
                continue;
            }
            let Some(script) = ctx.pools.scripts.resolve(handle) else {
                continue;
            };

            for entry in script.scripts.iter().filter(|entry| entry.enabled) {
                if skipped.contains(&(entity, entry.name.clone())) {
                    continue;
                }
                let Some(instance) = script.instances.get(&entry.name).filter(|i| i.started)
                else {
                    continue;
                };
                match self
                    .host
                    .invoke(&entry.name, "LateUpdate", Some(instance.object), &[])
                {
                    Ok(_) => {}
                    Err(fault @ ScriptFault::Exception { .. }) => {
                        tracing::warn!("entity {}: {}", entity, fault);
                    }
                    // Rebuilt by the next update pass.
                    Err(ScriptFault::StaleHandle) => break,
                    Err(fault) => {
                        tracing::error!("late update aborted at entity {}: {}", entity, fault);
                        return;
                    }
                }
            }
        }
    }
}

/// Create instances for declared scripts that have none yet.
fn instantiate<H: ManagedHost>(
    host: &mut H,
    failed: &mut HashSet<ScriptKey>,
    entity: EntityId,
    script: &mut Script,
) -> Vec<(String, ObjectHandle)> {
    let mut created = Vec::new();
    for entry in &script.scripts {
        if script.instances.contains_key(&entry.name) {
            continue;
        }
        let key = (entity, entry.name.clone());
        if failed.contains(&key) {
            continue;
        }
        let assembly = host.logic_assembly().to_string();
        let object = match host.create_instance(&assembly, &entry.name) {
            Ok(object) => object,
            Err(err) => {
                tracing::error!("entity {}: cannot create script '{}': {}", entity, entry.name, err);
                failed.insert(key);
                continue;
            }
        };
        if let Some(pin) = host.pin(object) {
            script.pins.push(pin);
        }
        inject_fields(host, object, entry);
        script.instances.insert(
            entry.name.clone(),
            ScriptInstance {
                object,
                started: false,
            },
        );
        created.push((entry.name.clone(), object));
    }
    created
}

/// Write stored overrides into the instance's declared public fields.
fn inject_fields<H: ManagedHost>(host: &mut H, object: ObjectHandle, entry: &ScriptEntry) {
    if entry.fields.is_empty() {
        return;
    }
    for field in host.fields(&entry.name) {
        let Some(raw) = entry.fields.get(&field.name) else {
            continue;
        };
        let Some(value) = decode_override(field.kind, raw) else {
            tracing::debug!("{}.{}: undecodable override '{}'", entry.name, field.name, raw);
            continue;
        };
        if let Err(fault) = host.set_field(object, &field.name, value) {
            tracing::warn!("{}.{}: {}", entry.name, field.name, fault);
        }
    }
}

fn awake<H: ManagedHost>(
    host: &mut H,
    class: &str,
    object: ObjectHandle,
    entity: EntityId,
) -> Result<Invocation, ScriptFault> {
    host.invoke(class, "Awake", Some(object), &[ScriptValue::Entity(entity)])
}

fn release_instances<H: ManagedHost>(host: &mut H, script: &mut Script) {
    for pin in script.pins.drain(..) {
        host.release(pin);
    }
    script.instances.clear();
}

impl<H: ManagedHost + 'static> System for LogicSystem<H> {
    fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    fn cache(&self) -> &SystemCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SystemCache {
        &mut self.cache
    }

    fn deregister(&mut self, entity: EntityId, pools: &mut ComponentPools) -> bool {
        if let Some(script) = pools.scripts.find_mut(entity) {
            let pinned = script.pins.len();
            release_instances(&mut self.host, script);
            if pinned > 0 {
                self.host.collect_garbage();
            }
        }
        self.failed.retain(|(owner, _)| *owner != entity);
        self.cache.remove(entity).is_some()
    }

    fn on_start(&mut self, pools: &mut ComponentPools, scenes: &SceneRegistry) {
        self.start_logic(pools, scenes);
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        if ctx.scenes.is_prefab(ctx.scene) {
            return;
        }
        let mut skipped = HashSet::new();
        self.update_pass(ctx, &mut skipped);
        self.late_update_pass(ctx, &skipped);

        let applied = self.queue.apply(ctx.pools);
        if applied > 0 {
            tracing::trace!("applied {} script command(s)", applied);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptConfig;
    use crate::fake_host::FakeHost;
    use crate::natives::ScriptCommand;
    use crate::value::{encode_override, FieldDescriptor, FieldKind};
    use std::time::Duration;
    use tether_core::config::EngineConfig;
    use tether_core::ecs::components::{Sprite, Transform};
    use tether_core::ecs::{GameState, World};
    use tether_core::glam::Vec2;

    const ALL: &[&str] = &["Awake", "Start", "Update", "LateUpdate"];
    const FRAME: Duration = Duration::from_millis(100);

    fn world_with(host: FakeHost) -> World {
        let config = EngineConfig {
            max_entities: 16,
            fixed_tick_hz: 10,
            ..EngineConfig::default()
        };
        let mut world = World::new(&config);
        world.load_scene("level", false);
        world.load_scene("prefabs", true);
        world
            .register_system(LogicSystem::new(host, CommandQueue::new()))
            .unwrap();
        world
    }

    fn scripted(world: &mut World, scene: &str, scripts: &[&str]) -> EntityId {
        let entity = world.create_entity(scene).unwrap();
        let script = world.add_component::<Script>(entity).unwrap();
        for name in scripts {
            script.add_script(*name);
        }
        entity
    }

    fn logic(world: &World) -> &LogicSystem<FakeHost> {
        world.system::<LogicSystem<FakeHost>>().unwrap()
    }

    fn host_mut(world: &mut World) -> &mut FakeHost {
        world
            .system_mut::<LogicSystem<FakeHost>>()
            .unwrap()
            .host_mut()
    }

    fn take_calls(world: &mut World) -> Vec<String> {
        std::mem::take(&mut host_mut(world).calls)
    }

    fn start_logic(world: &mut World) -> usize {
        let mut scenes = SceneRegistry::new();
        scenes.load_scene("level", false);
        scenes.load_scene("prefabs", true);
        world
            .with_system(|logic: &mut LogicSystem<FakeHost>, pools| {
                logic.start_logic(pools, &scenes)
            })
            .unwrap()
    }

    #[test]
    fn awake_then_start_once_then_update() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);

        assert_eq!(start_logic(&mut world), 1);
        assert_eq!(take_calls(&mut world), ["0:Foo.Awake"]);
        assert_eq!(
            logic(&world).host().awake_args,
            vec![ScriptValue::Entity(entity)]
        );

        world.set_state(GameState::Running);
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Start"]);

        for _ in 0..2 {
            world.update(FRAME);
            assert_eq!(take_calls(&mut world), ["0:Foo.Update", "0:Foo.LateUpdate"]);
        }
    }

    #[test]
    fn start_state_runs_awake_and_start_in_the_first_frame() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        scripted(&mut world, "level", &["Foo"]);

        world.update(FRAME);
        assert!(take_calls(&mut world).is_empty());

        world.set_state(GameState::Start);
        world.update(FRAME);
        assert_eq!(world.state(), GameState::Running);
        assert_eq!(take_calls(&mut world), ["0:Foo.Awake", "0:Foo.Start"]);
    }

    #[test]
    fn late_update_runs_after_every_update() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        scripted(&mut world, "level", &["Foo"]);
        scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        take_calls(&mut world);

        world.update(FRAME);
        assert_eq!(
            take_calls(&mut world),
            [
                "0:Foo.Update",
                "1:Foo.Update",
                "0:Foo.LateUpdate",
                "1:Foo.LateUpdate"
            ]
        );
    }

    #[test]
    fn prefab_scenes_never_run_logic() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        scripted(&mut world, "prefabs", &["Foo"]);

        assert_eq!(start_logic(&mut world), 0);
        world.set_state(GameState::Running);
        world.update(FRAME);
        assert!(take_calls(&mut world).is_empty());
        assert_eq!(logic(&world).host().instance_count(), 0);
    }

    #[test]
    fn scripts_added_after_start_are_created_lazily() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL), ("Bar", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        take_calls(&mut world);

        world
            .component_mut::<Script>(entity)
            .unwrap()
            .add_script("Bar");
        world.update(FRAME);
        assert_eq!(
            take_calls(&mut world),
            ["1:Bar.Awake", "0:Foo.Update", "1:Bar.Start", "0:Foo.LateUpdate"]
        );
        assert_eq!(logic(&world).host().live_pins(), 2);
    }

    #[test]
    fn disabled_scripts_are_awoken_but_not_run() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        world
            .component_mut::<Script>(entity)
            .unwrap()
            .set_enabled("Foo", false);

        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Awake"]);

        world
            .component_mut::<Script>(entity)
            .unwrap()
            .set_enabled("Foo", true);
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Start"]);
    }

    #[test]
    fn exception_skips_only_the_faulting_script() {
        let mut host = FakeHost::with_classes(&[("Foo", ALL), ("Bad", ALL)]);
        host.throw_in("Bad", "Update");
        let mut world = world_with(host);
        scripted(&mut world, "level", &["Bad", "Foo"]);
        scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        take_calls(&mut world);

        world.update(FRAME);
        assert_eq!(
            take_calls(&mut world),
            [
                "0:Bad.Update",
                "1:Foo.Update",
                "2:Foo.Update",
                "1:Foo.LateUpdate",
                "2:Foo.LateUpdate"
            ]
        );
    }

    #[test]
    fn unresolved_methods_abort_the_pass() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        scripted(&mut world, "level", &["Foo"]);
        let second = scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        take_calls(&mut world);
        host_mut(&mut world).unresolved.insert("Foo".to_string());

        world.set_state(GameState::Running);
        world.update(FRAME);
        assert!(take_calls(&mut world).is_empty());
        let script = world.component::<Script>(second).unwrap();
        assert!(!script.instances["Foo"].started);
    }

    #[test]
    fn deleting_an_entity_releases_its_pins() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL), ("Bar", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo", "Bar"]);
        start_logic(&mut world);
        assert_eq!(logic(&world).host().live_pins(), 2);

        assert!(world.delete_entity(entity));
        assert_eq!(logic(&world).host().live_pins(), 0);
        assert!(logic(&world).cache().is_empty());
    }

    #[test]
    fn overrides_are_injected_by_declared_type() {
        let mut host = FakeHost::with_classes(&[("Foo", ALL)]);
        host.fields.insert(
            "Foo".to_string(),
            vec![
                FieldDescriptor {
                    name: "speed".into(),
                    kind: FieldKind::Float,
                },
                FieldDescriptor {
                    name: "label".into(),
                    kind: FieldKind::String,
                },
                FieldDescriptor {
                    name: "count".into(),
                    kind: FieldKind::Int,
                },
            ],
        );
        let mut world = world_with(host);
        let entity = world.create_entity("level").unwrap();
        let entry = world
            .add_component::<Script>(entity)
            .unwrap()
            .add_script("Foo");
        entry.fields.insert(
            "speed".into(),
            encode_override(&ScriptValue::Float(2.5)).unwrap(),
        );
        entry.fields.insert("label".into(), "hero".into());
        entry.fields.insert("count".into(), "***".into());
        entry.fields.insert("unknown".into(), "AAAA".into());

        start_logic(&mut world);
        let assigned: Vec<_> = logic(&world)
            .host()
            .assigned
            .iter()
            .map(|(_, field, value)| (field.clone(), value.clone()))
            .collect();
        assert_eq!(
            assigned,
            vec![
                ("speed".to_string(), ScriptValue::Float(2.5)),
                ("label".to_string(), ScriptValue::Str("hero".into())),
            ]
        );
    }

    #[test]
    fn missing_classes_are_not_retried_until_reload() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        scripted(&mut world, "level", &["Ghost"]);
        assert_eq!(start_logic(&mut world), 0);
        world.set_state(GameState::Running);
        world.update(FRAME);
        world.update(FRAME);
        assert_eq!(logic(&world).failed.len(), 1);
        assert_eq!(logic(&world).host().instance_count(), 0);

        let bridge = ScriptBridge::new(ScriptConfig::default());
        world
            .with_system(|logic: &mut LogicSystem<FakeHost>, pools| logic.hot_reload(pools, &bridge))
            .unwrap()
            .unwrap();
        assert!(logic(&world).failed.is_empty());
    }

    #[test]
    fn hot_reload_recreates_instances() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        world.update(FRAME);
        take_calls(&mut world);

        let bridge = ScriptBridge::new(ScriptConfig::default());
        let loaded = world
            .with_system(|logic: &mut LogicSystem<FakeHost>, pools| logic.hot_reload(pools, &bridge))
            .unwrap()
            .unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(logic(&world).host().reloads, 1);
        assert!(world
            .component::<Script>(entity)
            .unwrap()
            .instances
            .is_empty());

        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Awake", "0:Foo.Start"]);
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Update", "0:Foo.LateUpdate"]);
    }

    #[test]
    fn removing_an_unrelated_component_keeps_script_state() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        world.add_component::<Sprite>(entity).unwrap();
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        world.update(FRAME);
        take_calls(&mut world);

        assert!(world.remove_component::<Sprite>(entity));
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Update", "0:Foo.LateUpdate"]);
        assert_eq!(logic(&world).host().instance_count(), 1);
        assert_eq!(logic(&world).host().live_pins(), 1);
    }

    #[test]
    fn instances_from_an_unloaded_domain_are_rebuilt() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        start_logic(&mut world);
        world.set_state(GameState::Running);
        world.update(FRAME);
        world.update(FRAME);
        take_calls(&mut world);

        // Reload behind the logic system's back.
        let bridge = ScriptBridge::new(ScriptConfig::default());
        bridge.hot_reload(host_mut(&mut world)).unwrap();

        world.update(FRAME);
        assert!(take_calls(&mut world).is_empty());
        assert!(world
            .component::<Script>(entity)
            .unwrap()
            .instances
            .is_empty());

        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Awake", "0:Foo.Start"]);
        world.update(FRAME);
        assert_eq!(take_calls(&mut world), ["0:Foo.Update", "0:Foo.LateUpdate"]);
    }

    #[test]
    fn queued_commands_apply_after_update() {
        let mut world = world_with(FakeHost::with_classes(&[("Foo", ALL)]));
        let entity = scripted(&mut world, "level", &["Foo"]);
        world.set_state(GameState::Running);

        logic(&world).queue().push(ScriptCommand::Translate {
            entity,
            delta: Vec2::new(1.0, 2.0),
        });
        world.update(FRAME);
        assert_eq!(
            world.component::<Transform>(entity).unwrap().position,
            Vec2::new(1.0, 2.0)
        );
        assert!(logic(&world).queue().is_empty());
    }
}
