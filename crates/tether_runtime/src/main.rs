//! Tether Engine Runtime
//!
//! Boots a world from a config file, runs a fixed number of frames and
//! reports frame and per-system timings.

mod args;
mod config;

use anyhow::{anyhow, Result};
use args::Args;
use clap::Parser;
use config::{EntityConfig, RuntimeConfig};
use std::time::Duration;
use tether_asset::AssetRegistry;
use tether_core::ecs::components::{Name, Script, Transform};
use tether_core::ecs::{Component, EntityId, GameState, World};
use tether_core::systems::{AnimationSystem, AudioSystem, PhysicsSystem, TransformSystem};
use tether_metrics::FrameTimer;
use tether_script::{CommandQueue, LogicSystem, QuickJsHost, ScriptBridge};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    tracing::info!("Tether Engine v{}", tether_core::VERSION);

    let config = RuntimeConfig::load(args.config.as_deref())?;
    let bridge = ScriptBridge::new(config.scripts.clone());
    let mut world = build_world(&config, &bridge)?;

    let spawned = config
        .entities
        .iter()
        .filter_map(|entry| spawn(&mut world, &config.engine.startup_scene, entry))
        .count();
    tracing::info!("spawned {} of {} entities", spawned, config.entities.len());

    run(&mut world, &bridge, &args);
    Ok(())
}

fn build_world(config: &RuntimeConfig, bridge: &ScriptBridge) -> Result<World> {
    let mut world = World::new(&config.engine);
    if let Some(manifest) = &config.asset_manifest {
        world.set_assets(Box::new(AssetRegistry::from_manifest_file(manifest)?));
    }
    world.load_scene(&config.engine.startup_scene, false);

    world.register_system(TransformSystem::new())?;
    world.register_system(PhysicsSystem::new())?;
    world.register_system(AnimationSystem::new())?;
    world.register_system(AudioSystem::new())?;

    let queue = CommandQueue::new();
    let mut host = QuickJsHost::new(&config.scripts, queue.clone())
        .map_err(|err| anyhow!("failed to start the script host: {err}"))?;
    match bridge.hot_reload(&mut host) {
        Ok(loaded) => tracing::info!("loaded {} script assemblies", loaded),
        Err(err) => tracing::warn!("starting without scripts: {}", err),
    }
    world.register_system(LogicSystem::new(host, queue))?;

    for (handle, system) in world.systems().iter() {
        let descriptor = system.descriptor();
        tracing::debug!(
            "system #{} '{}' requires {:?}",
            handle,
            descriptor.name(),
            descriptor.components()
        );
    }
    Ok(world)
}

fn spawn(world: &mut World, startup_scene: &str, entry: &EntityConfig) -> Option<EntityId> {
    let scene = entry.scene.as_deref().unwrap_or(startup_scene);
    world.load_scene(scene, false);
    let entity = world.create_entity(scene)?;

    if let Some(name) = &entry.name {
        if let Some(component) = world.component_mut::<Name>(entity) {
            component.name = name.clone();
        }
    }
    if let Some(transform) = world.component_mut::<Transform>(entity) {
        transform.position = entry.position;
    }
    attach(world, entity, entry.sprite.as_ref());
    attach(world, entity, entry.animation.as_ref());
    attach(world, entity, entry.rigid_body.as_ref());
    attach(world, entity, entry.audio.as_ref());
    if !entry.scripts.is_empty() {
        if let Some(script) = world.add_component::<Script>(entity) {
            script.scripts = entry.scripts.clone();
        }
    }
    Some(entity)
}

fn attach<T: Component>(world: &mut World, entity: EntityId, value: Option<&T>) {
    let Some(value) = value else {
        return;
    };
    if let Some(slot) = world.add_component::<T>(entity) {
        *slot = value.clone();
    }
}

fn run(world: &mut World, bridge: &ScriptBridge, args: &Args) {
    let frame = Duration::from_secs_f32(world.clock().fixed_dt());
    let reload_at = args.reload.then_some(args.frames / 2);
    let mut timer = FrameTimer::new(120);

    world.set_state(GameState::Start);
    for index in 0..args.frames {
        if reload_at == Some(index) {
            let reloaded = world.with_system(|logic: &mut LogicSystem<QuickJsHost>, pools| {
                logic.hot_reload(pools, bridge)
            });
            match reloaded {
                Some(Ok(loaded)) => tracing::info!("hot reload loaded {} assemblies", loaded),
                Some(Err(err)) => tracing::error!("hot reload failed: {}", err),
                None => tracing::error!("hot reload skipped: no logic system"),
            }
        }

        timer.begin();
        world.update(frame);
        timer.end();

        if let Some(audio) = world.system_mut::<AudioSystem>() {
            for command in audio.take_commands() {
                tracing::debug!("audio: {:?}", command);
            }
        }
    }
    world.set_state(GameState::Terminate);

    let stats = timer.stats();
    tracing::info!(
        "ran {} frames: {:.1} fps, {:.3} ms/frame ({:.3}..{:.3} ms)",
        timer.frames(),
        stats.fps,
        stats.average.as_secs_f64() * 1000.0,
        stats.fastest.as_secs_f64() * 1000.0,
        stats.slowest.as_secs_f64() * 1000.0
    );
    for timing in world.profiler().report() {
        tracing::info!(
            "  {:<12} {:>8.3} ms avg ({:.1}%)",
            timing.name,
            timing.average.as_secs_f64() * 1000.0,
            timing.share
        );
    }
}
