use crate::assets::AssetHandle;
use crate::ecs::{ComponentKind, EntityId, System, SystemCache, SystemContext, SystemDescriptor};
use std::any::Any;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioAction {
    SetVolume(f32),
    SetLooping(bool),
    Play,
}

/// Instruction for the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCommand {
    pub entity: EntityId,
    pub clip: String,
    pub sound: AssetHandle,
    pub action: AudioAction,
}

/// Resolves audio clips and queues volume, looping and play-on-start
/// commands. Only changes are queued.
pub struct AudioSystem {
    descriptor: SystemDescriptor,
    cache: SystemCache,
    bgm_volume: f32,
    sfx_volume: f32,
    commands: Vec<AudioCommand>,
}

impl AudioSystem {
    pub const NAME: &'static str = "audio";

    pub fn new() -> Self {
        let descriptor = SystemDescriptor::new(Self::NAME).requires([
            ComponentKind::Name,
            ComponentKind::Transform,
            ComponentKind::Audio,
        ]);
        Self {
            cache: SystemCache::for_descriptor(&descriptor),
            descriptor,
            bgm_volume: 1.0,
            sfx_volume: 1.0,
            commands: Vec::new(),
        }
    }

    pub fn set_bus_volumes(&mut self, bgm: f32, sfx: f32) {
        self.bgm_volume = bgm;
        self.sfx_volume = sfx;
    }

    /// Drain queued commands for the backend.
    pub fn take_commands(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AudioSystem {
    fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    fn cache(&self) -> &SystemCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SystemCache {
        &mut self.cache
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        for index in 0..self.cache.len() {
            let (Some(entity), Some(name), Some(audio)) = (
                self.cache.entity(index),
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Audio),
            ) else {
                continue;
            };
            if !ctx.passes_filter(name) {
                continue;
            }
            let Some(audio) = ctx.pools.audio.resolve_mut(audio) else {
                continue;
            };
            for clip in &mut audio.clips {
                let Some(sound) = ctx.assets.audio(&clip.name) else {
                    continue;
                };
                let mut actions = Vec::new();
                let mut volume = clip.volume;
                if clip.is_bgm {
                    volume *= self.bgm_volume;
                }
                if clip.is_sfx {
                    volume *= self.sfx_volume;
                }
                let volume = volume.max(0.0);
                if clip.applied_volume != Some(volume) {
                    actions.push(AudioAction::SetVolume(volume));
                    clip.applied_volume = Some(volume);
                }
                if clip.applied_looping != Some(clip.looping) {
                    actions.push(AudioAction::SetLooping(clip.looping));
                    clip.applied_looping = Some(clip.looping);
                }
                if clip.play_on_start && !clip.started {
                    actions.push(AudioAction::Play);
                    clip.started = true;
                }
                self.commands
                    .extend(actions.into_iter().map(|action| AudioCommand {
                        entity,
                        clip: clip.name.clone(),
                        sound,
                        action,
                    }));
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
