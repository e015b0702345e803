use crate::ecs::components::Animation;
use crate::ecs::{ComponentKind, System, SystemCache, SystemContext, SystemDescriptor};
use std::any::Any;

/// Steps sprite-strip animations. Entities whose sprite image is not a known
/// asset are skipped for the frame.
pub struct AnimationSystem {
    descriptor: SystemDescriptor,
    cache: SystemCache,
}

impl AnimationSystem {
    pub const NAME: &'static str = "animation";

    pub fn new() -> Self {
        let descriptor = SystemDescriptor::new(Self::NAME)
            .requires([
                ComponentKind::Name,
                ComponentKind::Sprite,
                ComponentKind::Animation,
            ])
            .only_when_running();
        Self {
            cache: SystemCache::for_descriptor(&descriptor),
            descriptor,
        }
    }
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the frame timer by `elapsed` seconds and derive the frame number.
pub fn advance_animation(animation: &mut Animation, elapsed: f32) {
    if !animation.is_animating {
        animation.frame_timer = 0.0;
        return;
    }
    if animation.frames_per_second == 0 {
        return;
    }
    animation.frame_timer += elapsed;

    let frame_time = 1.0 / animation.frames_per_second as f32;
    let strip_count = animation.strip_count.max(1);
    let strip_time = frame_time * strip_count as f32;
    if animation.frame_timer > strip_time {
        animation.frame_timer = 0.0;
    }
    let frame = (animation.frame_timer / frame_time) as u32;
    animation.frame_number = frame.min(strip_count - 1);
}

impl System for AnimationSystem {
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
        let elapsed = ctx.clock.fixed_dt() * ctx.clock.steps() as f32;
        for index in 0..self.cache.len() {
            let (Some(name), Some(sprite), Some(animation)) = (
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Sprite),
                self.cache.handle(index, ComponentKind::Animation),
            ) else {
                continue;
            };
            if !ctx.passes_filter(name) {
                continue;
            }
            let has_image = ctx
                .pools
                .sprites
                .resolve(sprite)
                .is_some_and(|sprite| ctx.assets.image(&sprite.image).is_some());
            if !has_image {
                continue;
            }
            if let Some(animation) = ctx.pools.animations.resolve_mut(animation) {
                advance_animation(animation, elapsed);
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
