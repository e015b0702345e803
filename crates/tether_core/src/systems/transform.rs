use crate::ecs::{
    ComponentKind, ComponentPools, EntityId, Hierarchy, System, SystemCache, SystemContext,
    SystemDescriptor,
};
use glam::Mat3;
use std::any::Any;

/// Rebuilds world matrices, composing each transform with its parent chain.
pub struct TransformSystem {
    descriptor: SystemDescriptor,
    cache: SystemCache,
}

impl TransformSystem {
    pub const NAME: &'static str = "transform";

    pub fn new() -> Self {
        let descriptor = SystemDescriptor::new(Self::NAME)
            .requires([ComponentKind::Name, ComponentKind::Transform]);
        Self {
            cache: SystemCache::for_descriptor(&descriptor),
            descriptor,
        }
    }
}

impl Default for TransformSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Local matrix of `entity` multiplied by every ancestor's local matrix.
/// Ancestors without a transform end the chain.
pub fn world_matrix(pools: &ComponentPools, hierarchy: &Hierarchy, entity: EntityId) -> Option<Mat3> {
    let mut matrix = pools.transforms.find(entity)?.local_matrix();
    let mut current = hierarchy.parent(entity);
    while let Some(parent) = current {
        let Some(transform) = pools.transforms.find(parent) else {
            break;
        };
        matrix = transform.local_matrix() * matrix;
        current = hierarchy.parent(parent);
    }
    Some(matrix)
}

impl System for TransformSystem {
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
            let (Some(entity), Some(name), Some(handle)) = (
                self.cache.entity(index),
                self.cache.handle(index, ComponentKind::Name),
                self.cache.handle(index, ComponentKind::Transform),
            ) else {
                continue;
            };
            if !ctx.passes_filter(name) {
                continue;
            }
            let Some(world) = world_matrix(&*ctx.pools, ctx.hierarchy, entity) else {
                continue;
            };
            if let Some(transform) = ctx.pools.transforms.resolve_mut(handle) {
                transform.world = world;
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
