use crate::ecs::components::{RigidBody, Transform};
use crate::ecs::{ComponentKind, System, SystemCache, SystemContext, SystemDescriptor};
use glam::Vec2;
use std::any::Any;

/// Semi-implicit Euler integration of rigid bodies, once per fixed step.
pub struct PhysicsSystem {
    descriptor: SystemDescriptor,
    cache: SystemCache,
}

impl PhysicsSystem {
    pub const NAME: &'static str = "physics";

    pub fn new() -> Self {
        let descriptor = SystemDescriptor::new(Self::NAME)
            .requires([
                ComponentKind::Name,
                ComponentKind::Transform,
                ComponentKind::RigidBody,
            ])
            .only_when_running();
        Self {
            cache: SystemCache::for_descriptor(&descriptor),
            descriptor,
        }
    }
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance one body by `dt`. Static and kinematic bodies are left alone.
pub fn integrate_body(body: &mut RigidBody, transform: &mut Transform, dt: f32) {
    if body.is_static || body.is_kinematic {
        return;
    }
    let acceleration = body.acceleration + body.force * body.inverse_mass;
    body.velocity += acceleration * dt;
    body.velocity *= body.linear_damping;

    let angular_acceleration = body.torque * body.inverse_mass;
    body.angular_velocity += angular_acceleration * dt;
    body.angular_velocity *= body.angular_damping;

    body.prev_position = transform.position;
    transform.position += body.velocity * dt;
    transform.rotation_deg += body.angular_velocity * dt;

    body.force = Vec2::ZERO;
    body.torque = 0.0;

    body.direction = transform.position - body.prev_position;
    if body.direction != Vec2::ZERO {
        body.prev_direction = body.direction;
    }
}

impl System for PhysicsSystem {
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
        let dt = ctx.clock.fixed_dt();
        for _ in 0..ctx.clock.steps() {
            for index in 0..self.cache.len() {
                let (Some(name), Some(transform), Some(body)) = (
                    self.cache.handle(index, ComponentKind::Name),
                    self.cache.handle(index, ComponentKind::Transform),
                    self.cache.handle(index, ComponentKind::RigidBody),
                ) else {
                    continue;
                };
                if !ctx.passes_filter(name) {
                    continue;
                }
                let (Some(body), Some(transform)) = (
                    ctx.pools.rigid_bodies.resolve_mut(body),
                    ctx.pools.transforms.resolve_mut(transform),
                ) else {
                    continue;
                };
                integrate_body(body, transform, dt);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::GameState;
    use crate::systems::test_support;
    use std::time::Duration;

    #[test]
    fn integrates_velocity_with_damping() {
        let mut body = RigidBody {
            velocity: Vec2::new(10.0, 0.0),
            linear_damping: 1.0,
            ..RigidBody::default()
        };
        let mut transform = Transform::default();
        integrate_body(&mut body, &mut transform, 0.5);
        assert_eq!(transform.position, Vec2::new(5.0, 0.0));
        assert_eq!(body.prev_position, Vec2::ZERO);
        assert_eq!(body.direction, Vec2::new(5.0, 0.0));
        assert_eq!(body.prev_direction, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn force_is_consumed_each_step() {
        let mut body = RigidBody {
            linear_damping: 1.0,
            ..RigidBody::default()
        };
        body.set_mass(2.0);
        body.apply_force(Vec2::new(4.0, 0.0));
        let mut transform = Transform::default();
        integrate_body(&mut body, &mut transform, 1.0);
        assert_eq!(body.velocity, Vec2::new(2.0, 0.0));
        assert_eq!(body.force, Vec2::ZERO);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut body = RigidBody {
            velocity: Vec2::ONE,
            is_static: true,
            ..RigidBody::default()
        };
        let mut transform = Transform::default();
        integrate_body(&mut body, &mut transform, 1.0);
        assert_eq!(transform.position, Vec2::ZERO);
    }

    #[test]
    fn runs_once_per_fixed_step_only_while_running() {
        let mut world = test_support::world();
        world.register_system(PhysicsSystem::new()).unwrap();
        let entity = world.create_entity("level").unwrap();
        {
            let body = world.add_component::<RigidBody>(entity).unwrap();
            body.velocity = Vec2::new(1.0, 0.0);
            body.linear_damping = 1.0;
        }

        world.update(Duration::from_millis(250));
        assert_eq!(world.component::<Transform>(entity).unwrap().position, Vec2::ZERO);

        world.set_state(GameState::Running);
        // 10 Hz: 50ms carried over plus 300ms is three whole steps.
        world.update(Duration::from_millis(300));
        let x = world.component::<Transform>(entity).unwrap().position.x;
        assert!((x - 0.3).abs() < 1e-5, "x = {x}");
    }
}
