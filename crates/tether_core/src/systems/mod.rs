//! Built-in systems.
//!
//! Register them on a [`World`](crate::ecs::World) in the order they should
//! run; a typical frame is logic, physics, transform, animation, audio.

mod animation;
mod audio;
mod physics;
mod transform;

pub use animation::{advance_animation, AnimationSystem};
pub use audio::{AudioAction, AudioCommand, AudioSystem};
pub use physics::{integrate_body, PhysicsSystem};
pub use transform::{world_matrix, TransformSystem};
