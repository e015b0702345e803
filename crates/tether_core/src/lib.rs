//! Tether Engine Core
//!
//! Contains the fundamental simulation pieces:
//! - Entity Component System (fixed-capacity pools, registry, systems)
//! - Built-in systems (transform, physics, animation, audio)
//! - Fixed-step frame clock
//! - Engine configuration

pub mod assets;
pub mod config;
pub mod ecs;
pub mod systems;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
