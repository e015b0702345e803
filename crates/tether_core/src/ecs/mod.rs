//! Entity Component System core types.
//!
//! Components live in fixed-capacity pools owned by the [`Registry`];
//! systems cache generation-checked handles into those pools for every
//! entity whose [`Signature`] matches theirs. The [`World`] ties the
//! registry, the registered systems and the frame clock together.

mod component;
pub mod components;
mod entity;
mod error;
mod hierarchy;
mod layers;
mod pool;
mod registry;
mod scene;
mod system;
mod system_descriptor;
mod system_handle;
mod system_registration_error;
mod system_registry;
mod world;

pub use component::{Component, ComponentHandle, ComponentKind, Signature};
pub use components::ComponentPools;
pub use entity::EntityId;
pub use error::EcsError;
pub use hierarchy::Hierarchy;
pub use layers::{Layer, LayerStack};
pub use pool::{ComponentPool, ErasedPool, SlotMeta};
pub use registry::{DeletedEntity, Registry};
pub use scene::{SceneInfo, SceneRegistry};
pub use system::{System, SystemCache, SystemContext};
pub use system_descriptor::SystemDescriptor;
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub use system_registry::SystemRegistry;
pub use world::{GameState, World};
