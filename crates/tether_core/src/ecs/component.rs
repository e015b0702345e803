// component.rs - Component kinds, signatures and the typed pool accessor
//
// Every component type lives in its own fixed-capacity pool inside
// `ComponentPools`. A `Signature` records which kinds an entity owns and
// is what systems match against when entities are (de)registered.

use crate::ecs::{ComponentPool, ComponentPools};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of component kinds known to the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ComponentKind {
    Name = 0,
    Transform = 1,
    Sprite = 2,
    RigidBody = 3,
    Animation = 4,
    Audio = 5,
    Script = 6,
}

impl ComponentKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ComponentKind; Self::COUNT] = [
        ComponentKind::Name,
        ComponentKind::Transform,
        ComponentKind::Sprite,
        ComponentKind::RigidBody,
        ComponentKind::Animation,
        ComponentKind::Audio,
        ComponentKind::Script,
    ];

    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Name => "Name",
            ComponentKind::Transform => "Transform",
            ComponentKind::Sprite => "Sprite",
            ComponentKind::RigidBody => "RigidBody",
            ComponentKind::Animation => "Animation",
            ComponentKind::Audio => "Audio",
            ComponentKind::Script => "Script",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitset with one bit per [`ComponentKind`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(u32);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    pub fn of(kinds: &[ComponentKind]) -> Self {
        let mut signature = Self::EMPTY;
        for kind in kinds {
            signature.set(*kind);
        }
        signature
    }

    #[inline]
    pub fn set(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    #[inline]
    pub fn reset(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    #[inline]
    pub fn test(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// True when every bit of `other` is also set here.
    #[inline]
    pub fn contains(self, other: Signature) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .filter(move |kind| self.test(*kind))
    }
}

/// Stable reference to a pool slot.
///
/// The generation is bumped whenever the slot is released, so a handle taken
/// before a delete no longer resolves afterwards even if the slot is reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ComponentHandle {
    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Component types stored in [`ComponentPools`].
///
/// `Default` doubles as the reset value handed out when a slot is assigned.
pub trait Component: Default + Clone + 'static {
    const KIND: ComponentKind;

    /// Human-readable name for diagnostics.
    const NAME: &'static str;

    fn pool(pools: &ComponentPools) -> &ComponentPool<Self>;

    fn pool_mut(pools: &mut ComponentPools) -> &mut ComponentPool<Self>;
}

/// Helper macro to implement [`Component`] for a type stored in a named
/// field of `ComponentPools`.
///
/// # Example
/// ```ignore
/// define_component!(Sprite, ComponentKind::Sprite, "Sprite", sprites);
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $kind:expr, $name:expr, $field:ident) => {
        impl $crate::ecs::Component for $ty {
            const KIND: $crate::ecs::ComponentKind = $kind;
            const NAME: &'static str = $name;

            #[inline]
            fn pool(pools: &$crate::ecs::ComponentPools) -> &$crate::ecs::ComponentPool<Self> {
                &pools.$field
            }

            #[inline]
            fn pool_mut(
                pools: &mut $crate::ecs::ComponentPools,
            ) -> &mut $crate::ecs::ComponentPool<Self> {
                &mut pools.$field
            }
        }
    };
}
