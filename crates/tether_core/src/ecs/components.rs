//! Built-in component payloads and the pool table that stores them.

use crate::define_component;
use crate::ecs::{ComponentKind, ComponentPool, EntityId, ErasedPool, Layer};
use glam::{Mat3, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    pub name: String,
    pub layer: Layer,
    pub tag: String,
    pub hidden: bool,
    pub is_prefab: bool,
    pub prefab_name: String,
}

impl Default for Name {
    fn default() -> Self {
        Self {
            name: "GameObject".to_string(),
            layer: Layer::DEFAULT,
            tag: String::new(),
            hidden: false,
            is_prefab: false,
            prefab_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec2,
    pub rotation_deg: f32,
    pub scale: Vec2,
    /// World matrix, rebuilt every frame by the transform system.
    #[serde(skip)]
    pub world: Mat3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation_deg: 0.0,
            scale: Vec2::ONE,
            world: Mat3::IDENTITY,
        }
    }
}

impl Transform {
    pub fn local_matrix(&self) -> Mat3 {
        Mat3::from_scale_angle_translation(self.scale, self.rotation_deg.to_radians(), self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprite {
    pub image: String,
    pub colour: [f32; 4],
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            image: String::new(),
            colour: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBody {
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub angular_velocity: f32,
    pub mass: f32,
    pub inverse_mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub force: Vec2,
    pub torque: f32,
    pub is_kinematic: bool,
    pub is_static: bool,
    pub prev_position: Vec2,
    pub direction: Vec2,
    pub prev_direction: Vec2,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            inverse_mass: 1.0,
            linear_damping: 0.99,
            angular_damping: 0.99,
            force: Vec2::ZERO,
            torque: 0.0,
            is_kinematic: false,
            is_static: false,
            prev_position: Vec2::ZERO,
            direction: Vec2::ZERO,
            prev_direction: Vec2::ZERO,
        }
    }
}

impl RigidBody {
    /// Set the mass and keep `inverse_mass` in sync. Non-positive masses are
    /// treated as immovable.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
    }

    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Animation {
    pub frame_number: u32,
    pub frames_per_second: u32,
    pub frame_timer: f32,
    pub is_animating: bool,
    pub strip_count: u32,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            frame_number: 0,
            frames_per_second: 0,
            frame_timer: 0.0,
            is_animating: true,
            strip_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioClip {
    pub name: String,
    pub volume: f32,
    pub looping: bool,
    pub play_on_start: bool,
    pub is_bgm: bool,
    pub is_sfx: bool,
    /// Last values pushed to the backend.
    #[serde(skip)]
    pub applied_volume: Option<f32>,
    #[serde(skip)]
    pub applied_looping: Option<bool>,
    #[serde(skip)]
    pub started: bool,
}

impl Default for AudioClip {
    fn default() -> Self {
        Self {
            name: String::new(),
            volume: 1.0,
            looping: false,
            play_on_start: false,
            is_bgm: false,
            is_sfx: false,
            applied_volume: None,
            applied_looping: None,
            started: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audio {
    pub clips: Vec<AudioClip>,
}

/// Managed object reference handed out by a script host. Only meaningful to
/// the host (and domain) that created it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub domain: u32,
    pub index: u32,
}

/// Keeps a managed object alive across garbage collections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PinHandle {
    pub domain: u32,
    pub index: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScriptInstance {
    pub object: ObjectHandle,
    pub started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptEntry {
    pub name: String,
    pub enabled: bool,
    /// Serialized public field overrides (base64 for numbers and bools).
    pub fields: BTreeMap<String, String>,
}

impl Default for ScriptEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            fields: BTreeMap::new(),
        }
    }
}

impl ScriptEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub scripts: Vec<ScriptEntry>,
    #[serde(skip)]
    pub instances: HashMap<String, ScriptInstance>,
    #[serde(skip)]
    pub pins: Vec<PinHandle>,
}

// The runtime side table belongs to the host domain that filled it, so a
// copy only carries the declarative part.
impl Clone for Script {
    fn clone(&self) -> Self {
        Self {
            scripts: self.scripts.clone(),
            instances: HashMap::new(),
            pins: Vec::new(),
        }
    }
}

impl Script {
    pub fn add_script(&mut self, name: impl Into<String>) -> &mut ScriptEntry {
        self.scripts.push(ScriptEntry::new(name));
        let last = self.scripts.len() - 1;
        &mut self.scripts[last]
    }

    pub fn entry(&self, name: &str) -> Option<&ScriptEntry> {
        self.scripts.iter().find(|entry| entry.name == name)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.scripts.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

define_component!(Name, ComponentKind::Name, "Name", names);
define_component!(Transform, ComponentKind::Transform, "Transform", transforms);
define_component!(Sprite, ComponentKind::Sprite, "Sprite", sprites);
define_component!(RigidBody, ComponentKind::RigidBody, "RigidBody", rigid_bodies);
define_component!(Animation, ComponentKind::Animation, "Animation", animations);
define_component!(Audio, ComponentKind::Audio, "Audio", audio);
define_component!(Script, ComponentKind::Script, "Script", scripts);

/// One pool per component kind, all with the same capacity.
pub struct ComponentPools {
    pub names: ComponentPool<Name>,
    pub transforms: ComponentPool<Transform>,
    pub sprites: ComponentPool<Sprite>,
    pub rigid_bodies: ComponentPool<RigidBody>,
    pub animations: ComponentPool<Animation>,
    pub audio: ComponentPool<Audio>,
    pub scripts: ComponentPool<Script>,
}

impl ComponentPools {
    pub fn new(capacity: usize) -> Self {
        Self {
            names: ComponentPool::new(capacity),
            transforms: ComponentPool::new(capacity),
            sprites: ComponentPool::new(capacity),
            rigid_bodies: ComponentPool::new(capacity),
            animations: ComponentPool::new(capacity),
            audio: ComponentPool::new(capacity),
            scripts: ComponentPool::new(capacity),
        }
    }

    pub fn erased(&self, kind: ComponentKind) -> &dyn ErasedPool {
        match kind {
            ComponentKind::Name => &self.names,
            ComponentKind::Transform => &self.transforms,
            ComponentKind::Sprite => &self.sprites,
            ComponentKind::RigidBody => &self.rigid_bodies,
            ComponentKind::Animation => &self.animations,
            ComponentKind::Audio => &self.audio,
            ComponentKind::Script => &self.scripts,
        }
    }

    pub fn erased_mut(&mut self, kind: ComponentKind) -> &mut dyn ErasedPool {
        match kind {
            ComponentKind::Name => &mut self.names,
            ComponentKind::Transform => &mut self.transforms,
            ComponentKind::Sprite => &mut self.sprites,
            ComponentKind::RigidBody => &mut self.rigid_bodies,
            ComponentKind::Animation => &mut self.animations,
            ComponentKind::Audio => &mut self.audio,
            ComponentKind::Script => &mut self.scripts,
        }
    }

    /// Scene tag carried by the entity's `Name` slot.
    pub fn scene_of(&self, entity: EntityId) -> Option<&str> {
        self.names.scene_of(entity)
    }
}
