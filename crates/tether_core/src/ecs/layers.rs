//! Display layers and their visibility mask.

use crate::ecs::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the engine's seventeen display layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layer(u8);

impl Layer {
    pub const COUNT: usize = 17;
    pub const DEFAULT: Layer = Layer(0);

    /// `Layer::new(0)` is the default layer, `1..=16` are the user layers.
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < Self::COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn bit(self) -> u32 {
        1 << self.0
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("Default")
        } else {
            write!(f, "Layer{}", self.0)
        }
    }
}

pub struct LayerStack {
    names: Vec<String>,
    members: Vec<Vec<EntityId>>,
    visible: u32,
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            names: (0..Layer::COUNT as u8).map(|i| Layer(i).to_string()).collect(),
            members: vec![Vec::new(); Layer::COUNT],
            visible: (1u32 << Layer::COUNT) - 1,
        }
    }

    pub fn name(&self, layer: Layer) -> &str {
        &self.names[layer.index()]
    }

    pub fn rename(&mut self, layer: Layer, name: impl Into<String>) {
        self.names[layer.index()] = name.into();
    }

    pub fn is_visible(&self, layer: Layer) -> bool {
        self.visible & layer.bit() != 0
    }

    pub fn enable(&mut self, layer: Layer) {
        self.visible |= layer.bit();
    }

    pub fn disable(&mut self, layer: Layer) {
        self.visible &= !layer.bit();
    }

    pub fn visible_mask(&self) -> u32 {
        self.visible
    }

    pub fn entities(&self, layer: Layer) -> &[EntityId] {
        &self.members[layer.index()]
    }

    pub fn add_entity(&mut self, layer: Layer, entity: EntityId) {
        let members = &mut self.members[layer.index()];
        if !members.contains(&entity) {
            members.push(entity);
        }
    }

    pub fn remove_entity(&mut self, layer: Layer, entity: EntityId) -> bool {
        let members = &mut self.members[layer.index()];
        match members.iter().position(|member| *member == entity) {
            Some(index) => {
                members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Move `entity` from `from` to `to`. Returns false if it was not in `from`.
    pub fn swap_entity_layer(&mut self, to: Layer, from: Layer, entity: EntityId) -> bool {
        if !self.remove_entity(from, entity) {
            return false;
        }
        self.add_entity(to, entity);
        true
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}
