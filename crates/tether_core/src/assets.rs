//! Asset lookup seen from the simulation side.
//!
//! Systems resolve assets by name every frame and skip the effect when a
//! name is unknown; loading itself happens elsewhere.

use serde::{Deserialize, Serialize};

/// Handle to a ready-to-use asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetHandle(u64);

impl AssetHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Image,
    Audio,
    Font,
    Video,
}

pub trait AssetProvider {
    fn lookup(&self, kind: AssetKind, name: &str) -> Option<AssetHandle>;

    fn image(&self, name: &str) -> Option<AssetHandle> {
        self.lookup(AssetKind::Image, name)
    }

    fn audio(&self, name: &str) -> Option<AssetHandle> {
        self.lookup(AssetKind::Audio, name)
    }

    fn font(&self, name: &str) -> Option<AssetHandle> {
        self.lookup(AssetKind::Font, name)
    }

    fn video(&self, name: &str) -> Option<AssetHandle> {
        self.lookup(AssetKind::Video, name)
    }
}

/// Provider that knows no assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

impl AssetProvider for NoAssets {
    fn lookup(&self, _kind: AssetKind, _name: &str) -> Option<AssetHandle> {
        None
    }
}
