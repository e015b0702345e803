//! Tether Asset Registry
//!
//! Name → handle lookup for images, audio clips, fonts and videos. Decoding
//! the files is the job of the backends; the simulation only needs to know
//! whether a name resolves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use tether_core::assets::{AssetHandle, AssetKind, AssetProvider};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid asset manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Asset names grouped by kind, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub images: Vec<String>,
    pub audio: Vec<String>,
    pub fonts: Vec<String>,
    pub videos: Vec<String>,
}

#[derive(Debug)]
pub struct AssetRegistry {
    next_id: u64,
    names: HashMap<(AssetKind, String), AssetHandle>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            names: HashMap::new(),
        }
    }

    /// Register `name`; registering the same name twice returns the same handle.
    pub fn register(&mut self, kind: AssetKind, name: impl Into<String>) -> AssetHandle {
        let key = (kind, name.into());
        if let Some(handle) = self.names.get(&key) {
            return *handle;
        }
        let handle = AssetHandle::new(self.next_id);
        self.next_id += 1;
        tracing::debug!("registered {:?} asset '{}' as {}", kind, key.1, handle.id());
        self.names.insert(key, handle);
        handle
    }

    pub fn unregister(&mut self, kind: AssetKind, name: &str) -> Option<AssetHandle> {
        self.names.remove(&(kind, name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn register_manifest(&mut self, manifest: &AssetManifest) {
        let groups = [
            (AssetKind::Image, &manifest.images),
            (AssetKind::Audio, &manifest.audio),
            (AssetKind::Font, &manifest.fonts),
            (AssetKind::Video, &manifest.videos),
        ];
        for (kind, names) in groups {
            for name in names {
                self.register(kind, name.as_str());
            }
        }
    }

    /// Build a registry from a JSON manifest file.
    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: AssetManifest =
            serde_json::from_str(&text).map_err(|source| AssetError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let mut registry = Self::new();
        registry.register_manifest(&manifest);
        tracing::info!("loaded {} assets from {}", registry.len(), path.display());
        Ok(registry)
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetProvider for AssetRegistry {
    fn lookup(&self, kind: AssetKind, name: &str) -> Option<AssetHandle> {
        self.names.get(&(kind, name.to_string())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn register_is_idempotent_per_kind() {
        let mut registry = AssetRegistry::new();
        let a = registry.register(AssetKind::Image, "hero.png");
        let b = registry.register(AssetKind::Image, "hero.png");
        let c = registry.register(AssetKind::Audio, "hero.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn provider_lookups_by_kind() {
        let mut registry = AssetRegistry::new();
        let handle = registry.register(AssetKind::Audio, "theme");
        assert_eq!(registry.audio("theme"), Some(handle));
        assert_eq!(registry.image("theme"), None);

        assert_eq!(registry.unregister(AssetKind::Audio, "theme"), Some(handle));
        assert_eq!(registry.audio("theme"), None);
    }

    #[test]
    fn manifest_file_registers_every_group() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "images": ["a.png", "b.png"], "audio": ["theme"], "fonts": ["mono"] }}"#
        )
        .unwrap();
        let registry = AssetRegistry::from_manifest_file(file.path()).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.image("b.png").is_some());
        assert!(registry.font("mono").is_some());
        assert!(registry.video("intro").is_none());
    }

    #[test]
    fn bad_manifest_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = AssetRegistry::from_manifest_file(file.path()).unwrap_err();
        assert!(matches!(err, AssetError::Parse { .. }));
    }
}
