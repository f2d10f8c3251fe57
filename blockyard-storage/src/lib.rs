//! Chunk persistence.
//!
//! Two on-disk formats sit behind one `ChunkSerializer` trait. Both write
//! atomically, both distinguish a chunk that was never saved (`Ok(None)`)
//! from one that is unreadable (`StorageError::Corrupt`).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use blockyard_core::{Chunk, ChunkPos, Registry};
use serde::{Deserialize, Serialize};

pub mod alpha;
mod atomic;
pub mod beta;
mod error;
pub mod level;
pub mod nbt;

pub use alpha::AlphaSerializer;
pub use beta::BetaSerializer;
pub use error::StorageError;
pub use level::{WorldMeta, open_world};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldFormat {
    /// One file per chunk.
    Alpha,
    /// Region files.
    Beta,
}

impl WorldFormat {
    pub fn name(&self) -> &'static str {
        match self {
            WorldFormat::Alpha => "alpha",
            WorldFormat::Beta => "beta",
        }
    }
}

impl fmt::Display for WorldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorldFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(WorldFormat::Alpha),
            "beta" => Ok(WorldFormat::Beta),
            other => Err(format!("unknown world format `{other}`")),
        }
    }
}

#[async_trait]
pub trait ChunkSerializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn format(&self) -> WorldFormat;

    fn root(&self) -> &Path;

    /// Load a chunk. Returns `Ok(None)` if it was never saved.
    async fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>, StorageError>;

    /// Persist a chunk. On return the write is durable.
    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), StorageError>;

    /// Every chunk currently on disk.
    async fn list_chunks(&self) -> Result<Vec<ChunkPos>, StorageError>;
}

/// Builds a serializer for a world directory. Registered by name so the
/// configured serializer can be resolved once at startup.
pub trait SerializerFactory: Send + Sync {
    fn format(&self) -> WorldFormat;

    fn open(&self, root: &Path) -> Arc<dyn ChunkSerializer>;
}

impl SerializerFactory for WorldFormat {
    fn format(&self) -> WorldFormat {
        *self
    }

    fn open(&self, root: &Path) -> Arc<dyn ChunkSerializer> {
        match self {
            WorldFormat::Alpha => Arc::new(AlphaSerializer::new(root)),
            WorldFormat::Beta => Arc::new(BetaSerializer::new(root)),
        }
    }
}

pub type SerializerRegistry = Registry<dyn SerializerFactory>;

pub fn default_registry() -> SerializerRegistry {
    let mut registry = SerializerRegistry::new("serializer");
    for format in [WorldFormat::Alpha, WorldFormat::Beta] {
        registry.register(format.name(), Arc::new(format));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!("beta".parse::<WorldFormat>(), Ok(WorldFormat::Beta));
        assert!("gamma".parse::<WorldFormat>().is_err());
        assert_eq!(WorldFormat::Alpha.to_string(), "alpha");
    }

    #[test]
    fn test_registry_opens_serializers() {
        let registry = default_registry();
        let dir = Path::new("/tmp/world");
        let serializer = registry.lookup("beta").unwrap().open(dir);
        assert_eq!(serializer.format(), WorldFormat::Beta);
        assert_eq!(serializer.root(), dir);
        assert!(registry.lookup("mcregion").is_err());
    }
}
