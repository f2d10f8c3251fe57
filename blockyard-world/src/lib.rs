//! The world coordinator and its geometry cache.
//!
//! `World` is what a session layer talks to: it hands out chunk snapshots,
//! runs dig and build actions through the hook chains and keeps chunks on
//! disk in step with memory.

use blockyard_gen::StageRegistry;
use blockyard_hooks::HookRegistry;
use blockyard_storage::SerializerRegistry;

pub mod cache;
pub mod config;
mod error;
mod world;

pub use cache::{CacheStats, ChunkLease, EntryState, EvictOutcome, FlushReport, GeometryCache};
pub use config::{ConfigError, WorldConfig};
pub use error::WorldError;
pub use world::{ActionReport, MutationRequest, TickReport, World};

/// Every named component a world can be configured with.
pub struct Registries {
    pub stages: StageRegistry,
    pub hooks: HookRegistry,
    pub serializers: SerializerRegistry,
}

impl Registries {
    pub fn builtin() -> Self {
        Self {
            stages: blockyard_gen::default_registry(),
            hooks: blockyard_hooks::default_registry(),
            serializers: blockyard_storage::default_registry(),
        }
    }
}
