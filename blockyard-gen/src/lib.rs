use std::sync::Arc;

use blockyard_core::{ChunkPos, Registry};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub mod erosion;
pub mod flat;
pub mod ores;
pub mod pipeline;
pub mod safety;
pub mod simplex;
pub mod surface;
pub mod water;

pub use pipeline::{GeneratorPipeline, Neighbors, StageContext};

/// Water fills air up to (but excluding) this y.
pub const SEA_LEVEL: usize = 62;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("stage `{stage}` is missing the `{layer}` layer for chunk {pos}")]
    MissingLayer { stage: &'static str, layer: &'static str, pos: ChunkPos },
    #[error("stage `{stage}` failed for chunk {pos}: {reason}")]
    Failed { stage: &'static str, pos: ChunkPos, reason: String },
}

/// One deterministic step of terrain generation.
///
/// A stage may read whatever earlier stages wrote into the chunk. Stages that
/// look across the chunk border must say so through `needs_neighbors`; the
/// pipeline then hands them the neighbours as produced by the earlier stages.
pub trait GeneratorStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn needs_neighbors(&self) -> bool {
        false
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError>;
}

pub type StageRegistry = Registry<dyn GeneratorStage>;

/// Registry with every built-in stage under its configuration name.
pub fn default_registry() -> StageRegistry {
    let mut registry = StageRegistry::new("generator stage");
    let stages: Vec<Arc<dyn GeneratorStage>> = vec![
        Arc::new(flat::BaseStage),
        Arc::new(simplex::SimplexStage),
        Arc::new(erosion::ErosionStage),
        Arc::new(water::WatertableStage),
        Arc::new(water::BeachesStage),
        Arc::new(surface::GrassStage),
        Arc::new(surface::SnowStage),
        Arc::new(ores::OresStage),
        Arc::new(safety::SafetyStage),
    ];
    for stage in stages {
        registry.register(stage.name(), stage);
    }
    registry
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for a noise source, derived from the world seed and a per-use salt.
pub fn noise_seed(seed: u64, salt: u64) -> u32 {
    mix(seed ^ mix(salt)) as u32
}

/// Per-chunk RNG, a pure function of (seed, pos, salt).
pub fn chunk_rng(seed: u64, pos: ChunkPos, salt: u64) -> ChaCha8Rng {
    let coords = ((pos.x as u32 as u64) << 32) | pos.z as u32 as u64;
    ChaCha8Rng::seed_from_u64(mix(seed ^ mix(coords ^ mix(salt))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_registry_names() {
        let registry = default_registry();
        let names = [
            "base",
            "simplex",
            "erosion",
            "watertable",
            "beaches",
            "grass",
            "snow",
            "ores",
            "safety",
        ];
        for name in names {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_chunk_rng_is_positional() {
        let a: u32 = chunk_rng(42, ChunkPos::new(1, 2), 7).gen_range(0..u32::MAX);
        let b: u32 = chunk_rng(42, ChunkPos::new(1, 2), 7).gen_range(0..u32::MAX);
        let c: u32 = chunk_rng(42, ChunkPos::new(2, 1), 7).gen_range(0..u32::MAX);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
