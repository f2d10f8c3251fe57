use blockyard_core::{CHUNK_DEPTH, CHUNK_WIDTH, blocks};

use crate::{GenerationError, GeneratorStage, StageContext};

/// Seals the bottom of the world: bedrock at y=0, and anything at y=1 that
/// is not stone or bedrock becomes bedrock too.
pub struct SafetyStage;

impl GeneratorStage for SafetyStage {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        ctx.chunk.fill_layer(0, blocks::BEDROCK);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                if !matches!(ctx.chunk.block_id(x, 1, z), blocks::STONE | blocks::BEDROCK) {
                    ctx.chunk.set_block_id(x, 1, z, blocks::BEDROCK);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::{Chunk, ChunkPos};

    #[test]
    fn test_no_void_holes() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_block_id(3, 1, 3, blocks::STONE);
        chunk.set_block_id(4, 1, 4, blocks::STILL_WATER);
        let mut ctx = StageContext { seed: 0, pos: chunk.pos, chunk: &mut chunk, neighbors: None };
        SafetyStage.populate(&mut ctx).unwrap();

        assert!(chunk.blocks().iter().step_by(128).all(|&b| b == blocks::BEDROCK));
        assert_eq!(chunk.block_id(3, 1, 3), blocks::STONE);
        assert_eq!(chunk.block_id(4, 1, 4), blocks::BEDROCK);
        assert_eq!(chunk.block_id(0, 1, 0), blocks::BEDROCK);
    }
}
