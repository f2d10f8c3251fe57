use blockyard_core::{CHUNK_DEPTH, CHUNK_WIDTH, biomes, blocks};

use crate::{GenerationError, GeneratorStage, StageContext};

/// Flat world: bedrock floor, stone, a few layers of dirt and a grass top at y=60.
pub struct BaseStage;

impl GeneratorStage for BaseStage {
    fn name(&self) -> &'static str {
        "base"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        let chunk = &mut *ctx.chunk;
        chunk.fill_layer(0, blocks::BEDROCK);
        for y in 1..=55 {
            chunk.fill_layer(y, blocks::STONE);
        }
        for y in 56..=59 {
            chunk.fill_layer(y, blocks::DIRT);
        }
        chunk.fill_layer(60, blocks::GRASS);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                chunk.set_biome(x, z, biomes::PLAINS);
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
    fn test_flat_layers() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        let mut ctx = StageContext { seed: 0, pos: chunk.pos, chunk: &mut chunk, neighbors: None };
        BaseStage.populate(&mut ctx).unwrap();

        assert_eq!(chunk.block_id(3, 0, 9), blocks::BEDROCK);
        assert_eq!(chunk.block_id(3, 30, 9), blocks::STONE);
        assert_eq!(chunk.block_id(3, 57, 9), blocks::DIRT);
        assert_eq!(chunk.block_id(3, 60, 9), blocks::GRASS);
        assert_eq!(chunk.top_block(15, 15), Some(60));
    }
}
