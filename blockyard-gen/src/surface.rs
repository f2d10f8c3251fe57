//! Surface dressing: topsoil and snow cover.

use blockyard_core::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, biomes, block_info, blocks};

use crate::{GenerationError, GeneratorStage, StageContext};

const TOPSOIL_DEPTH: usize = 3;

/// Turns the sky-exposed top of every dirt or stone column into grass over
/// three layers of dirt. Deserts get sand instead.
pub struct GrassStage;

impl GeneratorStage for GrassStage {
    fn name(&self) -> &'static str {
        "grass"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let chunk = &mut *ctx.chunk;
                let Some(top) = chunk.top_block(x, z) else { continue };
                if !matches!(chunk.block_id(x, top, z), blocks::DIRT | blocks::STONE) {
                    continue;
                }

                let (cap, under) = if chunk.biome_at(x, z) == biomes::DESERT {
                    (blocks::SAND, blocks::SAND)
                } else {
                    (blocks::GRASS, blocks::DIRT)
                };
                chunk.set_block_id(x, top, z, cap);
                for y in top.saturating_sub(TOPSOIL_DEPTH)..top {
                    if matches!(chunk.block_id(x, y, z), blocks::DIRT | blocks::STONE) {
                        chunk.set_block_id(x, y, z, under);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Cold biomes: a snow layer on solid ground, ice on open water.
pub struct SnowStage;

impl GeneratorStage for SnowStage {
    fn name(&self) -> &'static str {
        "snow"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let chunk = &mut *ctx.chunk;
                if !biomes::is_cold(chunk.biome_at(x, z)) {
                    continue;
                }
                let Some(top) = chunk.top_block(x, z) else { continue };
                match chunk.block_id(x, top, z) {
                    blocks::WATER | blocks::STILL_WATER => {
                        chunk.set_block_id(x, top, z, blocks::ICE)
                    }
                    id if top + 1 < CHUNK_HEIGHT
                        && block_info(id).is_some_and(|b| b.is_opaque()) =>
                    {
                        chunk.set_block_id(x, top + 1, z, blocks::SNOW)
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
