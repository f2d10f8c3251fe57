use blockyard_core::{CHUNK_DEPTH, CHUNK_WIDTH, Chunk, biomes, blocks};

use crate::{GenerationError, GeneratorStage, SEA_LEVEL, StageContext};

fn is_water(id: u8) -> bool {
    matches!(id, blocks::WATER | blocks::STILL_WATER)
}

/// Floods every air cell below sea level that is open to the sky.
pub struct WatertableStage;

impl GeneratorStage for WatertableStage {
    fn name(&self) -> &'static str {
        "watertable"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                for y in (0..SEA_LEVEL).rev() {
                    if ctx.chunk.block_id(x, y, z) != blocks::AIR {
                        break;
                    }
                    ctx.chunk.set_block_id(x, y, z, blocks::STILL_WATER);
                }
            }
        }
        Ok(())
    }
}

/// Sand along shorelines, gravel on the sea floor.
pub struct BeachesStage;

const SHORE_LOW: usize = 58;
const SHORE_HIGH: usize = 64;

fn water_near(chunk: &Chunk, x: usize, z: usize) -> bool {
    let xs = x.saturating_sub(1)..=(x + 1).min(CHUNK_WIDTH - 1);
    xs.into_iter().any(|nx| {
        let zs = z.saturating_sub(1)..=(z + 1).min(CHUNK_DEPTH - 1);
        zs.into_iter().any(|nz| is_water(chunk.block_id(nx, SEA_LEVEL - 1, nz)))
    })
}

impl GeneratorStage for BeachesStage {
    fn name(&self) -> &'static str {
        "beaches"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let chunk = &mut *ctx.chunk;
                let Some(top) = chunk.top_matching(x, z, |id| id != blocks::AIR && !is_water(id))
                else {
                    continue;
                };
                let ground = chunk.block_id(x, top, z);
                if !matches!(ground, blocks::STONE | blocks::DIRT | blocks::GRASS) {
                    continue;
                }

                if (SHORE_LOW..=SHORE_HIGH).contains(&top) && water_near(chunk, x, z) {
                    for y in top.saturating_sub(1)..=top {
                        chunk.set_block_id(x, y, z, blocks::SAND);
                    }
                    chunk.set_biome(x, z, biomes::BEACH);
                } else if top < SHORE_LOW && is_water(chunk.block_id(x, top + 1, z)) {
                    chunk.set_block_id(x, top, z, blocks::GRAVEL);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::ChunkPos;

    /// Stone up to `low` on the west half and up to `high` on the east half.
    fn terraced(low: usize, high: usize) -> Chunk {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        for x in 0..CHUNK_WIDTH {
            let top = if x < 8 { low } else { high };
            for z in 0..CHUNK_DEPTH {
                for y in 0..=top {
                    chunk.set_block_id(x, y, z, blocks::STONE);
                }
            }
        }
        chunk
    }

    fn apply(stage: &dyn GeneratorStage, chunk: &mut Chunk) {
        let pos = chunk.pos;
        let mut ctx = StageContext { seed: 0, pos, chunk, neighbors: None };
        stage.populate(&mut ctx).unwrap();
    }

    #[test]
    fn test_watertable_fills_to_sea_level() {
        let mut chunk = terraced(40, 70);
        apply(&WatertableStage, &mut chunk);

        assert_eq!(chunk.block_id(2, 41, 2), blocks::STILL_WATER);
        assert_eq!(chunk.block_id(2, SEA_LEVEL - 1, 2), blocks::STILL_WATER);
        assert_eq!(chunk.block_id(2, SEA_LEVEL, 2), blocks::AIR);
        assert_eq!(chunk.block_id(12, 69, 12), blocks::STONE);
        assert_eq!(chunk.block_id(12, 71, 12), blocks::AIR);
    }

    #[test]
    fn test_watertable_leaves_caves_dry() {
        let mut chunk = terraced(50, 50);
        chunk.set_block_id(3, 30, 3, blocks::AIR);
        apply(&WatertableStage, &mut chunk);
        assert_eq!(chunk.block_id(3, 30, 3), blocks::AIR);
    }

    #[test]
    fn test_beaches_and_sea_floor() {
        let mut chunk = terraced(40, 64);
        apply(&WatertableStage, &mut chunk);
        apply(&BeachesStage, &mut chunk);

        // Shore column next to the flooded half.
        assert_eq!(chunk.block_id(8, 64, 5), blocks::SAND);
        assert_eq!(chunk.block_id(8, 63, 5), blocks::SAND);
        assert_eq!(chunk.biome_at(8, 5), biomes::BEACH);
        // Inland column far from the water keeps its stone.
        assert_eq!(chunk.block_id(15, 64, 5), blocks::STONE);
        // Flooded floor turns to gravel.
        assert_eq!(chunk.block_id(3, 40, 5), blocks::GRAVEL);
    }
}
