use blockyard_core::{BlockId, CHUNK_DEPTH, CHUNK_WIDTH, blocks};
use rand::Rng;

use crate::{GenerationError, GeneratorStage, StageContext, chunk_rng};

const ORE_SALT: u64 = 0x04e5;

struct Vein {
    ore: BlockId,
    /// Veins attempted per chunk.
    count: u32,
    size: u32,
    min_y: usize,
    max_y: usize,
}

const VEINS: &[Vein] = &[
    Vein { ore: blocks::COAL_ORE, count: 20, size: 12, min_y: 5, max_y: 110 },
    Vein { ore: blocks::IRON_ORE, count: 14, size: 8, min_y: 5, max_y: 64 },
    Vein { ore: blocks::GOLD_ORE, count: 3, size: 6, min_y: 5, max_y: 32 },
    Vein { ore: blocks::REDSTONE_ORE, count: 6, size: 6, min_y: 5, max_y: 16 },
    Vein { ore: blocks::LAPIS_ORE, count: 2, size: 5, min_y: 10, max_y: 30 },
    Vein { ore: blocks::DIAMOND_ORE, count: 1, size: 5, min_y: 5, max_y: 16 },
];

/// Scatters ore veins through stone. Each vein is a short random walk.
pub struct OresStage;

impl GeneratorStage for OresStage {
    fn name(&self) -> &'static str {
        "ores"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        let mut rng = chunk_rng(ctx.seed, ctx.pos, ORE_SALT);
        for vein in VEINS {
            for _ in 0..vein.count {
                let mut x = rng.gen_range(0..CHUNK_WIDTH as i32);
                let mut y = rng.gen_range(vein.min_y as i32..=vein.max_y as i32);
                let mut z = rng.gen_range(0..CHUNK_DEPTH as i32);
                for _ in 0..vein.size {
                    let (ux, uy, uz) = (x as usize, y as usize, z as usize);
                    if ctx.chunk.block_id(ux, uy, uz) == blocks::STONE {
                        ctx.chunk.set_block_id(ux, uy, uz, vein.ore);
                    }
                    x = (x + rng.gen_range(-1..=1)).clamp(0, CHUNK_WIDTH as i32 - 1);
                    y = (y + rng.gen_range(-1..=1)).clamp(vein.min_y as i32, vein.max_y as i32);
                    z = (z + rng.gen_range(-1..=1)).clamp(0, CHUNK_DEPTH as i32 - 1);
                }
            }
        }
        Ok(())
    }
}
