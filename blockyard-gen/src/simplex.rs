//! Octave simplex height field.

use blockyard_core::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, biomes, blocks};
use noise::{Fbm, MultiFractal, NoiseFn, Simplex};

use crate::{GenerationError, GeneratorStage, SEA_LEVEL, StageContext, noise_seed};

const HEIGHT_SALT: u64 = 0x5151;
const TEMPERATURE_SALT: u64 = 0x7e47;

/// Terrain centre line and swing either side of it.
const BASE_HEIGHT: f64 = 64.0;
const AMPLITUDE: f64 = 24.0;

/// Replaces the chunk with a stone height field and assigns biomes by
/// height and a second, slower temperature field.
pub struct SimplexStage;

fn height_noise(seed: u64) -> Fbm<Simplex> {
    Fbm::<Simplex>::new(noise_seed(seed, HEIGHT_SALT))
        .set_octaves(4)
        .set_frequency(0.01)
        .set_persistence(0.5)
}

fn temperature_noise(seed: u64) -> Fbm<Simplex> {
    Fbm::<Simplex>::new(noise_seed(seed, TEMPERATURE_SALT))
        .set_octaves(2)
        .set_frequency(0.003)
}

fn biome_for(height: usize, temperature: f64) -> u8 {
    if height + 2 < SEA_LEVEL {
        biomes::OCEAN
    } else if temperature < -0.35 {
        biomes::TUNDRA
    } else if temperature < -0.15 {
        biomes::TAIGA
    } else if temperature > 0.4 {
        biomes::DESERT
    } else {
        biomes::PLAINS
    }
}

impl GeneratorStage for SimplexStage {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        let height = height_noise(ctx.seed);
        let temperature = temperature_noise(ctx.seed);
        let origin_x = ctx.pos.x as f64 * CHUNK_WIDTH as f64;
        let origin_z = ctx.pos.z as f64 * CHUNK_DEPTH as f64;

        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let point = [origin_x + x as f64, origin_z + z as f64];
                let sample = height.get(point).clamp(-1.0, 1.0);
                let top = (BASE_HEIGHT + sample * AMPLITUDE)
                    .round()
                    .clamp(4.0, (CHUNK_HEIGHT - 8) as f64) as usize;

                for y in 0..CHUNK_HEIGHT {
                    let id = if y <= top { blocks::STONE } else { blocks::AIR };
                    ctx.chunk.set_block_id(x, y, z, id);
                }
                ctx.chunk.set_biome(x, z, biome_for(top, temperature.get(point)));
            }
        }
        Ok(())
    }
}
