use blockyard_core::{CHUNK_DEPTH, CHUNK_WIDTH, Chunk, blocks};

use crate::{GenerationError, GeneratorStage, StageContext};

const FIELD: usize = CHUNK_WIDTH + 2;

/// Smooths the height field by averaging every column with its four
/// orthogonal neighbours, reading across chunk borders.
pub struct ErosionStage;

fn top(chunk: &Chunk, x: usize, z: usize) -> Option<i32> {
    chunk.top_block(x, z).map(|y| y as i32)
}

/// Heights of the chunk plus a one-column border. Border columns come from
/// the neighbour chunks when present and otherwise repeat the nearest edge.
fn height_field(ctx: &StageContext<'_>) -> Option<[[i32; FIELD]; FIELD]> {
    let chunk = &*ctx.chunk;
    let mut field = [[0i32; FIELD]; FIELD];
    let mut any = false;
    for x in 0..CHUNK_WIDTH {
        for z in 0..CHUNK_DEPTH {
            let h = top(chunk, x, z);
            any |= h.is_some();
            field[x + 1][z + 1] = h.unwrap_or(0);
        }
    }
    if !any {
        return None;
    }

    let last = CHUNK_WIDTH - 1;
    for i in 0..CHUNK_WIDTH {
        let border = |dx: i32, dz: i32, x: usize, z: usize| {
            ctx.neighbors
                .and_then(|n| n.get(dx, dz))
                .and_then(|c| top(c, x, z))
        };
        field[0][i + 1] = border(-1, 0, last, i).unwrap_or(field[1][i + 1]);
        field[FIELD - 1][i + 1] = border(1, 0, 0, i).unwrap_or(field[FIELD - 2][i + 1]);
        field[i + 1][0] = border(0, -1, i, last).unwrap_or(field[i + 1][1]);
        field[i + 1][FIELD - 1] = border(0, 1, i, 0).unwrap_or(field[i + 1][FIELD - 2]);
    }
    Some(field)
}

impl GeneratorStage for ErosionStage {
    fn name(&self) -> &'static str {
        "erosion"
    }

    fn needs_neighbors(&self) -> bool {
        true
    }

    fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
        let field = height_field(ctx).ok_or(GenerationError::MissingLayer {
            stage: self.name(),
            layer: "terrain",
            pos: ctx.pos,
        })?;

        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let (fx, fz) = (x + 1, z + 1);
                let old = field[fx][fz];
                let sum = 4 * old
                    + field[fx - 1][fz]
                    + field[fx + 1][fz]
                    + field[fx][fz - 1]
                    + field[fx][fz + 1];
                let new = ((sum + 4) / 8).max(1);

                if new > old {
                    let fill = match ctx.chunk.block_id(x, old as usize, z) {
                        blocks::AIR => blocks::STONE,
                        id => id,
                    };
                    for y in (old + 1)..=new {
                        ctx.chunk.set_block_id(x, y as usize, z, fill);
                    }
                } else {
                    for y in (new + 1)..=old {
                        ctx.chunk.set_block_id(x, y as usize, z, blocks::AIR);
                    }
                }
            }
        }
        Ok(())
    }
}
