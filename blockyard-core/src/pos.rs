use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

/// Coordinates for a chunk in the world.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the given world block column.
    pub fn from_world(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_WIDTH as i32),
            z: world_z.div_euclid(CHUNK_DEPTH as i32),
        }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Taxicab distance in chunks.
    pub fn taxicab(&self, other: ChunkPos) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// The `count` chunks nearest to `self`, ordered by taxicab distance and
    /// then by coordinate, so the selection is stable across restarts.
    pub fn nearest(&self, count: usize) -> Vec<ChunkPos> {
        let mut out = Vec::with_capacity(count);
        let mut ring = 0i32;
        while out.len() < count {
            let mut layer: Vec<ChunkPos> = Vec::new();
            for dx in -ring..=ring {
                let rest = ring - dx.abs();
                layer.push(self.offset(dx, -rest));
                if rest != 0 {
                    layer.push(self.offset(dx, rest));
                }
            }
            layer.sort();
            let take = (count - out.len()).min(layer.len());
            out.extend_from_slice(&layer[..take]);
            ring += 1;
        }
        out
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Position of a block inside a chunk.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockOffset {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl BlockOffset {
    /// Returns `None` when the offset falls outside the chunk.
    pub fn new(x: u8, y: u8, z: u8) -> Option<Self> {
        if (x as usize) < CHUNK_WIDTH && (y as usize) < CHUNK_HEIGHT && (z as usize) < CHUNK_DEPTH {
            Some(Self { x, y, z })
        } else {
            None
        }
    }
}

impl fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Split world block coordinates into a chunk position and an offset inside it.
/// Returns `None` when `y` is outside the world height.
pub fn split_coords(world_x: i32, y: i32, world_z: i32) -> Option<(ChunkPos, BlockOffset)> {
    if !(0..CHUNK_HEIGHT as i32).contains(&y) {
        return None;
    }
    let pos = ChunkPos::from_world(world_x, world_z);
    let offset = BlockOffset {
        x: world_x.rem_euclid(CHUNK_WIDTH as i32) as u8,
        y: y as u8,
        z: world_z.rem_euclid(CHUNK_DEPTH as i32) as u8,
    };
    Some((pos, offset))
}
