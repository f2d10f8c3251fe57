//! In-memory chunk model.
//!
//! Every chunk in a world has the same fixed dimensions. Blocks are stored
//! column-major (`y + z * HEIGHT + x * HEIGHT * DEPTH`), matching the classic
//! on-disk layout so serializers can copy layers without reordering.

use std::fmt;

use thiserror::Error;

use crate::block::{BlockState, biomes, blocks, dim_of};
use crate::pos::{BlockOffset, ChunkPos};

pub const CHUNK_WIDTH: usize = 16;
pub const CHUNK_DEPTH: usize = 16;
pub const CHUNK_HEIGHT: usize = 128;
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_DEPTH * CHUNK_HEIGHT;
pub const CHUNK_COLUMNS: usize = CHUNK_WIDTH * CHUNK_DEPTH;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("layer `{layer}` has {found} entries, expected {expected}")]
pub struct LayerError {
    pub layer: &'static str,
    pub expected: usize,
    pub found: usize,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pub pos: ChunkPos,
    blocks: Box<[u8]>,
    metadata: Box<[u8]>,
    skylight: Box<[u8]>,
    blocklight: Box<[u8]>,
    heightmap: Box<[u8]>,
    biomes: Box<[u8]>,
    /// Set once the generator pipeline has run (or the chunk was loaded).
    pub populated: bool,
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("pos", &self.pos)
            .field("populated", &self.populated)
            .finish_non_exhaustive()
    }
}

#[inline]
fn index(x: usize, y: usize, z: usize) -> usize {
    y + z * CHUNK_HEIGHT + x * CHUNK_HEIGHT * CHUNK_DEPTH
}

#[inline]
fn column(x: usize, z: usize) -> usize {
    z * CHUNK_WIDTH + x
}

fn check(layer: &'static str, data: &[u8], expected: usize) -> Result<(), LayerError> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(LayerError { layer, expected, found: data.len() })
    }
}

impl Chunk {
    /// An empty (all air, unlit) chunk.
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            blocks: vec![blocks::AIR; CHUNK_VOLUME].into_boxed_slice(),
            metadata: vec![0; CHUNK_VOLUME].into_boxed_slice(),
            skylight: vec![0; CHUNK_VOLUME].into_boxed_slice(),
            blocklight: vec![0; CHUNK_VOLUME].into_boxed_slice(),
            heightmap: vec![0; CHUNK_COLUMNS].into_boxed_slice(),
            biomes: vec![biomes::PLAINS; CHUNK_COLUMNS].into_boxed_slice(),
            populated: false,
        }
    }

    /// Rebuild a chunk from raw layers. Nibble layers are unpacked, one value per byte.
    pub fn from_layers(pos: ChunkPos, layers: ChunkLayers) -> Result<Self, LayerError> {
        check("blocks", &layers.blocks, CHUNK_VOLUME)?;
        check("metadata", &layers.metadata, CHUNK_VOLUME)?;
        check("skylight", &layers.skylight, CHUNK_VOLUME)?;
        check("blocklight", &layers.blocklight, CHUNK_VOLUME)?;
        check("heightmap", &layers.heightmap, CHUNK_COLUMNS)?;
        check("biomes", &layers.biomes, CHUNK_COLUMNS)?;
        Ok(Self {
            pos,
            blocks: layers.blocks.into_boxed_slice(),
            metadata: layers.metadata.into_boxed_slice(),
            skylight: layers.skylight.into_boxed_slice(),
            blocklight: layers.blocklight.into_boxed_slice(),
            heightmap: layers.heightmap.into_boxed_slice(),
            biomes: layers.biomes.into_boxed_slice(),
            populated: true,
        })
    }

    pub fn blocks(&self) -> &[u8] {
        &self.blocks
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn skylight(&self) -> &[u8] {
        &self.skylight
    }

    pub fn blocklight(&self) -> &[u8] {
        &self.blocklight
    }

    pub fn heightmap(&self) -> &[u8] {
        &self.heightmap
    }

    pub fn biomes(&self) -> &[u8] {
        &self.biomes
    }

    pub fn get_block(&self, offset: BlockOffset) -> BlockState {
        let i = index(offset.x as usize, offset.y as usize, offset.z as usize);
        BlockState { id: self.blocks[i], metadata: self.metadata[i] }
    }

    pub fn set_block(&mut self, offset: BlockOffset, state: BlockState) {
        let i = index(offset.x as usize, offset.y as usize, offset.z as usize);
        self.blocks[i] = state.id;
        self.metadata[i] = state.metadata & 0x0f;
    }

    /// Block id at raw coordinates. Panics when out of range.
    #[inline]
    pub fn block_id(&self, x: usize, y: usize, z: usize) -> u8 {
        self.blocks[index(x, y, z)]
    }

    /// Sets a block id and clears its metadata. Panics when out of range.
    #[inline]
    pub fn set_block_id(&mut self, x: usize, y: usize, z: usize, id: u8) {
        let i = index(x, y, z);
        self.blocks[i] = id;
        self.metadata[i] = 0;
    }

    pub fn skylight_at(&self, x: usize, y: usize, z: usize) -> u8 {
        self.skylight[index(x, y, z)]
    }

    pub fn height_at(&self, x: usize, z: usize) -> u8 {
        self.heightmap[column(x, z)]
    }

    pub fn biome_at(&self, x: usize, z: usize) -> u8 {
        self.biomes[column(x, z)]
    }

    pub fn set_biome(&mut self, x: usize, z: usize, biome: u8) {
        self.biomes[column(x, z)] = biome;
    }

    /// Fill an entire y-layer with a block.
    pub fn fill_layer(&mut self, y: usize, id: u8) {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                self.set_block_id(x, y, z, id);
            }
        }
    }

    /// Highest non-air block in a column.
    pub fn top_block(&self, x: usize, z: usize) -> Option<usize> {
        (0..CHUNK_HEIGHT).rev().find(|&y| self.block_id(x, y, z) != blocks::AIR)
    }

    /// Highest block in a column matching `pred`.
    pub fn top_matching(&self, x: usize, z: usize, pred: impl Fn(u8) -> bool) -> Option<usize> {
        (0..CHUNK_HEIGHT).rev().find(|&y| pred(self.block_id(x, y, z)))
    }

    /// Recompute height map and sky light for the whole chunk.
    pub fn regenerate(&mut self) {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                self.regenerate_column(x, z);
            }
        }
    }

    /// Recompute height map and sky light for one column.
    ///
    /// The height map holds the lowest y with full sky exposure. Sky light
    /// starts at 15 above it and is reduced by each block's `dim` on the way down.
    pub fn regenerate_column(&mut self, x: usize, z: usize) {
        let height = (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| dim_of(self.block_id(x, y, z)) > 0)
            .map(|y| y + 1)
            .unwrap_or(0);
        self.heightmap[column(x, z)] = height.min(u8::MAX as usize) as u8;

        let mut light: u8 = 15;
        for y in (0..CHUNK_HEIGHT).rev() {
            let i = index(x, y, z);
            light = light.saturating_sub(dim_of(self.blocks[i]));
            self.skylight[i] = light;
        }
    }
}

/// Raw layer buffers used to move chunk data in and out of serializers.
#[derive(Debug, Default)]
pub struct ChunkLayers {
    pub blocks: Vec<u8>,
    pub metadata: Vec<u8>,
    pub skylight: Vec<u8>,
    pub blocklight: Vec<u8>,
    pub heightmap: Vec<u8>,
    pub biomes: Vec<u8>,
}

/// Pack one-value-per-byte nibbles two to a byte, even index in the low half.
pub fn pack_nibbles(values: &[u8]) -> Vec<u8> {
    values
        .chunks(2)
        .map(|pair| {
            let low = pair[0] & 0x0f;
            let high = pair.get(1).copied().unwrap_or(0) & 0x0f;
            low | (high << 4)
        })
        .collect()
}

pub fn unpack_nibbles(packed: &[u8]) -> Vec<u8> {
    packed.iter().flat_map(|b| [b & 0x0f, b >> 4]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_block() {
        let mut chunk = Chunk::new(ChunkPos::new(3, -4));
        let offset = BlockOffset::new(1, 70, 15).unwrap();
        chunk.set_block(offset, BlockState::with_metadata(blocks::LADDER, 5));
        assert_eq!(chunk.get_block(offset), BlockState { id: blocks::LADDER, metadata: 5 });
        assert_eq!(chunk.block_id(1, 70, 15), blocks::LADDER);
        assert_eq!(chunk.block_id(1, 71, 15), blocks::AIR);
    }

    #[test]
    fn test_regenerate_heightmap_and_light() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        for y in 0..=60 {
            chunk.fill_layer(y, blocks::STONE);
        }
        chunk.set_block_id(0, 61, 0, blocks::STILL_WATER);
        chunk.regenerate();

        assert_eq!(chunk.height_at(5, 5), 61);
        assert_eq!(chunk.height_at(0, 0), 62);
        assert_eq!(chunk.skylight_at(5, 61, 5), 15);
        assert_eq!(chunk.skylight_at(5, 60, 5), 0);
        assert_eq!(chunk.skylight_at(0, 61, 0), 12);
    }

    #[test]
    fn test_nibbles() {
        let values = vec![1, 15, 0, 7, 9];
        let packed = pack_nibbles(&values);
        assert_eq!(packed, vec![0xf1, 0x70, 0x09]);
        assert_eq!(&unpack_nibbles(&packed)[..5], &values[..]);
    }

    #[test]
    fn test_from_layers_rejects_bad_length() {
        let layers = ChunkLayers { blocks: vec![0; 10], ..Default::default() };
        let err = Chunk::from_layers(ChunkPos::new(0, 0), layers).unwrap_err();
        assert_eq!(err.layer, "blocks");
        assert_eq!(err.expected, CHUNK_VOLUME);
    }
}
