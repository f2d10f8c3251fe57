//! NBT chunk encoding shared by both world formats.
//!
//! Root compound `Level` with the classic tag names. Nibble layers are
//! stored packed, two cells per byte.

use std::time::{SystemTime, UNIX_EPOCH};

use blockyard_core::{
    CHUNK_COLUMNS, Chunk, ChunkLayers, ChunkPos, biomes, pack_nibbles, unpack_nibbles,
};
use fastnbt::ByteArray;
use serde::{Deserialize, Serialize};

use crate::StorageError;
use crate::error::corrupt;

#[derive(Debug, Serialize, Deserialize)]
struct ChunkRoot {
    #[serde(rename = "Level")]
    level: Level,
}

#[derive(Debug, Serialize, Deserialize)]
struct Level {
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "Blocks")]
    blocks: ByteArray,
    #[serde(rename = "Data")]
    data: ByteArray,
    #[serde(rename = "SkyLight")]
    sky_light: ByteArray,
    #[serde(rename = "BlockLight")]
    block_light: ByteArray,
    #[serde(rename = "HeightMap")]
    height_map: ByteArray,
    // Missing in chunks written by older tools.
    #[serde(rename = "Biomes", default)]
    biomes: Option<ByteArray>,
    #[serde(rename = "TerrainPopulated")]
    terrain_populated: i8,
    #[serde(rename = "LastUpdate")]
    last_update: i64,
}

fn to_array(data: &[u8]) -> ByteArray {
    ByteArray::new(data.iter().map(|&b| b as i8).collect())
}

fn from_array(array: ByteArray) -> Vec<u8> {
    array.into_inner().into_iter().map(|b| b as u8).collect()
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Encode a chunk as uncompressed NBT.
pub fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, StorageError> {
    let root = ChunkRoot {
        level: Level {
            x_pos: chunk.pos.x,
            z_pos: chunk.pos.z,
            blocks: to_array(chunk.blocks()),
            data: to_array(&pack_nibbles(chunk.metadata())),
            sky_light: to_array(&pack_nibbles(chunk.skylight())),
            block_light: to_array(&pack_nibbles(chunk.blocklight())),
            height_map: to_array(chunk.heightmap()),
            biomes: Some(to_array(chunk.biomes())),
            terrain_populated: chunk.populated as i8,
            last_update: now_secs(),
        },
    };
    fastnbt::to_bytes(&root)
        .map_err(|e| StorageError::Encode { pos: chunk.pos, reason: e.to_string() })
}

/// Decode NBT stored under `expected`. A chunk whose recorded coordinates
/// disagree with where it was found is corrupt.
pub fn decode_chunk(expected: ChunkPos, bytes: &[u8]) -> Result<Chunk, StorageError> {
    let root: ChunkRoot = fastnbt::from_bytes(bytes).map_err(|e| corrupt(expected, e))?;
    let level = root.level;

    let stored = ChunkPos::new(level.x_pos, level.z_pos);
    if stored != expected {
        return Err(corrupt(expected, format!("stored coordinates are {stored}")));
    }

    let layers = ChunkLayers {
        blocks: from_array(level.blocks),
        metadata: unpack_nibbles(&from_array(level.data)),
        skylight: unpack_nibbles(&from_array(level.sky_light)),
        blocklight: unpack_nibbles(&from_array(level.block_light)),
        heightmap: from_array(level.height_map),
        biomes: level
            .biomes
            .map(from_array)
            .unwrap_or_else(|| vec![biomes::PLAINS; CHUNK_COLUMNS]),
    };
    let mut chunk = Chunk::from_layers(expected, layers).map_err(|e| corrupt(expected, e))?;
    chunk.populated = level.terrain_populated != 0;
    Ok(chunk)
}
