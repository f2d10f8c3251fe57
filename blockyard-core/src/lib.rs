//! Core world data shared by every blockyard crate: the chunk model, block
//! tables, coordinates and the named-component registry.

pub mod block;
pub mod chunk;
pub mod pos;
pub mod registry;

pub use block::{
    BlockId, BlockInfo, BlockState, ItemId, biomes, block_info, blocks, dim_of, items,
    placeable_block,
};
pub use chunk::{
    CHUNK_COLUMNS, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, Chunk, ChunkLayers,
    LayerError, pack_nibbles, unpack_nibbles,
};
pub use pos::{BlockOffset, ChunkPos, split_coords};
pub use registry::{Registry, UnknownComponent};
