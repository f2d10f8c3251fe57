//! Block and item tables.
//!
//! Block ids are the classic single-byte ids; items live above 255 and share
//! the id space with blocks, so every block is also a valid item.

use serde::{Deserialize, Serialize};

pub type BlockId = u8;
pub type ItemId = u16;

/// A block id together with its 4-bit metadata.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockState {
    pub id: BlockId,
    pub metadata: u8,
}

impl BlockState {
    pub const AIR: BlockState = BlockState { id: blocks::AIR, metadata: 0 };

    pub const fn new(id: BlockId) -> Self {
        Self { id, metadata: 0 }
    }

    pub const fn with_metadata(id: BlockId, metadata: u8) -> Self {
        Self { id, metadata: metadata & 0x0f }
    }

    pub fn is_air(&self) -> bool {
        self.id == blocks::AIR
    }
}

pub mod blocks {
    use super::BlockId;

    pub const AIR: BlockId = 0;
    pub const STONE: BlockId = 1;
    pub const GRASS: BlockId = 2;
    pub const DIRT: BlockId = 3;
    pub const COBBLESTONE: BlockId = 4;
    pub const PLANKS: BlockId = 5;
    pub const BEDROCK: BlockId = 7;
    pub const WATER: BlockId = 8;
    pub const STILL_WATER: BlockId = 9;
    pub const LAVA: BlockId = 10;
    pub const STILL_LAVA: BlockId = 11;
    pub const SAND: BlockId = 12;
    pub const GRAVEL: BlockId = 13;
    pub const GOLD_ORE: BlockId = 14;
    pub const IRON_ORE: BlockId = 15;
    pub const COAL_ORE: BlockId = 16;
    pub const LOG: BlockId = 17;
    pub const LEAVES: BlockId = 18;
    pub const GLASS: BlockId = 20;
    pub const LAPIS_ORE: BlockId = 21;
    pub const TORCH: BlockId = 50;
    pub const CHEST: BlockId = 54;
    pub const DIAMOND_ORE: BlockId = 56;
    pub const SIGN_POST: BlockId = 63;
    pub const LADDER: BlockId = 65;
    pub const WALL_SIGN: BlockId = 68;
    pub const REDSTONE_ORE: BlockId = 73;
    pub const SNOW: BlockId = 78;
    pub const ICE: BlockId = 79;
    pub const SNOW_BLOCK: BlockId = 80;
    pub const CLAY: BlockId = 82;
}

pub mod items {
    use super::ItemId;

    pub const COAL: ItemId = 263;
    pub const DIAMOND: ItemId = 264;
    pub const SIGN: ItemId = 323;
    pub const REDSTONE: ItemId = 331;
    pub const SNOWBALL: ItemId = 332;
    pub const CLAY_BALL: ItemId = 337;
}

pub mod biomes {
    pub const OCEAN: u8 = 0;
    pub const PLAINS: u8 = 1;
    pub const DESERT: u8 = 2;
    pub const TAIGA: u8 = 5;
    pub const TUNDRA: u8 = 12;
    pub const BEACH: u8 = 16;

    pub fn is_cold(biome: u8) -> bool {
        matches!(biome, TAIGA | TUNDRA)
    }
}

/// Static description of a block type.
#[derive(Debug)]
pub struct BlockInfo {
    pub id: BlockId,
    pub name: &'static str,
    /// How much sky light is lost passing through this block (15 = opaque).
    pub dim: u8,
    /// Whether a build action may overwrite this block in place.
    pub replaceable: bool,
    /// What digging this block yields: (item, count).
    pub drop: Option<(ItemId, u8)>,
}

impl BlockInfo {
    pub fn is_opaque(&self) -> bool {
        self.dim >= 15
    }
}

const fn info(
    id: BlockId,
    name: &'static str,
    dim: u8,
    replaceable: bool,
    drop: Option<(ItemId, u8)>,
) -> BlockInfo {
    BlockInfo { id, name, dim, replaceable, drop }
}

const fn same(id: BlockId) -> Option<(ItemId, u8)> {
    Some((id as ItemId, 1))
}

static BLOCKS: &[BlockInfo] = &[
    info(blocks::AIR, "air", 0, true, None),
    info(blocks::STONE, "stone", 15, false, same(blocks::COBBLESTONE)),
    info(blocks::GRASS, "grass", 15, false, same(blocks::DIRT)),
    info(blocks::DIRT, "dirt", 15, false, same(blocks::DIRT)),
    info(blocks::COBBLESTONE, "cobblestone", 15, false, same(blocks::COBBLESTONE)),
    info(blocks::PLANKS, "planks", 15, false, same(blocks::PLANKS)),
    info(blocks::BEDROCK, "bedrock", 15, false, None),
    info(blocks::WATER, "water", 3, true, None),
    info(blocks::STILL_WATER, "still-water", 3, true, None),
    info(blocks::LAVA, "lava", 15, true, None),
    info(blocks::STILL_LAVA, "still-lava", 15, true, None),
    info(blocks::SAND, "sand", 15, false, same(blocks::SAND)),
    info(blocks::GRAVEL, "gravel", 15, false, same(blocks::GRAVEL)),
    info(blocks::GOLD_ORE, "gold-ore", 15, false, same(blocks::GOLD_ORE)),
    info(blocks::IRON_ORE, "iron-ore", 15, false, same(blocks::IRON_ORE)),
    info(blocks::COAL_ORE, "coal-ore", 15, false, Some((items::COAL, 1))),
    info(blocks::LOG, "log", 15, false, same(blocks::LOG)),
    info(blocks::LEAVES, "leaves", 1, false, None),
    info(blocks::GLASS, "glass", 0, false, None),
    info(blocks::LAPIS_ORE, "lapis-ore", 15, false, same(blocks::LAPIS_ORE)),
    info(blocks::TORCH, "torch", 0, false, same(blocks::TORCH)),
    info(blocks::CHEST, "chest", 0, false, same(blocks::CHEST)),
    info(blocks::DIAMOND_ORE, "diamond-ore", 15, false, Some((items::DIAMOND, 1))),
    info(blocks::SIGN_POST, "signpost", 0, false, Some((items::SIGN, 1))),
    info(blocks::LADDER, "ladder", 0, false, same(blocks::LADDER)),
    info(blocks::WALL_SIGN, "wall-sign", 0, false, Some((items::SIGN, 1))),
    info(blocks::REDSTONE_ORE, "redstone-ore", 15, false, Some((items::REDSTONE, 4))),
    info(blocks::SNOW, "snow", 0, true, None),
    info(blocks::ICE, "ice", 3, false, None),
    info(blocks::SNOW_BLOCK, "snow-block", 15, false, None),
    info(blocks::CLAY, "clay", 15, false, Some((items::CLAY_BALL, 4))),
];

/// Look up a block by id.
pub fn block_info(id: BlockId) -> Option<&'static BlockInfo> {
    BLOCKS.iter().find(|b| b.id == id)
}

/// The block placed when `item` is used directly, if it is a known block.
pub fn placeable_block(item: ItemId) -> Option<BlockId> {
    let id = BlockId::try_from(item).ok()?;
    block_info(id).filter(|b| b.id != blocks::AIR).map(|b| b.id)
}

/// Light filtering for a block id; unknown ids are treated as opaque.
pub fn dim_of(id: BlockId) -> u8 {
    block_info(id).map(|b| b.dim).unwrap_or(15)
}
