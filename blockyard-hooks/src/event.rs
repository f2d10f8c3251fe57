use std::fmt;

use blockyard_core::{BlockOffset, BlockState, ChunkPos, ItemId};
use serde::{Deserialize, Serialize};

/// Identifies the client session that issued an action.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// The face of the block a player clicked.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Face {
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "+x")]
    PosX,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "+y")]
    PosY,
    #[serde(rename = "-z")]
    NegZ,
    #[serde(rename = "+z")]
    PosZ,
}

impl Face {
    pub fn is_vertical(&self) -> bool {
        matches!(self, Face::NegY | Face::PosY)
    }

    /// Wall-mounted orientation metadata shared by ladders and wall signs.
    pub fn wall_metadata(&self) -> Option<u8> {
        match self {
            Face::NegX => Some(0x4),
            Face::PosX => Some(0x5),
            Face::NegZ => Some(0x2),
            Face::PosZ => Some(0x3),
            Face::NegY | Face::PosY => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Dig,
    /// Place the held `item` against `face`. `metadata` carries the
    /// client-supplied orientation (used by sign posts).
    Build { item: ItemId, metadata: u8, face: Face },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Dig => "dig",
            Action::Build { .. } => "build",
        }
    }
}

/// A player-initiated block change, before any hook has seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub session: SessionId,
    pub pos: ChunkPos,
    pub offset: BlockOffset,
    pub old: BlockState,
    /// What the action would leave behind without hooks: air for a dig,
    /// the held block for a build, `None` when the held item is not a block.
    pub proposed: Option<BlockState>,
    pub action: Action,
}
