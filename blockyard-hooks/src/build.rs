//! Built-in build hooks.
//!
//! `build` is the gatekeeper and belongs at the end of the chain: it vetoes
//! when, after the hooks before it, there is still nothing placeable or the
//! target cell cannot be overwritten. `ladder` and `tile` run before it and
//! supply orientation and tile entities.

use blockyard_core::{BlockState, ItemId, block_info, blocks, items};

use crate::{Action, Face, HookContext, HookDelta, HookOutcome, MutationHook, SideEffect, TileKind};

fn build_action(ctx: &HookContext<'_>) -> Option<(ItemId, u8, Face)> {
    match ctx.event.action {
        Action::Build { item, metadata, face } => Some((item, metadata, face)),
        Action::Dig => None,
    }
}

pub struct Build;

impl MutationHook for Build {
    fn name(&self) -> &'static str {
        "build"
    }

    fn hook(&self, ctx: &HookContext<'_>, outcome: &HookOutcome) -> HookDelta {
        if build_action(ctx).is_none() {
            return HookDelta::pass();
        }
        let replaceable = block_info(ctx.event.old.id).is_some_and(|b| b.replaceable);
        if !replaceable || outcome.final_block(ctx.event.proposed).is_none_or(|b| b.is_air()) {
            HookDelta::veto()
        } else {
            HookDelta::pass()
        }
    }
}

/// Ladders take their metadata from the clicked face; floors and ceilings
/// cannot hold one.
pub struct Ladder;

impl MutationHook for Ladder {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        match build_action(ctx) {
            Some((item, _, face)) if item == blocks::LADDER as ItemId => {
                match face.wall_metadata() {
                    Some(metadata) => {
                        HookDelta::replace(BlockState::with_metadata(blocks::LADDER, metadata))
                    }
                    None => HookDelta::veto(),
                }
            }
            _ => HookDelta::pass(),
        }
    }
}

/// Signs and chests. A sign on a wall becomes a wall sign facing away from
/// it; on the floor it becomes a sign post using the client orientation.
pub struct Tile;

impl MutationHook for Tile {
    fn name(&self) -> &'static str {
        "tile"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        let Some((item, metadata, face)) = build_action(ctx) else {
            return HookDelta::pass();
        };
        let tile = |kind| SideEffect::CreateTile { kind, offset: ctx.event.offset };

        if item == items::SIGN {
            let block = match face {
                Face::NegY => return HookDelta::veto(),
                Face::PosY => BlockState::with_metadata(blocks::SIGN_POST, metadata),
                wall => {
                    BlockState::with_metadata(blocks::WALL_SIGN, wall.wall_metadata().unwrap_or(0))
                }
            };
            HookDelta::replace(block).with_effect(tile(TileKind::Sign))
        } else if item == blocks::CHEST as ItemId {
            HookDelta::effect(tile(TileKind::Chest))
        } else {
            HookDelta::pass()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MutationEvent, SessionId};
    use blockyard_core::{BlockOffset, Chunk, ChunkPos, placeable_block};

    fn build(old: u8, item: ItemId, face: Face) -> MutationEvent {
        let proposed = placeable_block(item).map(BlockState::new);
        MutationEvent {
            session: SessionId(7),
            pos: ChunkPos::new(0, 0),
            offset: BlockOffset::new(4, 61, 4).unwrap(),
            old: BlockState::new(old),
            proposed,
            action: Action::Build { item, metadata: 6, face },
        }
    }

    fn run(hook: &dyn MutationHook, event: &MutationEvent, outcome: &HookOutcome) -> HookDelta {
        let chunk = Chunk::new(event.pos);
        hook.hook(&HookContext { event, chunk: &chunk }, outcome)
    }

    #[test]
    fn test_build_checks_target_and_item() {
        let fresh = HookOutcome::default();
        let dirt = blocks::DIRT as ItemId;
        assert!(!run(&Build, &build(blocks::AIR, dirt, Face::PosY), &fresh).veto);
        assert!(!run(&Build, &build(blocks::SNOW, dirt, Face::PosY), &fresh).veto);
        assert!(run(&Build, &build(blocks::STONE, dirt, Face::PosY), &fresh).veto);
        assert!(run(&Build, &build(blocks::AIR, items::DIAMOND, Face::PosY), &fresh).veto);

        // A sign is not a block on its own, but an earlier replacement makes it placeable.
        let mut replaced = HookOutcome::default();
        replaced.apply("tile", HookDelta::replace(BlockState::new(blocks::SIGN_POST)));
        assert!(!run(&Build, &build(blocks::AIR, items::SIGN, Face::PosY), &replaced).veto);
    }

    #[test]
    fn test_ladder_orientation() {
        let fresh = HookOutcome::default();
        let ladder = blocks::LADDER as ItemId;
        let walls = [(Face::NegX, 4), (Face::PosX, 5), (Face::NegZ, 2), (Face::PosZ, 3)];
        for (face, metadata) in walls {
            let delta = run(&Ladder, &build(blocks::AIR, ladder, face), &fresh);
            let expected = BlockState::with_metadata(blocks::LADDER, metadata);
            assert_eq!(delta.replacement, Some(expected));
        }
        assert!(run(&Ladder, &build(blocks::AIR, ladder, Face::PosY), &fresh).veto);
        let dirt = build(blocks::AIR, blocks::DIRT as ItemId, Face::PosY);
        assert_eq!(run(&Ladder, &dirt, &fresh), HookDelta::pass());
    }

    #[test]
    fn test_tile_signs_and_chests() {
        let fresh = HookOutcome::default();
        let offset = BlockOffset::new(4, 61, 4).unwrap();

        let wall = run(&Tile, &build(blocks::AIR, items::SIGN, Face::PosZ), &fresh);
        assert_eq!(wall.replacement, Some(BlockState::with_metadata(blocks::WALL_SIGN, 3)));
        assert_eq!(
            wall.side_effects,
            vec![SideEffect::CreateTile { kind: TileKind::Sign, offset }]
        );

        let post = run(&Tile, &build(blocks::AIR, items::SIGN, Face::PosY), &fresh);
        assert_eq!(post.replacement, Some(BlockState::with_metadata(blocks::SIGN_POST, 6)));

        assert!(run(&Tile, &build(blocks::AIR, items::SIGN, Face::NegY), &fresh).veto);

        let chest = run(&Tile, &build(blocks::AIR, blocks::CHEST as ItemId, Face::NegX), &fresh);
        assert_eq!(chest.replacement, None);
        assert_eq!(
            chest.side_effects,
            vec![SideEffect::CreateTile { kind: TileKind::Chest, offset }]
        );
    }
}
