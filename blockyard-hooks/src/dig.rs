//! Built-in dig hooks.

use blockyard_core::{BlockState, block_info, blocks, items};

use crate::{HookContext, HookDelta, HookOutcome, MutationHook, SideEffect};

/// Drops whatever the dug block yields.
pub struct Give;

impl MutationHook for Give {
    fn name(&self) -> &'static str {
        "give"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        match block_info(ctx.event.old.id).and_then(|b| b.drop) {
            Some((item, count)) => HookDelta::effect(SideEffect::DropItem { item, count }),
            None => HookDelta::pass(),
        }
    }
}

/// Decides what fills the dug cell: melted ice leaves water, anything else air.
pub struct Replace;

impl MutationHook for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        if ctx.event.old.id == blocks::ICE {
            HookDelta::replace(BlockState::new(blocks::WATER))
        } else {
            HookDelta::replace(BlockState::AIR)
        }
    }
}

/// Bedrock cannot be dug.
pub struct Bedrock;

impl MutationHook for Bedrock {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        if ctx.event.old.id == blocks::BEDROCK {
            HookDelta::veto()
        } else {
            HookDelta::pass()
        }
    }
}

/// Snow yields snowballs: one for a layer, four for a block.
pub struct Snow;

impl MutationHook for Snow {
    fn name(&self) -> &'static str {
        "snow"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        let count = match ctx.event.old.id {
            blocks::SNOW => 1,
            blocks::SNOW_BLOCK => 4,
            _ => return HookDelta::pass(),
        };
        HookDelta::effect(SideEffect::DropItem { item: items::SNOWBALL, count })
    }
}

/// Counts removed torches.
pub struct Torch;

impl MutationHook for Torch {
    fn name(&self) -> &'static str {
        "torch"
    }

    fn hook(&self, ctx: &HookContext<'_>, _outcome: &HookOutcome) -> HookDelta {
        if ctx.event.old.id == blocks::TORCH {
            HookDelta::effect(SideEffect::Counter { name: "torches_removed", delta: 1 })
        } else {
            HookDelta::pass()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, MutationEvent, SessionId};
    use blockyard_core::{BlockOffset, Chunk, ChunkPos, ItemId};

    fn dig(old: u8) -> MutationEvent {
        MutationEvent {
            session: SessionId(1),
            pos: ChunkPos::new(0, 0),
            offset: BlockOffset::new(1, 60, 1).unwrap(),
            old: BlockState::new(old),
            proposed: Some(BlockState::AIR),
            action: Action::Dig,
        }
    }

    fn run(hook: &dyn MutationHook, old: u8) -> HookDelta {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        let event = dig(old);
        hook.hook(&HookContext { event: &event, chunk: &chunk }, &HookOutcome::default())
    }

    #[test]
    fn test_give_uses_drop_table() {
        assert_eq!(
            run(&Give, blocks::STONE).side_effects,
            vec![SideEffect::DropItem { item: blocks::COBBLESTONE as ItemId, count: 1 }]
        );
        assert_eq!(
            run(&Give, blocks::REDSTONE_ORE).side_effects,
            vec![SideEffect::DropItem { item: items::REDSTONE, count: 4 }]
        );
        assert_eq!(run(&Give, blocks::GLASS), HookDelta::pass());
    }

    #[test]
    fn test_replace_melts_ice() {
        assert_eq!(run(&Replace, blocks::ICE).replacement, Some(BlockState::new(blocks::WATER)));
        assert_eq!(run(&Replace, blocks::DIRT).replacement, Some(BlockState::AIR));
    }

    #[test]
    fn test_bedrock_veto() {
        assert!(run(&Bedrock, blocks::BEDROCK).veto);
        assert!(!run(&Bedrock, blocks::STONE).veto);
    }

    #[test]
    fn test_snow_and_torch() {
        assert_eq!(
            run(&Snow, blocks::SNOW_BLOCK).side_effects,
            vec![SideEffect::DropItem { item: items::SNOWBALL, count: 4 }]
        );
        assert_eq!(run(&Snow, blocks::DIRT), HookDelta::pass());
        assert_eq!(
            run(&Torch, blocks::TORCH).side_effects,
            vec![SideEffect::Counter { name: "torches_removed", delta: 1 }]
        );
    }
}
