use blockyard_core::{BlockOffset, BlockState, ItemId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TileKind {
    Sign,
    Chest,
}

/// Effects a hook asks for besides the block change itself. They are applied
/// by the coordinator only when the whole chain lets the mutation through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SideEffect {
    DropItem { item: ItemId, count: u8 },
    CreateTile { kind: TileKind, offset: BlockOffset },
    Counter { name: &'static str, delta: i64 },
}

/// What one hook contributes to the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookDelta {
    pub veto: bool,
    pub replacement: Option<BlockState>,
    pub side_effects: Vec<SideEffect>,
}

impl HookDelta {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn veto() -> Self {
        Self { veto: true, ..Self::default() }
    }

    pub fn replace(block: BlockState) -> Self {
        Self { replacement: Some(block), ..Self::default() }
    }

    pub fn effect(effect: SideEffect) -> Self {
        Self { side_effects: vec![effect], ..Self::default() }
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }
}

/// The fold of every hook delta in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutcome {
    pub proceed: bool,
    pub replacement: Option<BlockState>,
    pub side_effects: Vec<SideEffect>,
    pub vetoed_by: Option<&'static str>,
}

impl Default for HookOutcome {
    fn default() -> Self {
        Self { proceed: true, replacement: None, side_effects: Vec::new(), vetoed_by: None }
    }
}

impl HookOutcome {
    /// Fold one delta in. A veto discards everything accumulated so far.
    pub fn apply(&mut self, hook: &'static str, delta: HookDelta) {
        if delta.veto {
            self.proceed = false;
            self.vetoed_by = Some(hook);
            self.replacement = None;
            self.side_effects.clear();
            return;
        }
        if delta.replacement.is_some() {
            self.replacement = delta.replacement;
        }
        self.side_effects.extend(delta.side_effects);
    }

    /// The block the mutation leaves behind when it proceeds. `None` means
    /// nothing in the chain produced a block, and nothing may be written.
    pub fn final_block(&self, proposed: Option<BlockState>) -> Option<BlockState> {
        self.replacement.or(proposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::blocks;

    #[test]
    fn test_fold_replacement_and_effects() {
        let mut outcome = HookOutcome::default();
        outcome.apply("a", HookDelta::effect(SideEffect::DropItem { item: 3, count: 1 }));
        outcome.apply("b", HookDelta::replace(BlockState::new(blocks::WATER)));
        outcome.apply("c", HookDelta::pass());

        assert!(outcome.proceed);
        assert_eq!(
            outcome.final_block(Some(BlockState::AIR)),
            Some(BlockState::new(blocks::WATER))
        );
        assert_eq!(outcome.final_block(None), Some(BlockState::new(blocks::WATER)));
        assert_eq!(outcome.side_effects.len(), 1);
    }

    #[test]
    fn test_veto_discards_accumulated() {
        let mut outcome = HookOutcome::default();
        outcome.apply("give", HookDelta::effect(SideEffect::DropItem { item: 3, count: 1 }));
        outcome.apply("bedrock", HookDelta::veto());

        assert!(!outcome.proceed);
        assert_eq!(outcome.vetoed_by, Some("bedrock"));
        assert!(outcome.side_effects.is_empty());
        assert_eq!(outcome.final_block(Some(BlockState::AIR)), Some(BlockState::AIR));
        assert_eq!(outcome.final_block(None), None);
    }
}
