//! Mutation hooks.
//!
//! Independently written hooks compose through an accumulator: every hook in
//! a chain sees the event, a read-only view of the chunk and the outcome so
//! far, and returns a `HookDelta`. No hook writes world state; the
//! coordinator applies the folded `HookOutcome` in one step.

use std::sync::Arc;

use blockyard_core::{Chunk, Registry};

pub mod build;
pub mod dig;
mod dispatch;
mod event;
mod outcome;

pub use dispatch::HookDispatcher;
pub use event::{Action, Face, MutationEvent, SessionId};
pub use outcome::{HookDelta, HookOutcome, SideEffect, TileKind};

/// What a hook gets to look at.
pub struct HookContext<'a> {
    pub event: &'a MutationEvent,
    pub chunk: &'a Chunk,
}

pub trait MutationHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn hook(&self, ctx: &HookContext<'_>, outcome: &HookOutcome) -> HookDelta;
}

/// Named dig hooks and build hooks. The same name may exist in both.
pub struct HookRegistry {
    pub dig: Registry<dyn MutationHook>,
    pub build: Registry<dyn MutationHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { dig: Registry::new("dig hook"), build: Registry::new("build hook") }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    let dig: Vec<Arc<dyn MutationHook>> = vec![
        Arc::new(dig::Give),
        Arc::new(dig::Replace),
        Arc::new(dig::Bedrock),
        Arc::new(dig::Snow),
        Arc::new(dig::Torch),
    ];
    for hook in dig {
        registry.dig.register(hook.name(), hook);
    }
    // Name used by older configuration files.
    registry.dig.register("bravo_snow", Arc::new(dig::Snow));
    let build: Vec<Arc<dyn MutationHook>> =
        vec![Arc::new(build::Build), Arc::new(build::Ladder), Arc::new(build::Tile)];
    for hook in build {
        registry.build.register(hook.name(), hook);
    }
    registry
}
