use std::sync::Arc;

use blockyard_core::{Chunk, UnknownComponent};

use crate::{Action, HookContext, HookOutcome, HookRegistry, MutationEvent, MutationHook};

/// Ordered dig and build chains, resolved once from configuration.
pub struct HookDispatcher {
    dig: Vec<Arc<dyn MutationHook>>,
    build: Vec<Arc<dyn MutationHook>>,
}

impl HookDispatcher {
    pub fn new(dig: Vec<Arc<dyn MutationHook>>, build: Vec<Arc<dyn MutationHook>>) -> Self {
        Self { dig, build }
    }

    pub fn from_names<S: AsRef<str>>(
        dig: &[S],
        build: &[S],
        registry: &HookRegistry,
    ) -> Result<Self, UnknownComponent> {
        Ok(Self::new(registry.dig.resolve(dig)?, registry.build.resolve(build)?))
    }

    pub fn dig_names(&self) -> Vec<&'static str> {
        self.dig.iter().map(|h| h.name()).collect()
    }

    pub fn build_names(&self) -> Vec<&'static str> {
        self.build.iter().map(|h| h.name()).collect()
    }

    /// Run the chain for the event's action against a read-only chunk view.
    /// The first veto stops the chain.
    pub fn dispatch(&self, event: &MutationEvent, chunk: &Chunk) -> HookOutcome {
        let chain = match event.action {
            Action::Dig => &self.dig,
            Action::Build { .. } => &self.build,
        };
        let ctx = HookContext { event, chunk };
        let mut outcome = HookOutcome::default();
        for hook in chain {
            let delta = hook.hook(&ctx, &outcome);
            outcome.apply(hook.name(), delta);
            if !outcome.proceed {
                log::debug!(
                    "{} by {} at {} {} vetoed by `{}`",
                    event.action.kind(),
                    event.session,
                    event.pos,
                    event.offset,
                    hook.name()
                );
                break;
            }
        }
        outcome
    }
}
