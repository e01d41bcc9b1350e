//! The reduction pipeline.
//!
//! [`Simplifier::simplify`] runs the passes in order on one tree:
//!
//! 1. [`projection`]: user-facing forms into the reduced vocabulary.
//! 2. [`systematic`]: deterministic normalization to a fixed point.
//! 3. [`advanced`]: bounded search over expansions and contractions.
//! 4. [`beautify`]: display forms.
//!
//! The whole run happens under a checkpoint. When a pass runs out of room
//! ([`CalcError::CapacityExceeded`], [`CalcError::TableFull`]) or is interrupted
//! ([`CalcError::Cancelled`]), the arena is rolled back and the run is retried under the next
//! [`Strategy`] of the fallback chain from [`EngineConfig::fallback`]. Any other error is
//! returned after the rollback.
pub mod advanced;
pub mod approximation;
pub mod beautify;
pub mod context;
pub mod interrupt;
pub mod nary;
pub mod projection;
pub mod rules;
pub mod store;
pub mod systematic;

use smallvec::SmallVec;

use crate::config::EngineConfig;
use crate::error::{CalcError, CalcResult};
use crate::reduction::context::{ProjectionContext, Strategy};
use crate::reduction::interrupt::{Interrupt, NeverInterrupt};
use crate::reduction::store::{EmptyStore, SymbolStore};
use crate::tree::arena::Arena;
use crate::tree::handle::Handle;

/// Runs the reduction pipeline with a configuration, an interrupt source and a symbol store.
pub struct Simplifier {
    config: EngineConfig,
    interrupt: Box<dyn Interrupt>,
    store: Box<dyn SymbolStore>,
}

impl Simplifier {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            interrupt: Box::new(NeverInterrupt),
            store: Box::new(EmptyStore),
        }
    }

    pub fn with_interrupt(mut self, interrupt: impl Interrupt + 'static) -> Self {
        self.interrupt = Box::new(interrupt);
        self
    }

    pub fn with_store(mut self, store: impl SymbolStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Strategies to try, in order: the requested one, then the fallback chain.
    fn strategies(&self, requested: Strategy) -> SmallVec<[Strategy; 4]> {
        let mut chain: SmallVec<[Strategy; 4]> = SmallVec::new();
        chain.push(requested);
        for strategy in &self.config.fallback {
            if !chain.contains(strategy) {
                chain.push(*strategy);
            }
        }
        chain
    }

    /// Simplify the tree behind `handle` in place. Returns the strategy that succeeded.
    ///
    /// On failure the arena is exactly as it was before the call.
    pub fn simplify(
        &mut self,
        arena: &mut Arena,
        handle: Handle,
        ctx: &ProjectionContext,
    ) -> CalcResult<Strategy> {
        let mut last_error = None;
        for strategy in self.strategies(ctx.strategy) {
            let ctx = ctx.with_strategy(strategy);
            let checkpoint = arena.checkpoint();
            match self.run(arena, handle, &ctx) {
                Ok(()) => {
                    arena.commit(checkpoint);
                    log::debug!("simplified under {strategy:?}");
                    return Ok(strategy);
                }
                Err(err) if err.is_recoverable() => {
                    arena.rollback(checkpoint);
                    log::debug!("{strategy:?} failed ({err}), trying the next strategy");
                    last_error = Some(err);
                }
                Err(err) => {
                    arena.rollback(checkpoint);
                    return Err(err);
                }
            }
        }
        log::warn!("every strategy failed");
        Err(last_error.unwrap_or(CalcError::Cancelled))
    }

    fn run(&mut self, arena: &mut Arena, handle: Handle, ctx: &ProjectionContext) -> CalcResult<()> {
        let at = arena.resolve(handle)?;
        projection::project(arena, at, ctx, &*self.store, &mut *self.interrupt)?;
        let at = arena.resolve(handle)?;
        systematic::reduce(arena, at, ctx, &mut *self.interrupt)?;
        let at = arena.resolve(handle)?;
        advanced::reduce(arena, at, ctx, &self.config, &mut *self.interrupt)?;
        let at = arena.resolve(handle)?;
        beautify::beautify(arena, at, ctx, &mut *self.interrupt)?;
        Ok(())
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Simplifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simplifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduction::interrupt::InterruptAfter;
    use crate::tree::owned::shapes::*;

    #[test]
    fn fallback_chain_has_no_duplicates() {
        let simplifier = Simplifier::default();
        assert_eq!(
            simplifier.strategies(Strategy::NumbersToFloat).as_slice(),
            &[Strategy::NumbersToFloat, Strategy::ApproximateToFloat]
        );
        assert_eq!(simplifier.strategies(Strategy::Default).len(), 3);
    }

    #[test]
    fn full_pipeline() {
        let mut arena = Arena::new();
        let h = arena
            .push_tree(&sub(mult([int(2), sym("x")]), div(sym("x"), int(2))))
            .unwrap();
        let strategy = Simplifier::default()
            .simplify(&mut arena, h, &ProjectionContext::default())
            .unwrap();
        assert_eq!(strategy, Strategy::Default);
        assert_eq!(arena.snapshot_tree(h).unwrap(), div(mult([int(3), sym("x")]), int(2)));
    }

    #[test]
    fn interrupted_run_leaves_arena_untouched() {
        let mut arena = Arena::new();
        let h = arena.push_tree(&add([int(1), int(2), sym("x")])).unwrap();
        let before = arena.bytes().to_vec();
        let mut simplifier = Simplifier::default().with_interrupt(InterruptAfter::new(2));
        let result = simplifier.simplify(&mut arena, h, &ProjectionContext::default());
        assert!(matches!(result, Err(CalcError::Cancelled)));
        assert_eq!(arena.bytes(), before.as_slice());
        assert!(arena.is_live(h));
    }
}
