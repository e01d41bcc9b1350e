//! Projection: rewrite user-facing forms into the reduced vocabulary.
//!
//! After projection a tree only holds numbers, constants, `Add`, `Mult`, `Pow`, the system
//! functions (`Exp`, `Ln`, `Abs`, `Factorial`, `Trig`, `ATrig`) and containers. Angles are
//! converted to radians, stored symbols are substituted according to the
//! [`SymbolicComputation`](crate::reduction::context::SymbolicComputation) mode, and float
//! strategies approximate their scalars.
use crate::error::CalcResult;
use crate::reduction::approximation::approximate_scalars;
use crate::reduction::context::{ProjectionContext, Strategy, SymbolicComputation};
use crate::reduction::interrupt::{Interrupt, check};
use crate::reduction::rules::PROJECTION;
use crate::reduction::store::SymbolStore;
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;
use crate::tree::owned::shapes::{add, atrig, int, mult, pow, rational, trig, undefined};
use crate::tree::walker::apply_top_down;

/// Substitutions allowed in one projection; past this, definitions are considered circular.
pub const MAX_SUBSTITUTIONS: usize = 64;

const MAX_PROJECTION_STEPS: usize = 16;

/// Project the tree at `at`. Returns whether anything changed.
pub fn project(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    store: &dyn SymbolStore,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let mut substitutions = 0;
    let mut changed = apply_top_down(arena, at, |arena, node| {
        let mut changed = false;
        for _ in 0..MAX_PROJECTION_STEPS {
            check(interrupt)?;
            if !shallow_project(arena, node, ctx, store, &mut substitutions)? {
                break;
            }
            changed = true;
        }
        Ok(changed)
    })?;
    if ctx.strategy.is_float() {
        let numbers_only = ctx.strategy == Strategy::NumbersToFloat;
        changed |= approximate_scalars(arena, at, ctx, numbers_only)?;
    }
    Ok(changed)
}

fn shallow_project(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    store: &dyn SymbolStore,
    substitutions: &mut usize,
) -> CalcResult<bool> {
    let tree = arena.tree(at);
    let replacement = match tree.node_type() {
        t if t.is_user_named() => substitute(tree, ctx, store, substitutions)?,
        NodeType::Cos | NodeType::Sin | NodeType::Tan => project_trigonometry(tree, ctx),
        NodeType::ACos | NodeType::ASin | NodeType::ATan => project_inverse_trigonometry(tree, ctx),
        _ => {
            for rule in PROJECTION.iter() {
                if rule.apply_at(arena, at)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
    };
    let Some(replacement) = replacement else {
        return Ok(false);
    };
    arena.replace_at(at, Extent::Tree, RawSource::Bytes(replacement.as_bytes()), Extent::Tree)?;
    Ok(true)
}

fn substitute(
    tree: TreeRef<'_>,
    ctx: &ProjectionContext,
    store: &dyn SymbolStore,
    substitutions: &mut usize,
) -> CalcResult<Option<OwnedTree>> {
    if ctx.symbolic_computation == SymbolicComputation::ReplaceAllSymbolsWithUndefined {
        return Ok(Some(undefined()));
    }
    let Some(name) = tree.name() else {
        return Ok(None);
    };
    let definition = match tree.node_type() {
        NodeType::UserSymbol if ctx.symbolic_computation.replaces_symbols() => {
            store.symbol(name).cloned()
        }
        NodeType::UserFunction if ctx.symbolic_computation.replaces_functions() => {
            match (store.function(name), tree.child(0)) {
                (Some(function), Some(argument)) => Some(function.apply(argument)?),
                _ => None,
            }
        }
        _ => None,
    };
    let Some(definition) = definition else {
        return Ok(None);
    };
    *substitutions += 1;
    if *substitutions > MAX_SUBSTITUTIONS {
        log::debug!("definition of {name} is circular");
        return Ok(Some(undefined()));
    }
    Ok(Some(definition))
}

/// The argument of a trigonometric function, in radians.
fn in_radians(angle: TreeRef<'_>, ctx: &ProjectionContext) -> OwnedTree {
    let angle = OwnedTree::from_tree(angle);
    match ctx.angle_unit.to_radians_factor() {
        Some(factor) => mult([angle, factor]),
        None => angle,
    }
}

fn project_trigonometry(tree: TreeRef<'_>, ctx: &ProjectionContext) -> Option<OwnedTree> {
    let angle = in_radians(tree.child(0)?, ctx);
    Some(match tree.node_type() {
        NodeType::Cos => trig(angle, int(0)),
        NodeType::Sin => trig(angle, int(1)),
        _ => mult([
            trig(angle.clone(), int(1)),
            pow(trig(angle, int(0)), int(-1)),
        ]),
    })
}

fn project_inverse_trigonometry(tree: TreeRef<'_>, ctx: &ProjectionContext) -> Option<OwnedTree> {
    let argument = OwnedTree::from_tree(tree.child(0)?);
    let radians = match tree.node_type() {
        NodeType::ACos => atrig(argument, int(0)),
        NodeType::ASin => atrig(argument, int(1)),
        // atan(x) = asin(x / sqrt(1 + x^2))
        _ => atrig(
            mult([
                argument.clone(),
                pow(add([int(1), pow(argument, int(2))]), rational(-1, 2)),
            ]),
            int(1),
        ),
    };
    Some(match ctx.angle_unit.from_radians_factor() {
        Some(factor) => mult([radians, factor]),
        None => radians,
    })
}
