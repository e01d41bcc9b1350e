//! Beautification: turn a reduced tree into the form a user expects to read.
//!
//! The pass is cosmetic and idempotent. Negative powers become divisions, negative terms
//! become subtractions, system functions get their display names back, and angles are
//! converted back to the context's unit.
use num_traits::{One, Signed};

use crate::error::CalcResult;
use crate::number::Number;
use crate::reduction::approximation::approximate_scalars;
use crate::reduction::context::{ProjectionContext, Strategy};
use crate::reduction::interrupt::{Interrupt, check};
use crate::reduction::nary::negated;
use crate::reduction::rules::BEAUTIFY;
use crate::reduction::systematic;
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;
use crate::tree::owned::shapes::{div, int, mult, nth_root, number, opposite, pow, sub};
use crate::tree::walker::{any_node, apply_bottom_up, apply_top_down};

const MAX_BEAUTIFY_STEPS: usize = 8;

/// Beautify the tree at `at`. Returns whether anything changed.
pub fn beautify(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let mut changed = false;
    if ctx.strategy == Strategy::ApproximateToFloat {
        changed |= approximate_scalars(arena, at, ctx, false)?;
    }
    changed |= convert_inverse_angles(arena, at, ctx, interrupt)?;
    changed |= apply_top_down(arena, at, |arena, node| {
        let mut changed = false;
        for _ in 0..MAX_BEAUTIFY_STEPS {
            check(interrupt)?;
            if !shallow_beautify(arena, node, ctx, interrupt)? {
                break;
            }
            changed = true;
        }
        Ok(changed)
    })?;
    Ok(changed)
}

/// Inverse trigonometric results are in radians and were multiplied by `half_turn / π` by
/// projection. Multiplying each `ATrig` by `π / half_turn` and reducing cancels that
/// factor, so that the display form `acos(x)` reads directly in the context's unit.
fn convert_inverse_angles(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let Some(factor) = ctx.angle_unit.to_radians_factor() else {
        return Ok(false);
    };
    if !any_node(arena.tree(at), |node| node.is(NodeType::ATrig)) {
        return Ok(false);
    }
    apply_bottom_up(arena, at, |arena, node| {
        let tree = arena.tree(node);
        if !tree.is(NodeType::ATrig) {
            return Ok(false);
        }
        let wrapped = mult([factor.clone(), OwnedTree::from_tree(tree)]);
        arena.replace_at(node, Extent::Tree, RawSource::Bytes(wrapped.as_bytes()), Extent::Tree)?;
        Ok(true)
    })?;
    systematic::reduce(arena, at, ctx, interrupt)?;
    Ok(true)
}

fn shallow_beautify(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let tree = arena.tree(at);
    match tree.node_type() {
        NodeType::Trig if tree.child(1).is_some_and(|k| k.is_zero() || k.is_one()) => {
            if let Some(factor) = ctx.angle_unit.from_radians_factor() {
                // Trig(x, k) holds radians; display cos(x·half_turn/π) in the context's unit.
                let Some(angle) = tree.child(0) else {
                    return Ok(false);
                };
                let converted = mult([OwnedTree::from_tree(angle), factor]);
                let angle_at = angle.offset();
                arena.replace_at(angle_at, Extent::Tree, RawSource::Bytes(converted.as_bytes()), Extent::Tree)?;
                systematic::reduce(arena, angle_at, ctx, interrupt)?;
            }
        }
        NodeType::Mult => {
            if apply_rules(arena, at)? {
                return Ok(true);
            }
            let replacement = beautify_product(arena.tree(at))?;
            return replace(arena, at, replacement);
        }
        NodeType::Add => {
            let replacement = beautify_sum(arena.tree(at))?;
            return replace(arena, at, replacement);
        }
        NodeType::Pow => {
            if apply_rules(arena, at)? {
                return Ok(true);
            }
            let replacement = beautify_power(arena.tree(at));
            return replace(arena, at, replacement);
        }
        _ => {}
    }
    apply_rules(arena, at)
}

fn apply_rules(arena: &mut Arena, at: NodeOffset) -> CalcResult<bool> {
    for rule in BEAUTIFY.iter() {
        if rule.apply_at(arena, at)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn replace(arena: &mut Arena, at: NodeOffset, replacement: Option<OwnedTree>) -> CalcResult<bool> {
    let Some(replacement) = replacement else {
        return Ok(false);
    };
    arena.replace_at(at, Extent::Tree, RawSource::Bytes(replacement.as_bytes()), Extent::Tree)?;
    Ok(true)
}

fn negative_exponent(tree: TreeRef<'_>) -> Option<(TreeRef<'_>, Number)> {
    if !tree.is(NodeType::Pow) {
        return None;
    }
    let exponent = Number::read(tree.child(1)?)?;
    if exponent.is_negative() { Some((tree.child(0)?, exponent)) } else { None }
}

/// `base^(-e)` written as the denominator factor `base^e`.
fn denominator_factor(base: TreeRef<'_>, exponent: &Number) -> CalcResult<OwnedTree> {
    let positive = exponent.mul(&Number::integer(-1));
    Ok(if positive.is_one() && !positive.is_float() {
        OwnedTree::from_tree(base)
    } else {
        pow(OwnedTree::from_tree(base), OwnedTree::number(&positive)?)
    })
}

fn product_or_single(mut factors: Vec<OwnedTree>) -> CalcResult<OwnedTree> {
    match factors.len() {
        0 => Ok(int(1)),
        1 => Ok(factors.remove(0)),
        _ => OwnedTree::node(NodeType::Mult, &[], factors),
    }
}

/// `a·b^-1 -> a/b`, `(-1)·a -> -a`, `(1/2)·a -> a/2`.
fn beautify_product(product: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    let mut negative = false;
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for (index, factor) in product.children().enumerate() {
        if let (0, Some(Number::Rational(r))) = (index, Number::read(factor)) {
            // -1 and negative fractions become an opposite, other integers stay in front.
            negative = r.is_negative() && (!r.is_integer() || r.numerator().abs().is_one());
            let magnitude = if negative { r.abs() } else { r };
            if !magnitude.numerator().is_one() {
                numerator.push(number(Number::integer(magnitude.numerator().clone())));
            }
            if !magnitude.is_integer() {
                denominator.push(number(Number::integer(magnitude.denominator().clone())));
            }
            continue;
        }
        match negative_exponent(factor) {
            Some((base, exponent)) => denominator.push(denominator_factor(base, &exponent)?),
            None => numerator.push(OwnedTree::from_tree(factor)),
        }
    }
    if denominator.is_empty() && !negative {
        return Ok(None);
    }
    let magnitude = if denominator.is_empty() {
        product_or_single(numerator)?
    } else {
        div(product_or_single(numerator)?, product_or_single(denominator)?)
    };
    Ok(Some(if negative { opposite(magnitude) } else { magnitude }))
}

/// `a + (-1)·b + c -> (a - b) + c`: negative terms after the first become subtractions,
/// associated to the left.
fn beautify_sum(sum: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    let mut terms = sum.children();
    let Some(first) = terms.next() else {
        return Ok(None);
    };
    let mut pending = vec![OwnedTree::from_tree(first)];
    let mut changed = false;
    for term in terms {
        match negated(term)? {
            Some(positive) => {
                let left = if pending.len() == 1 {
                    pending.remove(0)
                } else {
                    OwnedTree::node(NodeType::Add, &[], pending.drain(..))?
                };
                pending.push(sub(left, positive));
                changed = true;
            }
            None => pending.push(OwnedTree::from_tree(term)),
        }
    }
    if !changed {
        return Ok(None);
    }
    product_or_sum(pending).map(Some)
}

fn product_or_sum(mut terms: Vec<OwnedTree>) -> CalcResult<OwnedTree> {
    if terms.len() == 1 {
        Ok(terms.remove(0))
    } else {
        OwnedTree::node(NodeType::Add, &[], terms)
    }
}

/// `x^-n -> 1/x^n` and `x^(1/n) -> root(x, n)`.
fn beautify_power(power: TreeRef<'_>) -> Option<OwnedTree> {
    if let Some((base, exponent)) = negative_exponent(power) {
        return denominator_factor(base, &exponent).ok().map(|d| div(int(1), d));
    }
    let base = power.child(0)?;
    let exponent = Number::read(power.child(1)?)?;
    let r = exponent.as_rational()?;
    if r.is_integer() || !r.numerator().is_one() {
        return None;
    }
    Some(nth_root(
        OwnedTree::from_tree(base),
        number(Number::integer(r.denominator().clone())),
    ))
}
