//! Systematic reduction: the deterministic rewrites that always make a tree simpler.
//!
//! Nodes are reduced bottom-up, so every node sees reduced children. A round is repeated
//! until it no longer changes anything, because reducing a parent can create new reducible
//! children (`(x·y)^2` becomes `x^2·y^2`).
//!
//! Per node type:
//!
//! - `Add` and `Mult`: flattened, like terms or factors merged, sorted, squashed.
//! - `Pow`: numeric folding, neutral exponents, `(x^a)^n` and `(x·y)^n` for integer `n`.
//! - `Exp`, `Ln`, `Abs`, `Factorial`: exact values and mutual inverses.
//! - `Trig` and `ATrig`: exact values on multiples of `π/12`, parity, `k mod 4`.
//! - `Undefined` and `NonReal` propagate through every operator.
use num_integer::Integer;

use crate::error::CalcResult;
use crate::number::{Number, Rational};
use crate::reduction::approximation::{approximate, float_tree};
use crate::reduction::context::ProjectionContext;
use crate::reduction::interrupt::{Interrupt, check};
use crate::reduction::nary::{merge_factors, merge_terms, negated};
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::node_type::{ConstantKind, NodeType};
use crate::tree::owned::OwnedTree;
use crate::tree::owned::shapes::{int, mult, nonreal, number, pi, pow, rational, trig, undefined};
use crate::tree::walker::apply_bottom_up;

/// Rounds of bottom-up reduction before giving up on reaching a fixed point.
pub const MAX_SYSTEMATIC_ROUNDS: usize = 32;

/// Rewrites applied to a single node before moving on to its parent.
const MAX_SHALLOW_STEPS: usize = 16;

/// Reduce the tree at `at` until a round leaves it unchanged. Returns whether anything
/// changed. Polls `interrupt` once per visited node.
pub fn reduce(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let mut changed = false;
    for _ in 0..MAX_SYSTEMATIC_ROUNDS {
        let round = apply_bottom_up(arena, at, |arena, node| {
            check(interrupt)?;
            shallow_reduce(arena, node, ctx)
        })?;
        if !round {
            return Ok(changed);
        }
        changed = true;
    }
    log::debug!("systematic reduction stopped after {MAX_SYSTEMATIC_ROUNDS} rounds");
    Ok(changed)
}

/// Reduce the node at `at` alone, assuming its children are reduced.
pub fn shallow_reduce(arena: &mut Arena, at: NodeOffset, ctx: &ProjectionContext) -> CalcResult<bool> {
    let mut changed = false;
    for _ in 0..MAX_SHALLOW_STEPS {
        if !step(arena, at, ctx)? {
            return Ok(changed);
        }
        changed = true;
    }
    log::trace!("node at {at} still reducible after {MAX_SHALLOW_STEPS} steps");
    Ok(changed)
}

fn step(arena: &mut Arena, at: NodeOffset, ctx: &ProjectionContext) -> CalcResult<bool> {
    let tree = arena.tree(at);
    let node_type = tree.node_type();
    if let Some(marker) = propagated_marker(tree) {
        return rewrite(arena, at, Some(OwnedTree::leaf(marker)));
    }
    match node_type {
        NodeType::Add => reduce_add(arena, at),
        NodeType::Mult => reduce_mult(arena, at),
        NodeType::Set => reduce_set(arena, at),
        NodeType::Pow => {
            let replacement = reduce_pow(tree, ctx)?;
            rewrite(arena, at, replacement)
        }
        NodeType::Exp
        | NodeType::Ln
        | NodeType::Abs
        | NodeType::Factorial
        | NodeType::Trig
        | NodeType::ATrig => {
            let replacement = reduce_function(tree, ctx)?;
            rewrite(arena, at, replacement)
        }
        _ => Ok(false),
    }
}

fn rewrite(arena: &mut Arena, at: NodeOffset, replacement: Option<OwnedTree>) -> CalcResult<bool> {
    let Some(replacement) = replacement else {
        return Ok(false);
    };
    if replacement.root().tree_is_identical(&arena.tree(at)) {
        return Ok(false);
    }
    arena.replace_at(at, Extent::Tree, RawSource::Bytes(replacement.as_bytes()), Extent::Tree)?;
    Ok(true)
}

/// `Undefined` or `NonReal` if a child of an operator is one. Containers keep them.
fn propagated_marker(tree: TreeRef<'_>) -> Option<NodeType> {
    let node_type = tree.node_type();
    if node_type.is_layout()
        || matches!(
            node_type,
            NodeType::List | NodeType::Set | NodeType::Dependency | NodeType::Placeholder
        )
    {
        return None;
    }
    let mut marker = None;
    for child in tree.children() {
        match child.node_type() {
            NodeType::Undefined => return Some(NodeType::Undefined),
            NodeType::NonReal => marker = Some(NodeType::NonReal),
            _ => {}
        }
    }
    marker
}

fn reduce_add(arena: &mut Arena, at: NodeOffset) -> CalcResult<bool> {
    let mut changed = arena.flatten_at(at)?;
    if let Some(merged) = merge_terms(arena.tree(at))? {
        changed |= rewrite(arena, at, Some(merged))?;
    }
    if arena.tree(at).is(NodeType::Add) {
        changed |= arena.sort_at(at);
        changed |= arena.squash_at(at)?;
    }
    Ok(changed)
}

fn reduce_mult(arena: &mut Arena, at: NodeOffset) -> CalcResult<bool> {
    let mut changed = arena.flatten_at(at)?;
    if let Some(merged) = merge_factors(arena.tree(at))? {
        changed |= rewrite(arena, at, Some(merged))?;
    }
    if arena.tree(at).is(NodeType::Mult) {
        changed |= arena.sort_at(at);
        changed |= arena.squash_at(at)?;
    }
    Ok(changed)
}

/// Sets are sorted and hold each element once.
fn reduce_set(arena: &mut Arena, at: NodeOffset) -> CalcResult<bool> {
    let mut changed = arena.sort_at(at);
    let mut index = 1;
    loop {
        let set = arena.tree(at);
        let (Some(previous), Some(current)) = (set.child(index - 1), set.child(index)) else {
            break;
        };
        if previous.tree_is_identical(&current) {
            arena.remove_child_at(at, index)?;
            changed = true;
        } else {
            index += 1;
        }
    }
    Ok(changed)
}

fn is_positive_number(tree: TreeRef<'_>) -> bool {
    Number::read(tree).is_some_and(|v| !v.is_negative() && !v.is_zero())
}

fn exact_integer(number: &Number) -> Option<i64> {
    number
        .as_rational()
        .filter(|r| r.is_integer())
        .and_then(Rational::to_i64)
}

/// Whether a negative base raised to `exponent` leaves the reals.
fn leaves_reals(exponent: &Number) -> bool {
    match exponent {
        Number::Rational(r) => !r.is_integer() && r.denominator().is_even(),
        Number::Float(f) => f.fract() != 0.0,
    }
}

fn reduce_pow(node: TreeRef<'_>, ctx: &ProjectionContext) -> CalcResult<Option<OwnedTree>> {
    let (Some(base), Some(exponent)) = (node.child(0), node.child(1)) else {
        return Ok(None);
    };
    let base_value = Number::read(base);
    let exponent_value = Number::read(exponent);

    if let (Some(b), Some(e)) = (&base_value, &exponent_value) {
        if b.is_zero() {
            return if e.is_negative() || e.is_zero() {
                Ok(Some(undefined()))
            } else {
                OwnedTree::number(b).map(Some)
            };
        }
        if let Some(value) = b.pow(e) {
            return OwnedTree::number(&value).map(Some);
        }
        if ctx.is_real() && b.is_negative() && leaves_reals(e) {
            return Ok(Some(nonreal()));
        }
        return Ok(None);
    }

    if let Some(e) = &exponent_value {
        if e.is_zero() {
            return Ok(Some(if e.is_float() { float_tree(1.0) } else { int(1) }));
        }
        if e.is_one() && !e.is_float() {
            return Ok(Some(OwnedTree::from_tree(base)));
        }
    }
    if let Some(b) = &base_value {
        if b.is_one() {
            return OwnedTree::number(b).map(Some);
        }
    }

    if exponent_value.as_ref().and_then(exact_integer).is_some() {
        let n = OwnedTree::from_tree(exponent);
        if base.is(NodeType::Pow) {
            if let (Some(inner), Some(inner_exponent)) = (base.child(0), base.child(1)) {
                // (x^a)^n = x^(a·n) needs an integer a or a non-negative x
                let integer_inner = Number::read(inner_exponent)
                    .as_ref()
                    .and_then(exact_integer)
                    .is_some();
                let nonnegative_inner = Number::read(inner).is_some_and(|v| !v.is_negative());
                if !integer_inner && !nonnegative_inner {
                    return Ok(None);
                }
                return Ok(Some(pow(
                    OwnedTree::from_tree(inner),
                    mult([OwnedTree::from_tree(inner_exponent), n]),
                )));
            }
        }
        if base.is(NodeType::Mult) {
            let factors = base
                .children()
                .map(|factor| pow(OwnedTree::from_tree(factor), n.clone()));
            return OwnedTree::node(NodeType::Mult, &[], factors).map(Some);
        }
    }
    Ok(None)
}

/// Evaluate a function of float numbers to a float.
fn contaminated(node: TreeRef<'_>, ctx: &ProjectionContext) -> Option<OwnedTree> {
    let children = node.children_vec();
    let all_numbers = children.iter().all(|c| c.is_number());
    if !all_numbers || !children.iter().any(|c| c.is(NodeType::Float)) {
        return None;
    }
    approximate(node, ctx).map(|value| {
        if value.is_nan() && ctx.is_real() {
            nonreal()
        } else {
            float_tree(value)
        }
    })
}

fn reduce_function(node: TreeRef<'_>, ctx: &ProjectionContext) -> CalcResult<Option<OwnedTree>> {
    if let Some(value) = contaminated(node, ctx) {
        return Ok(Some(value));
    }
    let Some(argument) = node.child(0) else {
        return Ok(None);
    };
    let value = Number::read(argument);
    let replacement = match node.node_type() {
        NodeType::Exp => match &value {
            Some(v) if v.is_zero() => Some(int(1)),
            // Over the reals, exp(ln x) = x only holds for x > 0
            _ if argument.is(NodeType::Ln) => argument
                .child(0)
                .filter(|&x| !ctx.is_real() || is_positive_number(x))
                .map(OwnedTree::from_tree),
            _ => None,
        },
        NodeType::Ln => match &value {
            Some(v) if v.is_one() => Some(int(0)),
            Some(v) if v.is_zero() => Some(undefined()),
            Some(v) if v.is_negative() && ctx.is_real() => Some(nonreal()),
            _ if argument.is(NodeType::Exp) => argument.child(0).map(OwnedTree::from_tree),
            _ => None,
        },
        NodeType::Abs => match &value {
            Some(Number::Rational(r)) => Some(number(Number::Rational(r.abs()))),
            _ if argument.is(NodeType::Abs) => Some(OwnedTree::from_tree(argument)),
            _ => None,
        },
        NodeType::Factorial => match value.as_ref().and_then(Number::as_rational) {
            Some(r) if !r.is_integer() || r.is_negative() => Some(undefined()),
            Some(r) => r.factorial().map(|f| number(Number::Rational(f))),
            _ => None,
        },
        NodeType::Trig => return reduce_trig(node),
        NodeType::ATrig => reduce_atrig(node, ctx),
        _ => None,
    };
    Ok(replacement)
}

/// `Trig(x, k)` is `cos(x - k·π/2)`: `k = 0` is cosine and `k = 1` is sine.
fn reduce_trig(node: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    let (Some(angle), Some(kind)) = (node.child(0), node.child(1)) else {
        return Ok(None);
    };
    let Some(k) = Number::read(kind).as_ref().and_then(exact_integer) else {
        return Ok(None);
    };
    if k != 0 && k != 1 {
        // Trig(x, k + 2) = -Trig(x, k)
        let quarter = k.rem_euclid(4);
        let canonical = trig(OwnedTree::from_tree(angle), int(quarter % 2));
        return Ok(Some(if quarter >= 2 {
            mult([int(-1), canonical])
        } else {
            canonical
        }));
    }

    if let Some(twelfths) = pi_twelfths(angle) {
        // sin(x) = cos(x - π/2)
        return Ok(cos_of_twelfths(twelfths - 6 * k));
    }

    // cos(-x) = cos(x), sin(-x) = -sin(x)
    if let Some(positive) = negated(angle)? {
        let reflected = trig(positive, int(k));
        return Ok(Some(if k == 1 {
            mult([int(-1), reflected])
        } else {
            reflected
        }));
    }
    Ok(None)
}

/// `n` such that `angle = n·π/12`, for `0`, `π` and rational multiples of `π`.
fn pi_twelfths(angle: TreeRef<'_>) -> Option<i64> {
    let is_pi = |t: TreeRef<'_>| t.is(NodeType::Constant) && t.constant() == Some(ConstantKind::Pi);
    let multiple = if angle.is_zero() {
        Rational::integer(0)
    } else if is_pi(angle) {
        Rational::integer(1)
    } else if angle.is(NodeType::Mult) && angle.number_of_children() == 2 {
        let (coefficient, constant) = (angle.child(0)?, angle.child(1)?);
        if !is_pi(constant) {
            return None;
        }
        Number::read(coefficient)?.as_rational()?.clone()
    } else {
        return None;
    };
    let twelfths = multiple.mul(&Rational::integer(12));
    if twelfths.is_integer() { twelfths.to_i64() } else { None }
}

/// Exact `cos(n·π/12)` when it has a short closed form.
fn cos_of_twelfths(n: i64) -> Option<OwnedTree> {
    let n = n.rem_euclid(24);
    let n = if n > 12 { 24 - n } else { n };
    // cos(π - x) = -cos(x)
    let (m, sign) = if n > 6 { (12 - n, -1) } else { (n, 1) };
    let value = match m {
        0 => int(sign),
        2 => mult([rational(sign, 2), pow(int(3), rational(1, 2))]),
        3 => mult([rational(sign, 2), pow(int(2), rational(1, 2))]),
        4 => rational(sign, 2),
        6 => int(0),
        _ => return None,
    };
    Some(value)
}

/// `ATrig(x, 0)` is arc cosine and `ATrig(x, 1)` arc sine.
fn reduce_atrig(node: TreeRef<'_>, ctx: &ProjectionContext) -> Option<OwnedTree> {
    let value = Number::read(node.child(0)?)?;
    let k = exact_integer(&Number::read(node.child(1)?)?)?;
    let x = value.as_rational()?;
    if x.abs() > Rational::integer(1) {
        return ctx.is_real().then(nonreal);
    }
    // acos(x) as a multiple of π.
    let doubled = x.mul(&Rational::integer(2));
    let arc_cosine = match doubled.to_i64()? {
        2 => Rational::integer(0),
        1 => Rational::from_i64_pair(1, 3)?,
        0 => Rational::from_i64_pair(1, 2)?,
        -1 => Rational::from_i64_pair(2, 3)?,
        -2 => Rational::integer(1),
        _ => return None,
    };
    let multiple = match k {
        0 => arc_cosine,
        // asin(x) = π/2 - acos(x)
        1 => Rational::from_i64_pair(1, 2)?.add(&arc_cosine.neg()),
        _ => return None,
    };
    Some(pi_multiple(multiple))
}

fn pi_multiple(multiple: Rational) -> OwnedTree {
    if multiple.is_zero() {
        int(0)
    } else if multiple.is_one() {
        pi()
    } else {
        mult([number(Number::Rational(multiple)), pi()])
    }
}
