//! Real-valued float evaluation of scalar trees.
use num_integer::Integer;
use num_traits::ToPrimitive;
use smallvec::SmallVec;

use crate::error::CalcResult;
use crate::number::Number;
use crate::reduction::context::ProjectionContext;
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::node_type::{ConstantKind, NodeType};
use crate::tree::owned::shapes::{float, undefined};
use crate::tree::owned::OwnedTree;
use crate::tree::walker::apply_top_down;

/// Largest integer whose factorial is a finite `f64`.
const MAX_FLOAT_FACTORIAL: u32 = 170;

/// Evaluate `tree` to a real float.
///
/// Returns `None` when the tree cannot be evaluated at all (it contains symbols, lists or
/// layouts) and `Some(NaN)` when it evaluates to something undefined or not real.
///
/// The evaluation is iterative: nodes are visited in reverse preorder, so every child has
/// been evaluated and pushed on the value stack before its parent pops it.
pub fn approximate(tree: TreeRef<'_>, ctx: &ProjectionContext) -> Option<f64> {
    let nodes: SmallVec<[TreeRef<'_>; 32]> = tree.descendants().collect();
    let mut values: Vec<f64> = Vec::with_capacity(nodes.len());
    for node in nodes.iter().rev() {
        let arity = node.number_of_children();
        if values.len() < arity {
            return None;
        }
        // The first child is on top of the stack.
        let args: SmallVec<[f64; 4]> = values.drain(values.len() - arity..).rev().collect();
        values.push(evaluate_node(*node, &args, ctx)?);
    }
    values.pop()
}

fn evaluate_node(node: TreeRef<'_>, args: &[f64], ctx: &ProjectionContext) -> Option<f64> {
    use NodeType::*;

    let unit = ctx.angle_unit.radians_per_unit();
    let arg = |i: usize| args.get(i).copied().unwrap_or(f64::NAN);
    let value = match node.node_type() {
        t if t.is_number() => Number::read(node)?.to_f64(),
        Constant => match node.constant()? {
            ConstantKind::I => f64::NAN,
            kind => kind.value()?,
        },
        Add => args.iter().sum(),
        Mult => args.iter().product(),
        Pow => power(arg(0), arg(1), node.child(1)),
        Sub => arg(0) - arg(1),
        Div => arg(0) / arg(1),
        Opposite => -arg(0),
        Sqrt => arg(0).sqrt(),
        NthRoot => root(arg(0), arg(1)),
        Exp => arg(0).exp(),
        Ln => arg(0).ln(),
        Log => arg(0).log10(),
        Logarithm => arg(0).ln() / arg(1).ln(),
        Abs => arg(0).abs(),
        Factorial => factorial(arg(0)),
        Trig => (arg(0) - arg(1) * std::f64::consts::FRAC_PI_2).cos(),
        ATrig => match arg(1) {
            k if k == 0.0 => arg(0).acos(),
            k if k == 1.0 => arg(0).asin(),
            _ => f64::NAN,
        },
        Cos => (arg(0) * unit).cos(),
        Sin => (arg(0) * unit).sin(),
        Tan => (arg(0) * unit).tan(),
        ACos => arg(0).acos() / unit,
        ASin => arg(0).asin() / unit,
        ATan => arg(0).atan() / unit,
        Dependency => arg(0),
        Undefined | NonReal => f64::NAN,
        _ => return None,
    };
    Some(value)
}

/// `base^exponent`, keeping real odd roots of negative numbers when the exponent is an exact
/// rational with an odd denominator.
fn power(base: f64, exponent: f64, exponent_tree: Option<TreeRef<'_>>) -> f64 {
    if base >= 0.0 || exponent.fract() == 0.0 {
        return base.powf(exponent);
    }
    let odd_denominator = exponent_tree
        .and_then(Number::read)
        .and_then(|n| n.as_rational().map(|r| (r.numerator().is_odd(), r.denominator().is_odd())));
    match odd_denominator {
        Some((odd_numerator, true)) => {
            let magnitude = (-base).powf(exponent);
            if odd_numerator { -magnitude } else { magnitude }
        }
        _ => f64::NAN,
    }
}

fn root(radicand: f64, index: f64) -> f64 {
    if radicand < 0.0 && index.fract() == 0.0 && (index as i64) % 2 != 0 {
        -(-radicand).powf(1.0 / index)
    } else {
        radicand.powf(1.0 / index)
    }
}

fn factorial(n: f64) -> f64 {
    if n < 0.0 || n.fract() != 0.0 {
        return f64::NAN;
    }
    match n.to_u32() {
        Some(n) if n <= MAX_FLOAT_FACTORIAL => (1..=n).map(f64::from).product(),
        _ => f64::INFINITY,
    }
}

/// The float node for `value`; non-finite values become `Undefined`.
pub fn float_tree(value: f64) -> OwnedTree {
    if value.is_finite() { float(value) } else { undefined() }
}

/// Replace scalars by floats in the tree at `at`.
///
/// With `numbers_only`, only exact number nodes are converted. Otherwise every maximal
/// subtree that evaluates is collapsed into one float node. Returns whether anything
/// changed.
pub fn approximate_scalars(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    numbers_only: bool,
) -> CalcResult<bool> {
    apply_top_down(arena, at, |arena, node| {
        let tree = arena.tree(node);
        if tree.is(NodeType::Float) || tree.is(NodeType::Undefined) {
            return Ok(false);
        }
        let value = if numbers_only {
            if !tree.is_number() {
                return Ok(false);
            }
            Number::read(tree).map(|n| n.to_f64())
        } else {
            approximate(tree, ctx)
        };
        let Some(value) = value else {
            return Ok(false);
        };
        let replacement = float_tree(value);
        arena.replace_at(node, Extent::Tree, RawSource::Bytes(replacement.as_bytes()), Extent::Tree)?;
        Ok(true)
    })
}
