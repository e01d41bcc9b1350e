//! Canonical total order over trees.
//!
//! Commutative operators sort their children with [`compare`]. Two trees compare equal if
//! and only if their encodings are identical.
use std::cmp::Ordering;

use crate::number::Number;
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;

pub fn compare(a: TreeRef<'_>, b: TreeRef<'_>) -> Ordering {
    let (ta, tb) = (a.node_type(), b.node_type());
    if ta > tb {
        return compare(b, a).reverse();
    }
    if ta.is_number() && tb.is_number() {
        return compare_numbers(a, b);
    }
    if ta < tb {
        return compare_different_types(a, b);
    }

    if ta.is_user_named() {
        let names = compare_names(a, b);
        if names.is_ne() {
            return names;
        }
    }
    // Leaves with a payload.
    if ta.arity() == crate::tree::node_type::Arity::Fixed(0) {
        return a.payload().cmp(b.payload());
    }
    compare_children(a, b, matches!(ta, NodeType::Add | NodeType::Mult))
}

/// Whether `subtree` occurs anywhere in `tree`.
pub fn contains_subtree(tree: TreeRef<'_>, subtree: TreeRef<'_>) -> bool {
    tree.descendants().any(|node| node.tree_is_identical(&subtree))
}

fn compare_numbers(a: TreeRef<'_>, b: TreeRef<'_>) -> Ordering {
    match (Number::read(a), Number::read(b)) {
        (Some(x), Some(y)) => x
            .compare(&y)
            .then_with(|| a.node_type().cmp(&b.node_type()))
            .then_with(|| a.payload().cmp(b.payload())),
        _ => a.node_bytes().cmp(b.node_bytes()),
    }
}

/// `a` has a strictly smaller type than `b`.
fn compare_different_types(a: TreeRef<'_>, b: TreeRef<'_>) -> Ordering {
    match a.node_type() {
        // 1/x < x < x^2, and x < y^2
        NodeType::Pow => match (a.child(0), a.child(1)) {
            (Some(base), Some(exponent)) if compare(base, b).is_eq() => {
                compare(exponent, TreeRef::new(&[ONE], 0))
            }
            _ => Ordering::Greater,
        },
        // sin(x) < 1 + cos(x) < tan(x)
        NodeType::Add | NodeType::Mult => compare_last_child(a, b),
        _ => Ordering::Less,
    }
}

const ONE: u8 = NodeType::One as u8;

fn compare_last_child(a: TreeRef<'_>, b: TreeRef<'_>) -> Ordering {
    let count = a.number_of_children();
    match count.checked_sub(1).and_then(|last| a.child(last)) {
        Some(last) => match compare(last, b) {
            Ordering::Equal => Ordering::Greater,
            other => other,
        },
        None => Ordering::Less,
    }
}

fn compare_names(a: TreeRef<'_>, b: TreeRef<'_>) -> Ordering {
    let (na, nb) = (a.name().unwrap_or(""), b.name().unwrap_or(""));
    na.as_bytes().cmp(nb.as_bytes())
}

/// Children pairwise, from the last ones backwards for sums and products, then the child
/// count (more children sorts first).
fn compare_children(a: TreeRef<'_>, b: TreeRef<'_>, backward: bool) -> Ordering {
    let ca = a.children_vec();
    let cb = b.children_vec();
    let common = ca.len().min(cb.len());
    let pairs: Box<dyn Iterator<Item = (TreeRef<'_>, TreeRef<'_>)>> = if backward {
        Box::new(
            ca[ca.len() - common..]
                .iter()
                .rev()
                .copied()
                .zip(cb[cb.len() - common..].iter().rev().copied()),
        )
    } else {
        Box::new(ca.iter().copied().zip(cb.iter().copied()))
    };
    for (x, y) in pairs {
        let order = compare(x, y);
        if order.is_ne() {
            return order;
        }
    }
    cb.len().cmp(&ca.len())
}
