//! Merging like terms of sums and like factors of products.
//!
//! These work on a [`TreeRef`] and return the replacement as an [`OwnedTree`], or `None` when
//! nothing merges. Flattening and sorting are done in place by the arena beforehand.
use smallvec::SmallVec;

use crate::error::CalcResult;
use crate::number::Number;
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;

/// An n-ary node over copies of `children`. At most 255 children.
pub(crate) fn nary_of(node_type: NodeType, children: &[TreeRef<'_>]) -> OwnedTree {
    debug_assert!(node_type.is_nary() && children.len() <= u8::MAX as usize);
    let mut bytes = vec![node_type.tag(), children.len() as u8];
    for child in children {
        bytes.extend_from_slice(child.tree_bytes());
    }
    OwnedTree::from_raw(bytes)
}

/// The product of `factors`, squashed: `1` when empty, the factor itself when alone.
pub(crate) fn product_of(factors: &[TreeRef<'_>]) -> OwnedTree {
    match factors {
        [] => OwnedTree::leaf(NodeType::One),
        [single] => OwnedTree::from_tree(*single),
        _ => nary_of(NodeType::Mult, factors),
    }
}

/// Split a term into its numeric coefficient and the rest: `3·x·y` gives `(3, x·y)`.
pub(crate) fn split_coefficient(term: TreeRef<'_>) -> (Number, OwnedTree) {
    if term.is(NodeType::Mult) {
        let children = term.children_vec();
        if let Some((first, rest)) = children.split_first() {
            if let Some(n) = Number::read(*first) {
                return (n, product_of(rest));
            }
        }
    }
    (Number::integer(1), OwnedTree::from_tree(term))
}

/// `coefficient · rest`, with the coefficient merged into `rest` when it is a product.
pub(crate) fn with_coefficient(coefficient: &Number, rest: &OwnedTree) -> CalcResult<OwnedTree> {
    if coefficient.is_one() && !coefficient.is_float() {
        return Ok(rest.clone());
    }
    let number = OwnedTree::number(coefficient)?;
    let mut children = vec![number];
    if rest.node_type() == NodeType::Mult {
        children.extend(rest.root().children().map(OwnedTree::from_tree));
    } else {
        children.push(rest.clone());
    }
    OwnedTree::node(NodeType::Mult, &[], children)
}

/// `-term` if `term` carries a negative sign (a negative number, or a product led by one).
pub(crate) fn negated(term: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    if let Some(n) = Number::read(term) {
        return if n.is_negative() {
            OwnedTree::number(&n.mul(&Number::integer(-1))).map(Some)
        } else {
            Ok(None)
        };
    }
    let (coefficient, rest) = split_coefficient(term);
    if !coefficient.is_negative() {
        return Ok(None);
    }
    with_coefficient(&coefficient.mul(&Number::integer(-1)), &rest).map(Some)
}

/// Merge the numbers and the like terms of a sum: `2 + x + 3 + 2·x` gives `5 + 3·x`.
/// Zero terms disappear.
pub(crate) fn merge_terms(sum: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    let mut constant: Option<Number> = None;
    let mut terms: SmallVec<[(Number, OwnedTree); 8]> = SmallVec::new();
    let mut changed = false;
    for child in sum.children() {
        if let Some(n) = Number::read(child) {
            changed |= constant.is_some() || n.is_zero();
            constant = Some(match constant {
                Some(c) => c.add(&n),
                None => n,
            });
            continue;
        }
        let (coefficient, rest) = split_coefficient(child);
        match terms.iter_mut().find(|(_, r)| *r == rest) {
            Some((c, _)) => {
                *c = c.add(&coefficient);
                changed = true;
            }
            None => terms.push((coefficient, rest)),
        }
    }
    if !changed {
        return Ok(None);
    }

    let mut children = Vec::with_capacity(terms.len() + 1);
    if let Some(c) = constant.filter(|c| !c.is_zero()) {
        children.push(OwnedTree::number(&c)?);
    }
    for (coefficient, rest) in &terms {
        if !coefficient.is_zero() {
            children.push(with_coefficient(coefficient, rest)?);
        }
    }
    OwnedTree::node(NodeType::Add, &[], children).map(Some)
}

/// Exponent accumulated for one base while merging factors.
#[derive(Debug)]
struct Exponent {
    numeric: Option<Number>,
    symbolic: SmallVec<[OwnedTree; 2]>,
}

impl Exponent {
    fn of(tree: TreeRef<'_>) -> Self {
        match Number::read(tree) {
            Some(n) => Self {
                numeric: Some(n),
                symbolic: SmallVec::new(),
            },
            None => Self {
                numeric: None,
                symbolic: smallvec::smallvec![OwnedTree::from_tree(tree)],
            },
        }
    }

    fn one() -> Self {
        Self {
            numeric: Some(Number::integer(1)),
            symbolic: SmallVec::new(),
        }
    }

    fn merge(&mut self, other: Exponent) {
        self.numeric = match (self.numeric.take(), other.numeric) {
            (Some(a), Some(b)) => Some(a.add(&b)),
            (a, b) => a.or(b),
        };
        self.symbolic.extend(other.symbolic);
    }

    /// `Some(n)` when the exponent is the plain number `n`.
    fn as_number(&self) -> Option<&Number> {
        if self.symbolic.is_empty() { self.numeric.as_ref() } else { None }
    }

    fn to_tree(&self) -> CalcResult<OwnedTree> {
        let mut terms = Vec::with_capacity(self.symbolic.len() + 1);
        if let Some(n) = self.numeric.as_ref().filter(|n| !n.is_zero()) {
            terms.push(OwnedTree::number(n)?);
        }
        terms.extend(self.symbolic.iter().cloned());
        match terms.len() {
            0 => Ok(OwnedTree::leaf(NodeType::Zero)),
            1 => Ok(terms.remove(0)),
            _ => OwnedTree::node(NodeType::Add, &[], terms),
        }
    }
}

/// Merge the numbers and the factors sharing a base in a product: `2·x·3·x^a` gives
/// `6·x^(1 + a)`. A zero factor absorbs the product, a one factor disappears.
pub(crate) fn merge_factors(product: TreeRef<'_>) -> CalcResult<Option<OwnedTree>> {
    let mut coefficient: Option<Number> = None;
    let mut factors: SmallVec<[(TreeRef<'_>, Exponent); 8]> = SmallVec::new();
    let mut changed = false;
    for child in product.children() {
        if let Some(n) = Number::read(child) {
            if n.is_zero() {
                return OwnedTree::number(&n).map(Some);
            }
            changed |= coefficient.is_some() || n.is_one();
            coefficient = Some(match coefficient {
                Some(c) => c.mul(&n),
                None => n,
            });
            continue;
        }
        let (base, exponent) = match (child.is(NodeType::Pow), child.child(0), child.child(1)) {
            (true, Some(base), Some(exponent)) => (base, Exponent::of(exponent)),
            _ => (child, Exponent::one()),
        };
        match factors.iter_mut().find(|(b, _)| b.tree_is_identical(&base)) {
            Some((_, e)) => {
                e.merge(exponent);
                changed = true;
            }
            None => factors.push((base, exponent)),
        }
    }
    if !changed {
        return Ok(None);
    }

    let mut children = Vec::with_capacity(factors.len() + 1);
    if let Some(c) = coefficient.filter(|c| !c.is_one()) {
        children.push(OwnedTree::number(&c)?);
    }
    for (base, exponent) in &factors {
        match exponent.as_number() {
            Some(n) if n.is_zero() => {}
            Some(n) if n.is_one() => children.push(OwnedTree::from_tree(*base)),
            _ => children.push(OwnedTree::node(
                NodeType::Pow,
                &[],
                [OwnedTree::from_tree(*base), exponent.to_tree()?],
            )?),
        }
    }
    OwnedTree::node(NodeType::Mult, &[], children).map(Some)
}
