//! Matching a pattern against a concrete tree.
//!
//! Children of n-ary nodes are matched positionally. When a variadic placeholder meets a
//! child list, the search tries every admissible number of trees for it, smallest first,
//! and backtracks when the rest of the pattern fails. The leftmost variadic placeholder is
//! therefore the one that binds as few trees as possible:
//!
//! ```
//! use hycas::pattern::match_tree;
//! use hycas::pattern::placeholder::Tag;
//! use hycas::tree::owned::shapes::*;
//!
//! let pattern = add([Tag::A.zero_or_more(), Tag::B.one_or_more()]);
//! let subject = add([sym("x"), sym("y"), sym("z")]);
//! let bindings = match_tree(pattern.root(), subject.root()).unwrap();
//! assert_eq!(bindings.get(Tag::A).unwrap().len(), 0);
//! assert_eq!(bindings.get(Tag::B).unwrap().len(), 3);
//! ```
//!
//! Bindings are a small `Copy` array. Each alternative works on a copy and the caller's
//! bindings are only overwritten on success, so a failed match never leaves partial state.
use std::fmt;

use smallvec::SmallVec;

use crate::pattern::placeholder::{Filter, Placeholder, Tag};
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;

/// The consecutive sibling trees bound to one placeholder.
#[derive(Clone, Copy)]
pub struct Binding<'a> {
    first: Option<TreeRef<'a>>,
    len: usize,
}

impl<'a> Binding<'a> {
    /// Bind a run of consecutive sibling trees.
    pub fn of(trees: &[TreeRef<'a>]) -> Self {
        debug_assert!(
            trees.windows(2).all(|w| w[0].next_tree_offset() == w[1].offset()),
            "bound trees must be consecutive siblings"
        );
        Self {
            first: trees.first().copied(),
            len: trees.len(),
        }
    }

    pub fn single(tree: TreeRef<'a>) -> Self {
        Self {
            first: Some(tree),
            len: 1,
        }
    }

    pub fn empty() -> Self {
        Self { first: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The only bound tree, for scalar bindings.
    pub fn tree(&self) -> Option<TreeRef<'a>> {
        if self.len == 1 { self.first } else { None }
    }

    pub fn trees(self) -> impl Iterator<Item = TreeRef<'a>> {
        // The successor is only built while more trees are bound: the last one may end the
        // buffer.
        let first = self.first;
        (0..self.len).scan(first, |next, _| {
            let tree = (*next)?;
            let end = tree.next_tree_offset();
            *next = (end < tree.buffer().len()).then(|| TreeRef::new(tree.buffer(), end));
            Some(tree)
        })
    }

    /// All bound trees as one contiguous byte run.
    pub fn bytes(&self) -> &'a [u8] {
        match self.first {
            Some(first) => {
                let end = self.trees().last().map_or(first.offset(), |t| t.next_tree_offset());
                &first.buffer()[first.offset()..end]
            }
            None => &[],
        }
    }

    fn same_as(&self, trees: &[TreeRef<'_>]) -> bool {
        self.len == trees.len() && self.trees().zip(trees).all(|(a, b)| a.tree_is_identical(b))
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.trees()).finish()
    }
}

/// Placeholder bindings produced by a successful match.
#[derive(Clone, Copy, Default)]
pub struct Bindings<'a> {
    slots: [Option<Binding<'a>>; Tag::COUNT],
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, tag: Tag) -> Option<Binding<'a>> {
        self.slots[tag.index()]
    }

    /// The tree bound to a scalar placeholder.
    pub fn tree(&self, tag: Tag) -> Option<TreeRef<'a>> {
        self.get(tag).and_then(|b| b.tree())
    }

    pub fn set(&mut self, tag: Tag, binding: Binding<'a>) {
        self.slots[tag.index()] = Some(binding);
    }

    /// Builder-style [`Bindings::set`].
    pub fn with(mut self, tag: Tag, binding: Binding<'a>) -> Self {
        self.set(tag, binding);
        self
    }

    pub fn is_bound(&self, tag: Tag) -> bool {
        self.slots[tag.index()].is_some()
    }

    /// Bind `tag` to `trees`, or check that an earlier binding holds the same content.
    fn bind(&mut self, tag: Tag, trees: &[TreeRef<'a>]) -> bool {
        match self.get(tag) {
            Some(bound) => bound.same_as(trees),
            None => {
                self.set(tag, Binding::of(trees));
                true
            }
        }
    }
}

impl fmt::Debug for Bindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (index, slot) in self.slots.iter().enumerate() {
            if let (Some(binding), Some(tag)) = (slot, Tag::from_repr(index as u8)) {
                map.entry(&tag, binding);
            }
        }
        map.finish()
    }
}

/// Match `pattern` against `subject`. Pure: nothing is modified.
pub fn match_tree<'a>(pattern: TreeRef<'_>, subject: TreeRef<'a>) -> Option<Bindings<'a>> {
    let mut bindings = Bindings::new();
    match_with(pattern, subject, &mut bindings).then_some(bindings)
}

/// Match with bindings already in place, for instance to force a placeholder to a known
/// value. `bindings` is only updated on success.
pub fn match_with<'a>(
    pattern: TreeRef<'_>,
    subject: TreeRef<'a>,
    bindings: &mut Bindings<'a>,
) -> bool {
    let mut attempt = *bindings;
    if match_node(pattern, subject, &mut attempt) {
        *bindings = attempt;
        true
    } else {
        false
    }
}

fn match_node<'a>(pattern: TreeRef<'_>, subject: TreeRef<'a>, bindings: &mut Bindings<'a>) -> bool {
    if let Some(placeholder) = Placeholder::read(pattern) {
        // Outside a child list a variadic placeholder stands for exactly one tree.
        return bindings.bind(placeholder.tag, &[subject]);
    }
    let node_type = pattern.node_type();
    if node_type != subject.node_type() {
        return squashed(pattern, subject, bindings);
    }
    if node_type.is_nary() {
        let patterns = pattern.children_vec();
        let subjects = subject.children_vec();
        return match_sequence(&patterns, &subjects, bindings);
    }
    if pattern.payload() != subject.payload() {
        return false;
    }
    pattern
        .children()
        .zip(subject.children())
        .all(|(p, s)| match_node(p, s, bindings))
}

/// `Add`/`Mult` patterns also match a lone term: `A* · x` matches `x` with `A` empty.
fn squashed<'a>(pattern: TreeRef<'_>, subject: TreeRef<'a>, bindings: &mut Bindings<'a>) -> bool {
    if !matches!(pattern.node_type(), NodeType::Add | NodeType::Mult) {
        return false;
    }
    let patterns = pattern.children_vec();
    match_sequence(&patterns, &[subject], bindings)
}

/// Smallest number of trees a pattern child consumes.
fn min_trees(pattern: TreeRef<'_>) -> usize {
    match Placeholder::read(pattern) {
        Some(p) => p.filter.min_trees(),
        None => 1,
    }
}

fn match_sequence<'a>(
    patterns: &[TreeRef<'_>],
    subjects: &[TreeRef<'a>],
    bindings: &mut Bindings<'a>,
) -> bool {
    let Some((&pattern, rest)) = patterns.split_first() else {
        return subjects.is_empty();
    };
    match Placeholder::read(pattern) {
        Some(Placeholder { tag, filter }) if filter != Filter::One => {
            if let Some(bound) = bindings.get(tag) {
                let n = bound.len();
                return n <= subjects.len()
                    && bound.same_as(&subjects[..n])
                    && match_sequence(rest, &subjects[n..], bindings);
            }
            let reserved: usize = rest.iter().map(|p| min_trees(*p)).sum();
            let Some(most) = subjects.len().checked_sub(reserved) else {
                return false;
            };
            for n in filter.min_trees()..=most {
                let saved = *bindings;
                bindings.set(tag, Binding::of(&subjects[..n]));
                if match_sequence(rest, &subjects[n..], bindings) {
                    return true;
                }
                *bindings = saved;
            }
            false
        }
        _ => {
            let Some((&subject, others)) = subjects.split_first() else {
                return false;
            };
            let saved = *bindings;
            if match_node(pattern, subject, bindings) && match_sequence(rest, others, bindings) {
                return true;
            }
            *bindings = saved;
            false
        }
    }
}

/// Whether `pattern` matches anywhere in `tree`; returns the first matching node in preorder.
pub fn find_match<'a>(pattern: TreeRef<'_>, tree: TreeRef<'a>) -> Option<(TreeRef<'a>, Bindings<'a>)> {
    tree.descendants()
        .find_map(|node| match_tree(pattern, node).map(|b| (node, b)))
}

/// Collect the trees bound to `tag` into a vector, mostly for assertions.
pub fn bound_trees<'a>(bindings: &Bindings<'a>, tag: Tag) -> SmallVec<[TreeRef<'a>; 4]> {
    bindings.get(tag).map(|b| b.trees().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::owned::shapes::*;

    #[test]
    fn scalar_placeholders() {
        let pattern = pow(Tag::A.one(), Tag::B.one());
        let subject = pow(sym("x"), int(2));
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        assert_eq!(b.tree(Tag::A).unwrap(), sym("x").root());
        assert_eq!(b.tree(Tag::B).unwrap(), int(2).root());
        assert!(match_tree(pattern.root(), sym("x").root()).is_none());
    }

    #[test]
    fn repeated_placeholder_requires_identical_content() {
        let pattern = add([Tag::A.one(), mult([int(-1), Tag::A.one()])]);
        let same = add([sym("x"), mult([int(-1), sym("x")])]);
        let other = add([sym("x"), mult([int(-1), sym("y")])]);
        assert!(match_tree(pattern.root(), same.root()).is_some());
        assert!(match_tree(pattern.root(), other.root()).is_none());
    }

    #[test]
    fn variadic_split_is_smallest_first() {
        let pattern = add([Tag::A.zero_or_more(), sym("x"), Tag::B.zero_or_more()]);
        let subject = add([int(1), sym("x"), sym("x"), int(2)]);
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        assert_eq!(bound_trees(&b, Tag::A).len(), 1);
        assert_eq!(bound_trees(&b, Tag::B).len(), 2);
    }

    #[test]
    fn backtracking_finds_later_split() {
        // The first `x` is followed by `1`, so A must grow past it.
        let pattern = add([Tag::A.zero_or_more(), sym("x"), int(2)]);
        let subject = add([sym("x"), int(1), sym("x"), int(2)]);
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        assert_eq!(bound_trees(&b, Tag::A).len(), 2);
    }

    #[test]
    fn one_or_more_needs_a_tree() {
        let pattern = mult([Tag::A.one_or_more(), sym("x")]);
        assert!(match_tree(pattern.root(), mult([sym("x")]).root()).is_none());
        assert!(match_tree(pattern.root(), mult([int(2), sym("x")]).root()).is_some());
    }

    #[test]
    fn squashed_subject() {
        let pattern = mult([Tag::A.zero_or_more(), sym("x")]);
        let subject = sym("x");
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        assert!(b.get(Tag::A).unwrap().is_empty());
        assert!(match_tree(pattern.root(), sym("y").root()).is_none());
    }

    #[test]
    fn failed_match_leaves_bindings_untouched() {
        let mut bindings = Bindings::new();
        let pattern = add([Tag::A.one(), Tag::A.one()]);
        let subject = add([int(1), int(2)]);
        assert!(!match_with(pattern.root(), subject.root(), &mut bindings));
        assert!(!bindings.is_bound(Tag::A));
    }

    #[test]
    fn prebound_placeholder_constrains_the_match() {
        let x = sym("x");
        let mut bindings = Bindings::new().with(Tag::A, Binding::single(x.root()));
        let pattern = ln(Tag::A.one());
        let other = ln(sym("y"));
        assert!(!match_with(pattern.root(), other.root(), &mut bindings));
        let subject = ln(sym("x"));
        assert!(match_with(pattern.root(), subject.root(), &mut bindings));
    }

    #[test]
    fn binding_bytes_cover_the_run() {
        let subject = add([int(1), sym("ab"), int(3)]);
        let pattern = add([int(1), Tag::B.one_or_more()]);
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        let binding = b.get(Tag::B).unwrap();
        let expected: Vec<u8> = [sym("ab"), int(3)]
            .iter()
            .flat_map(|t| t.as_bytes().to_vec())
            .collect();
        assert_eq!(binding.bytes(), expected.as_slice());
    }

    #[test]
    fn run_ending_the_buffer_lists_its_trees() {
        let subject = add([int(1), sym("y"), ln(sym("z"))]);
        let pattern = add([Tag::A.one(), Tag::B.one_or_more()]);
        let b = match_tree(pattern.root(), subject.root()).unwrap();
        let trees = bound_trees(&b, Tag::B);
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0], sym("y").root());
        assert_eq!(trees[1], ln(sym("z")).root());
        assert_eq!(trees[1].next_tree_offset(), subject.as_bytes().len());
    }

    #[test]
    fn find_first_match_in_preorder() {
        let tree = add([int(1), ln(exp(sym("y")))]);
        let pattern = exp(Tag::A.one());
        let (node, b) = find_match(pattern.root(), tree.root()).unwrap();
        assert_eq!(node.node_type(), NodeType::Exp);
        assert_eq!(b.tree(Tag::A).unwrap(), sym("y").root());
    }
}
