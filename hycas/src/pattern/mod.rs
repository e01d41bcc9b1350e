//! The rewrite engine: placeholder patterns, matching and construction.
//!
//! A pattern is an ordinary tree that may contain [`placeholder`] nodes. [`match_tree`] tests
//! a pattern against a tree and returns [`Bindings`]; [`build`] instantiates another tree
//! (the structure) from them. [`match_and_replace`] combines both with a replacement in the
//! arena.
//!
//! ```
//! use hycas::prelude::*;
//! use hycas::tree::owned::shapes::*;
//!
//! let mut arena = Arena::new();
//! let h = arena.push_tree(&ln(exp(sym("x")))).unwrap();
//! let pattern = ln(exp(Tag::A.one()));
//! match_and_replace(&mut arena, h, &pattern, &Tag::A.one()).unwrap();
//! assert_eq!(arena.snapshot_tree(h).unwrap(), sym("x"));
//! ```
pub mod builder;
pub mod matcher;
pub mod placeholder;

pub use builder::build;
pub use matcher::{Binding, Bindings, find_match, match_tree, match_with};

use crate::error::{CalcError, CalcResult};
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::handle::Handle;
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::owned::OwnedTree;

/// Replace the tree behind `target` by `structure` instantiated from the bindings of
/// `pattern`. On [`CalcError::NoMatch`] the target is left unchanged, and the handle keeps
/// pointing at the rewritten tree on success.
pub fn match_and_replace(
    arena: &mut Arena,
    target: Handle,
    pattern: &OwnedTree,
    structure: &OwnedTree,
) -> CalcResult<()> {
    let at = arena.resolve(target)?;
    match_and_replace_at(arena, at, pattern.root(), structure.root()).map(|_| ())
}

/// Build a new root-level tree from the bindings of `pattern` against `source`, leaving the
/// source untouched. Returns a handle on the new tree.
pub fn match_and_create(
    arena: &mut Arena,
    source: Handle,
    pattern: &OwnedTree,
    structure: &OwnedTree,
) -> CalcResult<Handle> {
    let built = {
        let subject = arena.get(source)?;
        let bindings = match_tree(pattern.root(), subject).ok_or(CalcError::NoMatch)?;
        build(structure.root(), &bindings)?
    };
    arena.push_tree(&built)
}

/// Offset-based [`match_and_replace`]. Returns the offset of the rewritten tree.
pub(crate) fn match_and_replace_at(
    arena: &mut Arena,
    at: NodeOffset,
    pattern: TreeRef<'_>,
    structure: TreeRef<'_>,
) -> CalcResult<NodeOffset> {
    let built = {
        let bindings = match_tree(pattern, arena.tree(at)).ok_or(CalcError::NoMatch)?;
        build(structure, &bindings)?
    };
    arena.replace_at(at, Extent::Tree, RawSource::Bytes(built.as_bytes()), Extent::Tree)
}

/// A named rewrite rule `pattern -> structure`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub pattern: OwnedTree,
    pub structure: OwnedTree,
}

impl Rule {
    pub fn new(name: &'static str, pattern: OwnedTree, structure: OwnedTree) -> Self {
        Self {
            name,
            pattern,
            structure,
        }
    }

    /// Rewrite the tree at `at` if the rule matches. A successful match whose result is
    /// identical to the input does not count as a change.
    pub(crate) fn apply_at(&self, arena: &mut Arena, at: NodeOffset) -> CalcResult<bool> {
        let built = {
            let subject = arena.tree(at);
            let Some(bindings) = match_tree(self.pattern.root(), subject) else {
                return Ok(false);
            };
            let built = build(self.structure.root(), &bindings)?;
            if built.root().tree_is_identical(&subject) {
                return Ok(false);
            }
            built
        };
        log::trace!("rule {} applies", self.name);
        arena.replace_at(at, Extent::Tree, RawSource::Bytes(built.as_bytes()), Extent::Tree)?;
        Ok(true)
    }
}
