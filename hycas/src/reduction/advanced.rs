//! Advanced reduction: a bounded search over expansions and contractions.
//!
//! Systematic reduction never makes a tree bigger, so it cannot find `ln(6)` from
//! `ln(2) + ln(3)` through `ln(2·3)` or cancel terms that only appear after distributing a
//! product. Advanced reduction explores sequences of [`Direction`]s: move the cursor to
//! another node, then expand or contract there. After every expansion or contraction the
//! whole tree is reduced systematically, hashed, and skipped if already seen. The smallest
//! tree found (by encoded size) wins and its path is replayed on the arena.
//!
//! Exploration is depth-first and bounded three ways by [`EngineConfig`]: path length,
//! number of candidate evaluations, and number of remembered states. Every candidate runs
//! under a nested checkpoint and is rolled back once explored.
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use smallvec::SmallVec;

use crate::config::EngineConfig;
use crate::error::{CalcError, CalcResult};
use crate::number::Number;
use crate::reduction::context::ProjectionContext;
use crate::reduction::interrupt::{Interrupt, check};
use crate::reduction::nary::nary_of;
use crate::reduction::rules::{CONTRACT, EXPAND};
use crate::reduction::systematic;
use crate::tree::arena::Arena;
use crate::tree::edit::{Extent, RawSource};
use crate::tree::node::{NodeOffset, TreeRef};
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;
use crate::tree::owned::shapes::{int, pow};

/// One step of an exploration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Move the cursor this many nodes forward in preorder.
    NextNode(u8),
    /// Contract the node under the cursor, then reset the cursor to the root.
    Contract,
    /// Expand the node under the cursor, then reset the cursor to the root.
    Expand,
}

impl Direction {
    #[inline]
    fn is_edit(self) -> bool {
        !matches!(self, Direction::NextNode(_))
    }
}

/// A sequence of directions. Consecutive cursor moves are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    directions: SmallVec<[Direction; 16]>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Append an edit at preorder index `index` from the current cursor.
    fn push(&mut self, mut index: usize, edit: Direction) {
        debug_assert!(edit.is_edit());
        while index > 0 {
            let step = index.min(u8::MAX as usize);
            match self.directions.last_mut() {
                Some(Direction::NextNode(k)) if (*k as usize) + step <= u8::MAX as usize => {
                    *k += step as u8;
                }
                _ => self.directions.push(Direction::NextNode(step as u8)),
            }
            index -= step;
        }
        self.directions.push(edit);
    }

    /// Remove the last edit and the cursor moves leading to it.
    fn pop(&mut self) {
        if let Some(last) = self.directions.pop() {
            debug_assert!(last.is_edit());
        }
        while matches!(self.directions.last(), Some(Direction::NextNode(_))) {
            self.directions.pop();
        }
    }
}

/// Run advanced reduction on the tree at `at`. Returns whether a smaller tree was found.
pub fn reduce(
    arena: &mut Arena,
    at: NodeOffset,
    ctx: &ProjectionContext,
    config: &EngineConfig,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<bool> {
    let mut explorer = Explorer {
        ctx,
        config,
        interrupt,
        visited: HashSet::new(),
        steps: 0,
        path: Path::default(),
        best_path: Path::default(),
        best_size: arena.tree(at).tree_size(),
    };
    explorer.remember(arena.tree(at));
    explorer.explore(arena, at)?;
    log::debug!(
        "advanced reduction: {} candidates, {} states, best path {:?}",
        explorer.steps,
        explorer.visited.len(),
        explorer.best_path.directions()
    );
    if explorer.best_path.is_empty() {
        return Ok(false);
    }
    let best = explorer.best_path;
    replay(arena, at, &best, ctx, config, explorer.interrupt)?;
    Ok(true)
}

/// Apply `path` to the tree at `at`.
pub fn replay(
    arena: &mut Arena,
    at: NodeOffset,
    path: &Path,
    ctx: &ProjectionContext,
    config: &EngineConfig,
    interrupt: &mut dyn Interrupt,
) -> CalcResult<()> {
    let mut cursor = 0usize;
    for direction in path.directions() {
        match *direction {
            Direction::NextNode(k) => cursor += k as usize,
            edit => {
                let node = nth_node(arena.tree(at), cursor)
                    .ok_or_else(|| CalcError::Malformed(format!("path leaves the tree at node {cursor}")))?;
                if !apply(arena, node, edit, config)? {
                    return Err(CalcError::Malformed(format!("{edit:?} does not apply at node {cursor}")));
                }
                systematic::reduce(arena, at, ctx, interrupt)?;
                cursor = 0;
            }
        }
    }
    Ok(())
}

struct Explorer<'c> {
    ctx: &'c ProjectionContext,
    config: &'c EngineConfig,
    interrupt: &'c mut dyn Interrupt,
    visited: HashSet<u64>,
    steps: usize,
    path: Path,
    best_path: Path,
    best_size: usize,
}

impl Explorer<'_> {
    /// Record a state. Returns false if it was seen before or the state set is full.
    fn remember(&mut self, tree: TreeRef<'_>) -> bool {
        let mut hasher = DefaultHasher::new();
        tree.tree_bytes().hash(&mut hasher);
        let key = hasher.finish();
        if self.visited.len() >= self.config.max_visited_states {
            return false;
        }
        self.visited.insert(key)
    }

    fn explore(&mut self, arena: &mut Arena, at: NodeOffset) -> CalcResult<()> {
        if self.path.len() >= self.config.max_path_length {
            return Ok(());
        }
        let nodes = arena.tree(at).number_of_nodes();
        for index in 0..nodes {
            for edit in [Direction::Contract, Direction::Expand] {
                if self.steps >= self.config.max_advanced_steps {
                    return Ok(());
                }
                self.steps += 1;
                check(self.interrupt)?;

                let checkpoint = arena.checkpoint();
                let explored = self.try_edit(arena, at, index, edit);
                arena.rollback(checkpoint);
                match explored {
                    Ok(()) => {}
                    Err(err) if err.is_recoverable() && !matches!(err, CalcError::Cancelled) => {
                        log::trace!("skipping {edit:?} at node {index}: {err}");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    fn try_edit(
        &mut self,
        arena: &mut Arena,
        at: NodeOffset,
        index: usize,
        edit: Direction,
    ) -> CalcResult<()> {
        let Some(node) = nth_node(arena.tree(at), index) else {
            return Ok(());
        };
        if !apply(arena, node, edit, self.config)? {
            return Ok(());
        }
        systematic::reduce(arena, at, self.ctx, self.interrupt)?;
        if !self.remember(arena.tree(at)) {
            return Ok(());
        }

        self.path.push(index, edit);
        let size = arena.tree(at).tree_size();
        if size < self.best_size {
            self.best_size = size;
            self.best_path = self.path.clone();
        }
        let explored = self.explore(arena, at);
        self.path.pop();
        explored
    }
}

fn nth_node(tree: TreeRef<'_>, index: usize) -> Option<NodeOffset> {
    tree.descendants().nth(index).map(|node| node.offset())
}

/// Expand or contract the node at `at` alone. Returns whether it changed.
fn apply(arena: &mut Arena, at: NodeOffset, edit: Direction, config: &EngineConfig) -> CalcResult<bool> {
    let rules = match edit {
        Direction::Expand => {
            if let Some(expanded) = expand_power(arena.tree(at), config)? {
                arena.replace_at(at, Extent::Tree, RawSource::Bytes(expanded.as_bytes()), Extent::Tree)?;
                return Ok(true);
            }
            &*EXPAND
        }
        Direction::Contract => &*CONTRACT,
        Direction::NextNode(_) => return Ok(false),
    };
    for rule in rules {
        if rule.apply_at(arena, at)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `(a + b + …)^n` as `a·(a + b + …)^(n-1) + b·(a + b + …)^(n-1) + …` for an integer
/// `2 <= n <= max_expanded_power`.
fn expand_power(tree: TreeRef<'_>, config: &EngineConfig) -> CalcResult<Option<OwnedTree>> {
    if !tree.is(NodeType::Pow) {
        return Ok(None);
    }
    let (Some(sum), Some(exponent)) = (tree.child(0), tree.child(1)) else {
        return Ok(None);
    };
    let n = Number::read(exponent)
        .as_ref()
        .and_then(Number::as_rational)
        .and_then(|r| r.to_i64());
    let Some(n) = n.filter(|n| (2..=i64::from(config.max_expanded_power)).contains(n)) else {
        return Ok(None);
    };
    if !sum.is(NodeType::Add) {
        return Ok(None);
    }
    let rest = pow(OwnedTree::from_tree(sum), int(n - 1));
    let terms = sum.children().map(|term| {
        let factors = [term, rest.root()];
        nary_of(NodeType::Mult, &factors)
    });
    OwnedTree::node(NodeType::Add, &[], terms).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduction::interrupt::{InterruptAfter, NeverInterrupt};
    use crate::tree::owned::shapes::*;

    fn systematic(tree: &OwnedTree) -> OwnedTree {
        let mut arena = Arena::new();
        let at = arena.push(tree).unwrap();
        systematic::reduce(&mut arena, at, &ProjectionContext::default(), &mut NeverInterrupt).unwrap();
        arena.to_owned_tree(at)
    }

    fn advanced(tree: &OwnedTree) -> OwnedTree {
        let mut arena = Arena::new();
        let at = arena.push(&systematic(tree)).unwrap();
        let config = EngineConfig::default();
        reduce(&mut arena, at, &ProjectionContext::default(), &config, &mut NeverInterrupt).unwrap();
        assert!(arena.is_well_formed());
        arena.to_owned_tree(at)
    }

    #[test]
    fn path_merges_cursor_moves() {
        let mut path = Path::default();
        path.push(3, Direction::Expand);
        path.push(0, Direction::Contract);
        path.push(300, Direction::Expand);
        assert_eq!(
            path.directions(),
            &[
                Direction::NextNode(3),
                Direction::Expand,
                Direction::Contract,
                Direction::NextNode(255),
                Direction::NextNode(45),
                Direction::Expand,
            ]
        );
        path.pop();
        assert_eq!(path.len(), 3);
        path.pop();
        path.pop();
        assert!(path.is_empty());
    }

    #[test]
    fn logarithms_contract() {
        let reduced = advanced(&add([ln(sym("x")), ln(sym("y"))]));
        assert_eq!(reduced, ln(mult([sym("x"), sym("y")])));
        assert_eq!(advanced(&add([ln(int(2)), ln(int(3))])), ln(int(6)));
    }

    #[test]
    fn exponentials_contract() {
        let reduced = advanced(&mult([exp(sym("x")), exp(mult([int(-1), sym("x")]))]));
        assert_eq!(reduced, int(1));
    }

    #[test]
    fn expansion_can_cancel_terms() {
        // x·(x + 1) - x^2 is x once distributed.
        let tree = add([
            mult([sym("x"), add([sym("x"), int(1)])]),
            mult([int(-1), pow(sym("x"), int(2))]),
        ]);
        assert_eq!(advanced(&tree), sym("x"));
    }

    #[test]
    fn small_powers_expand() {
        let square = pow(add([sym("a"), sym("b")]), int(2));
        let expanded = expand_power(square.root(), &EngineConfig::default()).unwrap().unwrap();
        assert_eq!(
            expanded,
            add([
                mult([sym("a"), pow(add([sym("a"), sym("b")]), int(1))]),
                mult([sym("b"), pow(add([sym("a"), sym("b")]), int(1))]),
            ])
        );
        let cube = pow(add([sym("a"), sym("b")]), int(9));
        assert!(expand_power(cube.root(), &EngineConfig::default()).unwrap().is_none());
    }

    #[test]
    fn already_minimal_trees_stay() {
        let tree = add([sym("a"), sym("b")]);
        let mut arena = Arena::new();
        let at = arena.push(&tree).unwrap();
        let config = EngineConfig::default();
        let changed = reduce(&mut arena, at, &ProjectionContext::default(), &config, &mut NeverInterrupt).unwrap();
        assert!(!changed);
        assert_eq!(arena.to_owned_tree(at), tree);
    }

    #[test]
    fn cancellation_rolls_back_candidates() {
        let tree = systematic(&add([ln(sym("x")), ln(sym("y"))]));
        let mut arena = Arena::new();
        let at = arena.push(&tree).unwrap();
        let before = arena.bytes().to_vec();
        let config = EngineConfig::default();
        let result = reduce(&mut arena, at, &ProjectionContext::default(), &config, &mut InterruptAfter::new(3));
        assert!(matches!(result, Err(CalcError::Cancelled)));
        assert_eq!(arena.bytes(), before.as_slice());
    }
}
