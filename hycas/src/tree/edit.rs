//! Structural edit primitives.
//!
//! Every mutation goes through the raw byte operations of [`Arena`], so handles follow the
//! content they point at. The primitives keep the buffer well-formed: removing or inserting
//! next to a child of an n-ary node updates the parent's child count, and edits that would
//! orphan children are rejected with [`CalcError::Malformed`].
//!
//! Public entry points take [`Handle`]s. The `*_at` variants work on raw offsets and are
//! used by the rewrite engine while it holds the buffer exclusively.

use crate::error::{CalcError, CalcResult};
use crate::tree::arena::{Arena, Placement};
use crate::tree::comparison::compare;
use crate::tree::handle::Handle;
use crate::tree::node::{MAX_NARY_CHILDREN, NodeOffset};
use crate::tree::node_type::{Arity, NodeType};
use crate::tree::owned::OwnedTree;

/// How much of a tree an edit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// The root node only; its children stay where they are.
    Node,
    /// The root node and all its descendants.
    Tree,
}

/// Where replacement or inserted content comes from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Fresh content built outside the arena.
    Owned(&'a OwnedTree),
    /// A copy of a tree in the arena; the original is untouched.
    Clone(Handle),
    /// A tree in the arena, removed from its old position. Handles on it follow.
    Move(Handle),
}

/// Where to insert.
#[derive(Debug, Clone, Copy)]
pub enum Position {
    Before(Handle),
    After(Handle),
    /// A new root-level tree at the end of the buffer.
    End,
}

/// Internal form of [`Source`] once handles are resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RawSource<'a> {
    Bytes(&'a [u8]),
    Copy(NodeOffset),
    Move(NodeOffset),
}

impl Arena {
    fn resolve_source<'a>(&self, source: Source<'a>) -> CalcResult<RawSource<'a>> {
        Ok(match source {
            Source::Owned(tree) => RawSource::Bytes(tree.as_bytes()),
            Source::Clone(handle) => RawSource::Copy(self.resolve(handle)?),
            Source::Move(handle) => RawSource::Move(self.resolve(handle)?),
        })
    }

    /// Bytes of `source` restricted to `extent`, copied out of the buffer.
    fn source_bytes(&self, source: RawSource<'_>, extent: Extent) -> CalcResult<Vec<u8>> {
        let bytes = match source {
            RawSource::Bytes(bytes) => bytes,
            RawSource::Copy(at) | RawSource::Move(at) => self.tree(at).tree_bytes(),
        };
        let tree = crate::tree::node::TreeRef::new(bytes, 0);
        Ok(match extent {
            Extent::Tree => tree.tree_bytes().to_vec(),
            Extent::Node => tree.node_bytes().to_vec(),
        })
    }

    // Clone

    /// Copy a tree (or its root node) to the end of the buffer and register a handle on it.
    ///
    /// Cloning only the root node is allowed for nodes that can stand without children:
    /// leaves and n-ary nodes (which are cloned empty).
    pub fn clone_tree(&mut self, handle: Handle, extent: Extent) -> CalcResult<Handle> {
        let at = self.resolve(handle)?;
        let copy = self.clone_at(at, extent)?;
        self.register_or_truncate(copy)
    }

    pub(crate) fn clone_at(&mut self, at: NodeOffset, extent: Extent) -> CalcResult<NodeOffset> {
        let bytes = match extent {
            Extent::Tree => self.tree(at).tree_bytes().to_vec(),
            Extent::Node => standalone_node(self.tree(at).node_bytes())?,
        };
        self.push_bytes(&bytes)
    }

    fn register_or_truncate(&mut self, at: NodeOffset) -> CalcResult<Handle> {
        match self.register(at) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.truncate(at);
                Err(err)
            }
        }
    }

    // Insert and move

    /// Insert a tree before, after or at the end. Inserting next to a child of an n-ary node
    /// makes it a new sibling; a fixed-arity parent cannot gain a child.
    ///
    /// Returns a handle on the inserted tree. With [`Source::Move`] the source handle keeps
    /// tracking the tree as well.
    pub fn insert(&mut self, position: Position, source: Source<'_>) -> CalcResult<Handle> {
        let raw = self.resolve_source(source)?;
        let anchor = match position {
            Position::Before(h) | Position::After(h) => Some(self.resolve(h)?),
            Position::End => None,
        };
        self.atomically(|arena| {
            let at = match (position, anchor) {
                (Position::Before(_), Some(anchor)) => arena.insert_sibling_at(anchor, false, raw)?,
                (Position::After(_), Some(anchor)) => arena.insert_sibling_at(anchor, true, raw)?,
                _ => arena.insert_root(raw)?,
            };
            arena.register(at)
        })
    }

    fn insert_root(&mut self, source: RawSource<'_>) -> CalcResult<NodeOffset> {
        match source {
            RawSource::Move(src) => {
                let len = self.tree(src).tree_size();
                self.detach_at(src)?;
                Ok(self.size() - len)
            }
            _ => {
                let bytes = self.source_bytes(source, Extent::Tree)?;
                self.push_bytes(&bytes)
            }
        }
    }

    fn insert_sibling_at(
        &mut self,
        anchor: NodeOffset,
        after: bool,
        source: RawSource<'_>,
    ) -> CalcResult<NodeOffset> {
        let parent = match self.placement(anchor) {
            Placement::Root => None,
            Placement::NAryChild { parent, .. } => Some(parent),
            Placement::FixedChild { parent, .. } => {
                return Err(CalcError::Malformed(format!(
                    "cannot add a sibling under fixed-arity {:?}",
                    self.tree(parent).node_type()
                )));
            }
        };
        if let Some(parent) = parent {
            if self.tree(parent).number_of_children() >= MAX_NARY_CHILDREN {
                return Err(CalcError::Malformed("too many children".into()));
            }
        }

        // Bring moved content to the end of the buffer first; it is then a root-level tree.
        let (mut anchor, mut parent) = (anchor, parent);
        let (src, len) = match source {
            RawSource::Move(src) => {
                if self.contains(src, anchor) {
                    return Err(CalcError::Malformed("cannot insert a tree next to itself".into()));
                }
                let len = self.tree(src).tree_size();
                let filler = matches!(self.placement(src), Placement::FixedChild { .. }) as usize;
                self.detach_at(src)?;
                // Content after the detached tree moved back by its size, minus the filler leaf.
                let shift = |offset: NodeOffset| {
                    if offset > src {
                        offset + filler - len
                    } else {
                        offset
                    }
                };
                anchor = shift(anchor);
                parent = parent.map(shift);
                (self.size() - len, len)
            }
            _ => {
                let bytes = self.source_bytes(source, Extent::Tree)?;
                let at = self.push_bytes(&bytes)?;
                (at, bytes.len())
            }
        };
        let dst = if after {
            self.tree(anchor).next_tree_offset()
        } else {
            anchor
        };
        self.move_bytes(dst, src, len);
        if let Some(parent) = parent {
            self.bump_child_count(parent, 1)?;
        }
        Ok(dst)
    }

    // Detach

    /// Detach a tree from its parent, turning it into a root-level tree at the end of the
    /// buffer. The handle keeps tracking it.
    ///
    /// An n-ary parent loses one child. A fixed-arity parent keeps its arity: the hole is
    /// filled with a `0` leaf.
    pub fn detach(&mut self, handle: Handle) -> CalcResult<()> {
        let at = self.resolve(handle)?;
        self.detach_at(at).map(|_| ())
    }

    /// Returns the offset of the detached tree (at the end of the buffer).
    pub(crate) fn detach_at(&mut self, at: NodeOffset) -> CalcResult<NodeOffset> {
        let len = self.tree(at).tree_size();
        match self.placement(at) {
            Placement::Root => {}
            Placement::NAryChild { parent, .. } => {
                self.bump_child_count(parent, -1)?;
            }
            Placement::FixedChild { .. } => {
                self.ensure_room(1)?;
                self.insert_bytes(at + len, &[NodeType::Zero.tag()])?;
            }
        }
        let end = self.size();
        self.move_bytes(end, at, len);
        Ok(end - len)
    }

    // Replace

    /// Replace the target with new content.
    ///
    /// - `target_extent` selects what is overwritten: the target's root node (its children
    ///   are kept and adopted by the new node) or its whole tree.
    /// - `source_extent` selects what is written: the source's root node or its whole tree.
    ///
    /// Handles inside the overwritten range become uninitialized, except handles on the
    /// target root, which follow the new content. The target handle stays valid, so one
    /// handle can be held across many successive rewrites.
    ///
    /// Node-over-node requires the new node to accept the target's children (same arity, or
    /// n-ary). Tree-over-node requires the target node to be a leaf. Node-over-tree requires
    /// the new node to need no children. A moved source must be a root-level tree or lie
    /// inside a whole-tree target.
    pub fn replace(
        &mut self,
        target: Handle,
        target_extent: Extent,
        source: Source<'_>,
        source_extent: Extent,
    ) -> CalcResult<()> {
        let at = self.resolve(target)?;
        let source = self.resolve_source(source)?;
        self.replace_at(at, target_extent, source, source_extent)
            .map(|_| ())
    }

    /// Shorthand for the tree-over-tree replacement with owned content.
    pub fn replace_tree(&mut self, target: Handle, tree: &OwnedTree) -> CalcResult<()> {
        self.replace(target, Extent::Tree, Source::Owned(tree), Extent::Tree)
    }

    pub(crate) fn replace_at(
        &mut self,
        at: NodeOffset,
        target_extent: Extent,
        source: RawSource<'_>,
        source_extent: Extent,
    ) -> CalcResult<NodeOffset> {
        let target = self.tree(at);
        let old_len = match target_extent {
            Extent::Node => target.node_size(),
            Extent::Tree => target.tree_size(),
        };
        let kept_children = match target_extent {
            Extent::Node => target.number_of_children(),
            Extent::Tree => 0,
        };

        if let (RawSource::Move(src), Extent::Tree) = (source, source_extent) {
            if src == at && target_extent == Extent::Tree {
                return Ok(at);
            }
            return self.move_over(at, old_len, target_extent, src);
        }

        let mut bytes = self.source_bytes(source, source_extent)?;
        if source_extent == Extent::Node {
            adopt_children(&mut bytes, kept_children)?;
        } else if kept_children != 0 {
            return Err(CalcError::Malformed(
                "replacing a node that has children by a whole tree would orphan them".into(),
            ));
        }

        let root_handles = self.handles.handles_at(at);
        match source {
            RawSource::Move(src) => {
                // Node extent move: the header is copied and the source tree disappears.
                let inside_target = target_extent == Extent::Tree && self.contains(at, src);
                if !inside_target && self.placement(src) != Placement::Root {
                    return Err(CalcError::Malformed(
                        "moved content must be a root-level tree".into(),
                    ));
                }
                let source_handles = self.handles.handles_at(src);
                let mut at = at;
                if !inside_target {
                    if self.contains(src, at) {
                        return Err(CalcError::Malformed("cannot move a tree into itself".into()));
                    }
                    let src_len = self.tree(src).tree_size();
                    let final_size = self.size() - src_len - old_len + bytes.len();
                    if final_size > self.capacity() {
                        return Err(CalcError::CapacityExceeded {
                            requested: final_size,
                            capacity: self.capacity(),
                        });
                    }
                    self.remove_bytes(src, src_len);
                    if src < at {
                        at -= src_len;
                    }
                }
                self.splice_bytes(at, old_len, &bytes)?;
                for handle in root_handles.into_iter().chain(source_handles) {
                    self.handles.redirect(handle, at);
                }
                Ok(at)
            }
            _ => {
                self.splice_bytes(at, old_len, &bytes)?;
                for handle in root_handles {
                    self.handles.redirect(handle, at);
                }
                Ok(at)
            }
        }
    }

    /// Move a whole tree over the target without copying.
    fn move_over(
        &mut self,
        at: NodeOffset,
        old_len: usize,
        target_extent: Extent,
        src: NodeOffset,
    ) -> CalcResult<NodeOffset> {
        let new_len = self.tree(src).tree_size();
        let inside_target = self.contains(at, src) && target_extent == Extent::Tree;
        if target_extent == Extent::Node && self.tree(at).number_of_children() != 0 {
            return Err(CalcError::Malformed(
                "replacing a node that has children by a whole tree would orphan them".into(),
            ));
        }
        if !inside_target {
            if self.placement(src) != Placement::Root {
                return Err(CalcError::Malformed(
                    "moved content must be a root-level tree".into(),
                ));
            }
            if self.contains(src, at) {
                return Err(CalcError::Malformed("cannot move a tree into itself".into()));
            }
        }

        let root_handles = self.handles.handles_at(at);
        // A move never grows the buffer.
        let final_at = if src < at && !inside_target {
            at - new_len
        } else {
            at
        };
        let old_len = if inside_target {
            old_len - new_len
        } else {
            old_len
        };
        self.move_bytes(at, src, new_len);
        self.remove_bytes(final_at + new_len, old_len);
        for handle in root_handles {
            self.handles.redirect(handle, final_at);
        }
        Ok(final_at)
    }

    // Remove

    /// Erase a tree, or only its root node.
    ///
    /// Removing a tree from an n-ary parent decrements its count; removing it from a
    /// fixed-arity parent is rejected. Removing only the root node splices its children into
    /// its place: into the parent's child list for n-ary parents, as root-level trees at the
    /// top level, or as the single replacement child of a fixed-arity parent.
    pub fn remove(&mut self, handle: Handle, extent: Extent) -> CalcResult<()> {
        let at = self.resolve(handle)?;
        self.remove_at(at, extent)
    }

    pub(crate) fn remove_at(&mut self, at: NodeOffset, extent: Extent) -> CalcResult<()> {
        let node = self.tree(at);
        let children = node.number_of_children();
        let (len, delta) = match extent {
            Extent::Tree => (node.tree_size(), -1isize),
            Extent::Node => (node.node_size(), children as isize - 1),
        };
        match self.placement(at) {
            Placement::Root => {}
            Placement::NAryChild { parent, .. } => {
                let count = self.tree(parent).number_of_children() as isize + delta;
                if count > MAX_NARY_CHILDREN as isize {
                    return Err(CalcError::Malformed("too many children".into()));
                }
                self.remove_bytes(at, len);
                self.bump_child_count(parent, delta)?;
                return Ok(());
            }
            Placement::FixedChild { .. } => {
                if extent == Extent::Tree || children != 1 {
                    return Err(CalcError::Malformed(
                        "a fixed-arity parent cannot lose a child".into(),
                    ));
                }
            }
        }
        self.remove_bytes(at, len);
        Ok(())
    }

    // N-ary helpers

    /// Adjust the child count of the n-ary node at `parent`.
    pub(crate) fn bump_child_count(&mut self, parent: NodeOffset, delta: isize) -> CalcResult<()> {
        let node = self.tree(parent);
        debug_assert!(node.node_type().is_nary());
        let count = node.number_of_children() as isize + delta;
        if !(0..=MAX_NARY_CHILDREN as isize).contains(&count) {
            return Err(CalcError::Malformed(format!("invalid child count {count}")));
        }
        self.overwrite_bytes(parent + 1, &[count as u8]);
        Ok(())
    }

    /// Append a tree as the last child of an n-ary node.
    pub fn add_child(&mut self, parent: Handle, child: Source<'_>) -> CalcResult<()> {
        let at = self.resolve(parent)?;
        let child = self.resolve_source(child)?;
        self.atomically(|arena| arena.add_child_at(at, child).map(|_| ()))
    }

    /// Returns the new child's offset.
    pub(crate) fn add_child_at(
        &mut self,
        parent: NodeOffset,
        child: RawSource<'_>,
    ) -> CalcResult<NodeOffset> {
        let node = self.tree(parent);
        if !node.node_type().is_nary() {
            return Err(CalcError::Malformed(format!(
                "{:?} does not take extra children",
                node.node_type()
            )));
        }
        if node.number_of_children() >= MAX_NARY_CHILDREN {
            return Err(CalcError::Malformed("too many children".into()));
        }
        let (src, len) = match child {
            RawSource::Move(src) => {
                if self.contains(src, parent) {
                    return Err(CalcError::Malformed("cannot move a tree into itself".into()));
                }
                if self.placement(src) != Placement::Root {
                    return Err(CalcError::Malformed(
                        "moved content must be a root-level tree".into(),
                    ));
                }
                (src, self.tree(src).tree_size())
            }
            other => {
                let bytes = self.source_bytes(other, Extent::Tree)?;
                (self.push_bytes(&bytes)?, bytes.len())
            }
        };
        let dst = self.tree(parent).next_tree_offset();
        let parent = if src < parent { parent - len } else { parent };
        let final_at = if src < dst { dst - len } else { dst };
        self.move_bytes(dst, src, len);
        self.bump_child_count(parent, 1)?;
        Ok(final_at)
    }

    /// Remove child `index` of an n-ary node.
    pub fn remove_child(&mut self, parent: Handle, index: usize) -> CalcResult<()> {
        let at = self.resolve(parent)?;
        self.remove_child_at(at, index)
    }

    pub(crate) fn remove_child_at(&mut self, parent: NodeOffset, index: usize) -> CalcResult<()> {
        let node = self.tree(parent);
        if !node.node_type().is_nary() {
            return Err(CalcError::Malformed(format!(
                "{:?} has a fixed number of children",
                node.node_type()
            )));
        }
        let child = node
            .child(index)
            .ok_or_else(|| CalcError::Malformed(format!("no child at index {index}")))?;
        let range = child.tree_range();
        self.remove_bytes(range.start, range.len());
        self.bump_child_count(parent, -1)
    }

    /// Merge children of the same n-ary type into the node: `(a + b) + c` becomes `a + b + c`.
    /// Returns whether anything changed.
    pub fn flatten(&mut self, handle: Handle) -> CalcResult<bool> {
        let at = self.resolve(handle)?;
        self.flatten_at(at)
    }

    pub(crate) fn flatten_at(&mut self, at: NodeOffset) -> CalcResult<bool> {
        let node_type = self.tree(at).node_type();
        if !node_type.is_nary() {
            return Ok(false);
        }
        let mut changed = false;
        let mut index = 0;
        loop {
            let node = self.tree(at);
            let Some(child) = node.child(index) else {
                break;
            };
            if child.node_type() != node_type {
                index += 1;
                continue;
            }
            let merged = child.number_of_children();
            let count = node.number_of_children() + merged - 1;
            if count > MAX_NARY_CHILDREN {
                index += 1;
                continue;
            }
            let child_at = child.offset();
            let header = child.node_size();
            self.remove_bytes(child_at, header);
            self.bump_child_count(at, merged as isize - 1)?;
            changed = true;
            // The merged grandchildren now sit at `index`; they may need flattening too.
        }
        Ok(changed)
    }

    /// Sort the children of a commutative n-ary node into canonical order. Handles on the
    /// children follow them. Returns whether the order changed.
    pub fn sort(&mut self, handle: Handle) -> CalcResult<bool> {
        let at = self.resolve(handle)?;
        Ok(self.sort_at(at))
    }

    pub(crate) fn sort_at(&mut self, at: NodeOffset) -> bool {
        let count = self.tree(at).number_of_children();
        let mut changed = false;
        // Selection sort by moves: the buffer is never reallocated and handles follow.
        for i in 0..count {
            let (dst, src, len) = {
                let node = self.tree(at);
                let mut children = node.children().skip(i);
                let Some(first) = children.next() else {
                    break;
                };
                let best = children.fold(first, |best, candidate| {
                    if compare(candidate, best).is_lt() { candidate } else { best }
                });
                (first.offset(), best.offset(), best.tree_size())
            };
            if src != dst {
                self.move_bytes(dst, src, len);
                changed = true;
            }
        }
        changed
    }

    /// Collapse an `Add` or `Mult` with fewer than two children into its neutral element or
    /// its only child. Returns whether anything changed.
    pub fn squash(&mut self, handle: Handle) -> CalcResult<bool> {
        let at = self.resolve(handle)?;
        self.squash_at(at)
    }

    pub(crate) fn squash_at(&mut self, at: NodeOffset) -> CalcResult<bool> {
        let node = self.tree(at);
        let neutral = match node.node_type() {
            NodeType::Add => NodeType::Zero,
            NodeType::Mult => NodeType::One,
            _ => return Ok(false),
        };
        match node.number_of_children() {
            0 => {
                self.replace_at(
                    at,
                    Extent::Tree,
                    RawSource::Bytes(&[neutral.tag()]),
                    Extent::Tree,
                )?;
                Ok(true)
            }
            1 => {
                let child = node.next_node_offset();
                self.replace_at(at, Extent::Tree, RawSource::Move(child), Extent::Tree)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A node header that stands alone: leaves as is, n-ary nodes emptied.
fn standalone_node(header: &[u8]) -> CalcResult<Vec<u8>> {
    let mut bytes = header.to_vec();
    adopt_children(&mut bytes, 0)?;
    Ok(bytes)
}

/// Fix a copied node header so it takes `children` children.
fn adopt_children(header: &mut [u8], children: usize) -> CalcResult<()> {
    let node_type = NodeType::from_tag(header[0])
        .ok_or_else(|| CalcError::Malformed(format!("unknown tag {}", header[0])))?;
    match node_type.arity() {
        Arity::NAry if children <= MAX_NARY_CHILDREN => {
            header[1] = children as u8;
            Ok(())
        }
        Arity::Fixed(n) if n as usize == children => Ok(()),
        _ => Err(CalcError::Malformed(format!(
            "{node_type:?} cannot take {children} children"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::owned::shapes::*;

    fn read(arena: &Arena, handle: Handle) -> OwnedTree {
        arena.snapshot_tree(handle).unwrap()
    }

    #[test]
    fn clone_does_not_touch_source() {
        let mut arena = Arena::new();
        let h = arena.push_tree(&add([sym("a"), int(2)])).unwrap();
        let copy = arena.clone_tree(h, Extent::Tree).unwrap();
        assert_eq!(read(&arena, copy), read(&arena, h));
        let empty = arena.clone_tree(h, Extent::Node).unwrap();
        assert_eq!(read(&arena, empty), add([]));
        assert!(arena.is_well_formed());
    }

    #[test]
    fn detach_from_nary_and_fixed_parents() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&add([sym("a"), pow(sym("b"), int(2))])).unwrap();
        let pow_at = arena.get(root).unwrap().child(1).unwrap().offset();
        let pow_h = arena.register(pow_at).unwrap();
        let b_h = arena.register(pow_at + 1).unwrap();

        arena.detach(b_h).unwrap();
        assert_eq!(read(&arena, pow_h), pow(int(0), int(2)));
        assert_eq!(read(&arena, b_h), sym("b"));

        arena.detach(pow_h).unwrap();
        assert_eq!(read(&arena, root), add([sym("a")]));
        assert_eq!(arena.tree_count(), 3);
        assert!(arena.is_well_formed());
    }

    #[test]
    fn replace_variants_keep_root_handle() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&add([sym("a"), sym("b")])).unwrap();
        let a = arena.register(arena.resolve(root).unwrap() + 2).unwrap();

        // Node over node: the children are adopted.
        arena
            .replace(root, Extent::Node, Source::Owned(&mult([int(0), int(0), int(0)])), Extent::Node)
            .unwrap();
        assert_eq!(read(&arena, root), mult([sym("a"), sym("b")]));
        assert!(arena.is_live(a));

        // Tree over tree.
        arena.replace_tree(root, &pow(sym("x"), int(3))).unwrap();
        assert_eq!(read(&arena, root), pow(sym("x"), int(3)));
        assert!(!arena.is_live(a));

        // Node over tree.
        arena
            .replace(root, Extent::Tree, Source::Owned(&sym("y")), Extent::Node)
            .unwrap();
        assert_eq!(read(&arena, root), sym("y"));

        // Tree over node (the node is a leaf).
        arena
            .replace(root, Extent::Node, Source::Owned(&ln(sym("z"))), Extent::Tree)
            .unwrap();
        assert_eq!(read(&arena, root), ln(sym("z")));
        assert!(arena.is_well_formed());
    }

    #[test]
    fn replace_rejects_orphaning() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&add([sym("a"), sym("b")])).unwrap();
        let err = arena
            .replace(root, Extent::Node, Source::Owned(&sym("z")), Extent::Tree)
            .unwrap_err();
        assert!(matches!(err, CalcError::Malformed(_)));
        assert_eq!(read(&arena, root), add([sym("a"), sym("b")]));
    }

    #[test]
    fn move_child_over_parent() {
        let mut arena = Arena::new();
        let before = arena.push_tree(&sym("k")).unwrap();
        let root = arena.push_tree(&add([mult([sym("x"), int(3)]), int(0)])).unwrap();
        let after = arena.push_tree(&sym("m")).unwrap();
        let inner = arena.register(arena.resolve(root).unwrap() + 2).unwrap();

        arena.replace(root, Extent::Tree, Source::Move(inner), Extent::Tree).unwrap();
        assert_eq!(read(&arena, root), mult([sym("x"), int(3)]));
        assert_eq!(arena.resolve(inner).unwrap(), arena.resolve(root).unwrap());
        assert_eq!(read(&arena, before), sym("k"));
        assert_eq!(read(&arena, after), sym("m"));
        assert!(arena.is_well_formed());
    }

    #[test]
    fn move_root_level_tree_over_earlier_target() {
        let mut arena = Arena::new();
        let target = arena.push_tree(&add([sym("a"), sym("b")])).unwrap();
        let source = arena.push_tree(&sym("c")).unwrap();
        arena.replace(target, Extent::Tree, Source::Move(source), Extent::Tree).unwrap();
        assert_eq!(read(&arena, target), sym("c"));
        assert_eq!(arena.tree_count(), 1);
    }

    #[test]
    fn insert_siblings_and_children() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&add([sym("a"), sym("c")])).unwrap();
        let c = arena.register(arena.get(root).unwrap().child(1).unwrap().offset()).unwrap();
        arena.insert(Position::Before(c), Source::Owned(&sym("b"))).unwrap();
        arena.insert(Position::After(c), Source::Owned(&sym("d"))).unwrap();
        assert_eq!(read(&arena, root), add([sym("a"), sym("b"), sym("c"), sym("d")]));

        let loose = arena.push_tree(&int(5)).unwrap();
        arena.add_child(root, Source::Move(loose)).unwrap();
        assert_eq!(
            read(&arena, root),
            add([sym("a"), sym("b"), sym("c"), sym("d"), int(5)])
        );
        assert_eq!(read(&arena, loose), int(5));
        arena.remove_child(root, 0).unwrap();
        assert_eq!(arena.get(root).unwrap().number_of_children(), 4);
        assert!(arena.is_well_formed());
    }

    #[test]
    fn insert_under_fixed_parent_is_rejected() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&pow(sym("x"), int(2))).unwrap();
        let x = arena.register(arena.resolve(root).unwrap() + 1).unwrap();
        let size = arena.size();
        assert!(arena.insert(Position::After(x), Source::Owned(&int(1))).is_err());
        assert_eq!(arena.size(), size);
    }

    #[test]
    fn remove_node_splices_children() {
        let mut arena = Arena::new();
        let root = arena.push_tree(&add([sym("a"), add([sym("b"), sym("c")])])).unwrap();
        let inner = arena.register(arena.get(root).unwrap().child(1).unwrap().offset()).unwrap();
        arena.remove(inner, Extent::Node).unwrap();
        assert_eq!(read(&arena, root), add([sym("a"), sym("b"), sym("c")]));
        assert!(!arena.is_live(inner));
    }

    #[test]
    fn flatten_sort_squash() {
        let mut arena = Arena::new();
        let root = arena
            .push_tree(&add([sym("b"), add([sym("a"), add([int(2)])]), sym("c")]))
            .unwrap();
        assert!(arena.flatten(root).unwrap());
        assert_eq!(read(&arena, root), add([sym("b"), sym("a"), int(2), sym("c")]));
        assert!(arena.sort(root).unwrap());
        assert_eq!(read(&arena, root), add([int(2), sym("a"), sym("b"), sym("c")]));

        let single = arena.push_tree(&mult([sym("q")])).unwrap();
        assert!(arena.squash(single).unwrap());
        assert_eq!(read(&arena, single), sym("q"));
        let empty = arena.push_tree(&mult([])).unwrap();
        assert!(arena.squash(empty).unwrap());
        assert_eq!(read(&arena, empty), int(1));
        assert!(arena.is_well_formed());
    }
}
