//! The expression arena: one flat buffer holding every live tree.
//!
//! All content lives in a single `Vec<u8>` laid out as a sequence of root-level trees. The
//! raw byte operations below are the only code that mutates the buffer; each of them keeps
//! the [`HandleTable`] in sync and, while a checkpoint is open, records its inverse in the
//! undo journal.
use crate::config::EngineConfig;
use crate::error::{CalcError, CalcResult};
use crate::tree::handle::{Handle, HandleTable};
use crate::tree::node::{NodeOffset, TreeRef, validate_tree};
use crate::tree::node_type::Arity;
use crate::tree::owned::OwnedTree;

/// Inverse of a raw byte operation, replayed on rollback.
#[derive(Debug)]
pub(crate) enum Undo {
    Inserted { at: NodeOffset, len: usize },
    Removed { at: NodeOffset, bytes: Vec<u8> },
    Moved { dst: NodeOffset, src: NodeOffset, len: usize },
    Overwritten { at: NodeOffset, bytes: Vec<u8> },
}

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A root-level tree.
    Root,
    /// Child `index` of an n-ary node at `parent`.
    NAryChild { parent: NodeOffset, index: usize },
    /// Child `index` of a fixed-arity node at `parent`.
    FixedChild { parent: NodeOffset, index: usize },
}

pub struct Arena {
    pub(super) bytes: Vec<u8>,
    pub(super) capacity: usize,
    pub(super) handles: HandleTable,
    pub(super) journal: Vec<Undo>,
    /// Number of open checkpoints. The journal is only recorded while this is non-zero.
    pub(super) depth: usize,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_capacity(config.arena_capacity, config.handle_capacity)
    }

    pub fn with_capacity(capacity: usize, handle_capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
            handles: HandleTable::new(handle_capacity),
            journal: Vec::new(),
            depth: 0,
        }
    }

    /// Current buffer size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Number of root-level trees.
    pub fn tree_count(&self) -> usize {
        self.roots().count()
    }

    /// Root-level trees in buffer order.
    pub fn roots(&self) -> impl Iterator<Item = TreeRef<'_>> + '_ {
        let mut next = 0;
        std::iter::from_fn(move || {
            if next >= self.bytes.len() {
                return None;
            }
            let tree = TreeRef::new(&self.bytes, next);
            next = tree.next_tree_offset();
            Some(tree)
        })
    }

    /// Discard all content. Every handle becomes uninitialized.
    pub fn flush(&mut self) {
        log::debug!("flushing arena ({} bytes)", self.bytes.len());
        let len = self.bytes.len();
        self.remove_bytes(0, len);
        self.handles.invalidate_all();
    }

    #[inline]
    pub fn tree(&self, offset: NodeOffset) -> TreeRef<'_> {
        TreeRef::new(&self.bytes, offset)
    }

    /// Append a copy of `tree` as a new root-level tree and return its position.
    pub fn push(&mut self, tree: &OwnedTree) -> CalcResult<NodeOffset> {
        self.push_bytes(tree.as_bytes())
    }

    /// Append already-encoded tree bytes.
    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) -> CalcResult<NodeOffset> {
        let at = self.bytes.len();
        self.insert_bytes(at, bytes)?;
        Ok(at)
    }

    /// Append a tree and register a handle on it.
    pub fn push_tree(&mut self, tree: &OwnedTree) -> CalcResult<Handle> {
        let at = self.push(tree)?;
        match self.handles.register(at) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.truncate(at);
                Err(err)
            }
        }
    }

    /// Copy the tree at `offset` out of the arena.
    pub fn to_owned_tree(&self, offset: NodeOffset) -> OwnedTree {
        OwnedTree::from_tree(self.tree(offset))
    }

    // Handles

    pub fn register(&mut self, offset: NodeOffset) -> CalcResult<Handle> {
        debug_assert!(offset < self.bytes.len());
        self.handles.register(offset)
    }

    pub fn resolve(&self, handle: Handle) -> CalcResult<NodeOffset> {
        self.handles.resolve(handle)
    }

    pub fn release(&mut self, handle: Handle) {
        self.handles.release(handle);
    }

    #[inline]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.handles.is_live(handle)
    }

    /// The tree a handle points at.
    pub fn get(&self, handle: Handle) -> CalcResult<TreeRef<'_>> {
        Ok(self.tree(self.resolve(handle)?))
    }

    /// Copy of the tree a handle points at.
    pub fn snapshot_tree(&self, handle: Handle) -> CalcResult<OwnedTree> {
        Ok(OwnedTree::from_tree(self.get(handle)?))
    }

    // Navigation

    /// Offset of the root-level tree containing `offset`.
    pub fn root_of(&self, offset: NodeOffset) -> NodeOffset {
        self.roots()
            .find(|root| root.tree_range().contains(&offset))
            .map(|root| root.offset())
            .unwrap_or(offset)
    }

    pub fn placement(&self, offset: NodeOffset) -> Placement {
        let root = self.tree(self.root_of(offset));
        match root.parent_of(offset) {
            None => Placement::Root,
            Some(parent) => {
                let index = parent.index_of_child(offset).unwrap_or(0);
                match parent.node_type().arity() {
                    Arity::NAry => Placement::NAryChild {
                        parent: parent.offset(),
                        index,
                    },
                    Arity::Fixed(_) => Placement::FixedChild {
                        parent: parent.offset(),
                        index,
                    },
                }
            }
        }
    }

    /// Whether `inner` lies in the tree rooted at `outer` (inclusive).
    pub fn contains(&self, outer: NodeOffset, inner: NodeOffset) -> bool {
        self.tree(outer).tree_range().contains(&inner)
    }

    /// Check that the buffer is a sequence of well-formed trees and that every live handle
    /// points at a node boundary.
    pub fn is_well_formed(&self) -> bool {
        let mut starts = vec![false; self.bytes.len()];
        let mut at = 0;
        while at < self.bytes.len() {
            let Ok(size) = validate_tree(&self.bytes, at) else {
                return false;
            };
            for node in self.tree(at).descendants() {
                starts[node.offset()] = true;
            }
            at += size;
        }
        self.handles
            .live_offsets()
            .all(|offset| starts.get(offset).copied().unwrap_or(false))
    }

    // Raw byte operations

    #[inline]
    fn recording(&self) -> bool {
        self.depth > 0
    }

    pub(crate) fn ensure_room(&self, additional: usize) -> CalcResult<()> {
        let requested = self.bytes.len() + additional;
        if requested > self.capacity {
            return Err(CalcError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Splice `data` in at `at`. Handles at or after `at` move forward.
    pub(crate) fn insert_bytes(&mut self, at: NodeOffset, data: &[u8]) -> CalcResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_room(data.len())?;
        self.bytes.splice(at..at, data.iter().copied());
        self.handles.on_insert(at, data.len());
        if self.recording() {
            self.journal.push(Undo::Inserted { at, len: data.len() });
        }
        Ok(())
    }

    /// Erase `[at, at + len)`. Handles inside become uninitialized.
    pub(crate) fn remove_bytes(&mut self, at: NodeOffset, len: usize) {
        if len == 0 {
            return;
        }
        let removed: Vec<u8> = self.bytes.drain(at..at + len).collect();
        self.handles.on_remove(at, len);
        if self.recording() {
            self.journal.push(Undo::Removed { at, bytes: removed });
        }
    }

    /// Move `[src, src + len)` so that it starts where `dst` currently is. `dst` must not lie
    /// strictly inside the moved range.
    pub(crate) fn move_bytes(&mut self, dst: NodeOffset, src: NodeOffset, len: usize) {
        debug_assert!(dst <= src || dst >= src + len);
        if len == 0 || dst == src || dst == src + len {
            return;
        }
        if dst < src {
            self.bytes[dst..src + len].rotate_right(len);
        } else {
            self.bytes[src..dst].rotate_left(len);
        }
        self.handles.on_move(dst, src, len);
        if self.recording() {
            self.journal.push(Undo::Moved { dst, src, len });
        }
    }

    /// Overwrite bytes in place without changing the buffer length. Handles are untouched.
    pub(crate) fn overwrite_bytes(&mut self, at: NodeOffset, data: &[u8]) {
        let target = &mut self.bytes[at..at + data.len()];
        if target == data {
            return;
        }
        if self.depth > 0 {
            self.journal.push(Undo::Overwritten {
                at,
                bytes: target.to_vec(),
            });
        }
        target.copy_from_slice(data);
    }

    /// Drop everything from `len` onwards.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.bytes.len() {
            let tail = self.bytes.len() - len;
            self.remove_bytes(len, tail);
        }
    }

    /// Replace `[at, at + old_len)` by `data`, growing or shrinking the tail only. Every
    /// handle inside the old range becomes uninitialized. Fails before any change when the
    /// final size would exceed capacity.
    pub(crate) fn splice_bytes(
        &mut self,
        at: NodeOffset,
        old_len: usize,
        data: &[u8],
    ) -> CalcResult<()> {
        if data.len() > old_len {
            self.ensure_room(data.len() - old_len)?;
        }
        self.invalidate_handles(at, old_len);
        let common = old_len.min(data.len());
        self.overwrite_bytes(at, &data[..common]);
        if old_len > data.len() {
            self.remove_bytes(at + common, old_len - common);
        } else {
            self.insert_bytes(at + common, &data[common..])?;
        }
        Ok(())
    }

    fn invalidate_handles(&mut self, at: NodeOffset, len: usize) {
        // Removing then re-inserting nothing is the table-level equivalent of erasing the range.
        self.handles.on_remove(at, len);
        self.handles.on_insert(at, len);
    }

    /// Replay the journal back to `mark`, restoring the bytes only.
    pub(super) fn unwind(&mut self, mark: usize) {
        while self.journal.len() > mark {
            let Some(op) = self.journal.pop() else { break };
            match op {
                Undo::Inserted { at, len } => {
                    self.bytes.drain(at..at + len);
                }
                Undo::Removed { at, bytes } => {
                    self.bytes.splice(at..at, bytes);
                }
                Undo::Moved { dst, src, len } => {
                    if dst < src {
                        self.bytes[dst..src + len].rotate_left(len);
                    } else {
                        self.bytes[src..dst].rotate_right(len);
                    }
                }
                Undo::Overwritten { at, bytes } => {
                    self.bytes[at..at + bytes.len()].copy_from_slice(&bytes);
                }
            }
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("size", &self.bytes.len())
            .field("capacity", &self.capacity)
            .field("roots", &self.roots().collect::<Vec<_>>())
            .finish()
    }
}
