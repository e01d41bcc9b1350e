//! Zero-copy navigation over encoded trees.
//!
//! Trees are stored in depth-first preorder: a node's tag and payload are immediately
//! followed by its children. Nothing but the tag, the payload and the child count is stored,
//! so every size is recomputed by walking.
use std::fmt;

use smallvec::SmallVec;

use crate::tree::node_type::{Arity, ConstantKind, NodeType, PayloadShape};

/// Byte offset of a node inside a buffer.
///
/// Offsets are temporary: any edit before the offset invalidates them. Use a
/// [`Handle`](crate::tree::handle::Handle) to keep a durable reference.
pub type NodeOffset = usize;

/// Largest number of children an n-ary node can hold (the count is stored on one byte).
pub const MAX_NARY_CHILDREN: usize = u8::MAX as usize;

/// Borrowed view of a tree rooted at `offset` inside `bytes`.
#[derive(Clone, Copy)]
pub struct TreeRef<'a> {
    bytes: &'a [u8],
    offset: NodeOffset,
}

impl<'a> TreeRef<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8], offset: NodeOffset) -> Self {
        debug_assert!(offset < bytes.len(), "node offset {offset} out of bounds");
        Self { bytes, offset }
    }

    #[inline]
    pub fn offset(&self) -> NodeOffset {
        self.offset
    }

    /// The whole buffer this view borrows from.
    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        let tag = self.bytes[self.offset];
        debug_assert!(NodeType::from_tag(tag).is_some(), "invalid tag {tag}");
        NodeType::from_tag(tag).unwrap_or(NodeType::Undefined)
    }

    #[inline]
    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }

    /// Inline payload bytes (everything between the tag and the first child).
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.offset + 1..self.offset + self.node_size()]
    }

    /// Size in bytes of this node alone, children excluded.
    #[inline]
    pub fn node_size(&self) -> usize {
        1 + payload_len(self.node_type(), &self.bytes[self.offset + 1..])
    }

    #[inline]
    pub fn number_of_children(&self) -> usize {
        match self.node_type().arity() {
            Arity::Fixed(n) => n as usize,
            Arity::NAry => self.bytes[self.offset + 1] as usize,
        }
    }

    /// Size in bytes of this node and all its descendants.
    pub fn tree_size(&self) -> usize {
        let mut end = self.offset;
        let mut pending = 1usize;
        while pending > 0 {
            pending -= 1;
            let node = TreeRef::new(self.bytes, end);
            pending += node.number_of_children();
            end += node.node_size();
        }
        end - self.offset
    }

    /// Number of nodes in this tree, this node included.
    pub fn number_of_nodes(&self) -> usize {
        self.descendants().count()
    }

    /// The node that directly follows this one in preorder (its first child if any).
    #[inline]
    pub fn next_node_offset(&self) -> NodeOffset {
        self.offset + self.node_size()
    }

    /// The offset right after this tree.
    #[inline]
    pub fn next_tree_offset(&self) -> NodeOffset {
        self.offset + self.tree_size()
    }

    #[inline]
    pub fn tree_range(&self) -> std::ops::Range<usize> {
        self.offset..self.next_tree_offset()
    }

    #[inline]
    pub fn tree_bytes(&self) -> &'a [u8] {
        &self.bytes[self.tree_range()]
    }

    #[inline]
    pub fn node_bytes(&self) -> &'a [u8] {
        &self.bytes[self.offset..self.next_node_offset()]
    }

    pub fn children(&self) -> Children<'a> {
        Children {
            bytes: self.bytes,
            next: self.next_node_offset(),
            remaining: self.number_of_children(),
        }
    }

    pub fn child(&self, index: usize) -> Option<TreeRef<'a>> {
        self.children().nth(index)
    }

    /// Children collected into a small vector, for algorithms that index or backtrack.
    pub fn children_vec(&self) -> SmallVec<[TreeRef<'a>; 8]> {
        self.children().collect()
    }

    /// Every node of this tree in preorder, this node first.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            bytes: self.bytes,
            next: self.offset,
            end: self.next_tree_offset(),
        }
    }

    /// Find the parent of the node at `descendant`, which must lie strictly inside this tree.
    pub fn parent_of(&self, descendant: NodeOffset) -> Option<TreeRef<'a>> {
        if descendant <= self.offset || descendant >= self.next_tree_offset() {
            return None;
        }
        let mut current = *self;
        loop {
            let mut found = None;
            for child in current.children() {
                if child.offset == descendant {
                    return Some(current);
                }
                if child.offset < descendant && descendant < child.next_tree_offset() {
                    found = Some(child);
                    break;
                }
            }
            current = found?;
        }
    }

    /// Index of the child at `child_offset` among this node's children.
    pub fn index_of_child(&self, child_offset: NodeOffset) -> Option<usize> {
        self.children().position(|c| c.offset == child_offset)
    }

    #[inline]
    pub fn tree_is_identical(&self, other: &TreeRef<'_>) -> bool {
        self.tree_bytes() == other.tree_bytes()
    }

    #[inline]
    pub fn node_is_identical(&self, other: &TreeRef<'_>) -> bool {
        self.node_bytes() == other.node_bytes()
    }

    /// Name of a user symbol, function or sequence.
    pub fn name(&self) -> Option<&'a str> {
        if !self.node_type().is_user_named() {
            return None;
        }
        let payload = self.payload();
        std::str::from_utf8(&payload[1..]).ok()
    }

    pub fn constant(&self) -> Option<ConstantKind> {
        if self.node_type() != NodeType::Constant {
            return None;
        }
        ConstantKind::from_repr(self.payload()[0])
    }

    pub fn code_point(&self) -> Option<char> {
        if self.node_type() != NodeType::CodePointLayout {
            return None;
        }
        let payload = self.payload();
        char::from_u32(u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        self.node_type().is_number()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.node_type() == NodeType::Zero
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.node_type() == NodeType::One
    }

    #[inline]
    pub fn is_minus_one(&self) -> bool {
        self.node_type() == NodeType::MinusOne
    }
}

impl PartialEq for TreeRef<'_> {
    /// Structural equality: identical encoded trees, regardless of which buffer they live in.
    fn eq(&self, other: &Self) -> bool {
        self.tree_is_identical(other)
    }
}

impl Eq for TreeRef<'_> {}

impl fmt::Debug for TreeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", crate::tree::pretty::to_plain_string(*self, 120), self.offset)
    }
}

/// Iterator over the immediate children of a node.
#[derive(Clone)]
pub struct Children<'a> {
    bytes: &'a [u8],
    next: NodeOffset,
    remaining: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = TreeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let child = TreeRef::new(self.bytes, self.next);
        if self.remaining > 0 {
            self.next = child.next_tree_offset();
        }
        Some(child)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Preorder iterator over every node of a tree.
#[derive(Clone)]
pub struct Descendants<'a> {
    bytes: &'a [u8],
    next: NodeOffset,
    end: NodeOffset,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = TreeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let node = TreeRef::new(self.bytes, self.next);
        self.next = node.next_node_offset();
        Some(node)
    }
}

/// Payload length of a node of type `node_type` whose payload starts at `payload[0]`.
#[inline]
pub(crate) fn payload_len(node_type: NodeType, payload: &[u8]) -> usize {
    match node_type.payload_shape() {
        PayloadShape::None => 0,
        PayloadShape::Fixed(n) => n as usize,
        PayloadShape::ChildCount => 1,
        PayloadShape::Name | PayloadShape::BigInteger => 1 + payload[0] as usize,
        PayloadShape::BigRational => 2 + payload[0] as usize + payload[1] as usize,
    }
}

/// Check that `bytes[offset..]` starts with a complete, well-formed tree and return its size.
///
/// Checks tags, payload bounds, UTF-8 names and child counts. It does not check domain shape
/// (e.g. that a power has a sensible exponent).
pub fn validate_tree(bytes: &[u8], offset: NodeOffset) -> Result<usize, String> {
    let mut end = offset;
    let mut pending = 1usize;
    while pending > 0 {
        pending -= 1;
        let tag = *bytes
            .get(end)
            .ok_or_else(|| format!("truncated tree: expected a node at offset {end}"))?;
        let node_type =
            NodeType::from_tag(tag).ok_or_else(|| format!("unknown tag {tag} at offset {end}"))?;
        let payload = &bytes[end + 1..];
        let len = match node_type.payload_shape() {
            PayloadShape::None => 0,
            PayloadShape::Fixed(n) => n as usize,
            PayloadShape::ChildCount => 1,
            PayloadShape::Name | PayloadShape::BigInteger => {
                1 + *payload
                    .first()
                    .ok_or_else(|| format!("missing length byte at offset {}", end + 1))?
                    as usize
            }
            PayloadShape::BigRational => {
                if payload.len() < 2 {
                    return Err(format!("missing length bytes at offset {}", end + 1));
                }
                2 + payload[0] as usize + payload[1] as usize
            }
        };
        if payload.len() < len {
            return Err(format!("truncated payload for {node_type:?} at offset {end}"));
        }
        if node_type.is_user_named() && std::str::from_utf8(&payload[1..len]).is_err() {
            return Err(format!("invalid UTF-8 name at offset {end}"));
        }
        if node_type == NodeType::Constant && ConstantKind::from_repr(payload[0]).is_none() {
            return Err(format!("unknown constant {} at offset {end}", payload[0]));
        }
        pending += match node_type.arity() {
            Arity::Fixed(n) => n as usize,
            Arity::NAry => payload[0] as usize,
        };
        end += 1 + len;
    }
    Ok(end - offset)
}
