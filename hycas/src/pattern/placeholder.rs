//! Pattern placeholders.
//!
//! A placeholder node carries one payload byte: the low nibble is its [`Tag`], the high
//! nibble its [`Filter`].
use strum::{EnumIter, FromRepr};

use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;

/// Placeholder name. A pattern can use at most seven distinct placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr)]
#[repr(u8)]
pub enum Tag {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Tag {
    pub const COUNT: usize = 7;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Scalar placeholder.
    pub fn one(self) -> OwnedTree {
        Placeholder::new(self, Filter::One).to_tree()
    }

    /// Variadic placeholder that may bind no tree at all.
    pub fn zero_or_more(self) -> OwnedTree {
        Placeholder::new(self, Filter::ZeroOrMore).to_tree()
    }

    pub fn one_or_more(self) -> OwnedTree {
        Placeholder::new(self, Filter::OneOrMore).to_tree()
    }
}

/// How many sibling trees a placeholder can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum Filter {
    One,
    ZeroOrMore,
    OneOrMore,
}

impl Filter {
    #[inline]
    pub fn is_variadic(self) -> bool {
        self != Filter::One
    }

    #[inline]
    pub fn min_trees(self) -> usize {
        match self {
            Filter::ZeroOrMore => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub tag: Tag,
    pub filter: Filter,
}

impl Placeholder {
    pub fn new(tag: Tag, filter: Filter) -> Self {
        Self { tag, filter }
    }

    #[inline]
    pub fn encode(self) -> u8 {
        self.tag as u8 | (self.filter as u8) << 4
    }

    pub fn decode(byte: u8) -> Option<Self> {
        Some(Self {
            tag: Tag::from_repr(byte & 0x0f)?,
            filter: Filter::from_repr(byte >> 4)?,
        })
    }

    /// The placeholder stored in `tree`'s root node, if it is one.
    pub fn read(tree: TreeRef<'_>) -> Option<Self> {
        if !tree.is(NodeType::Placeholder) {
            return None;
        }
        tree.payload().first().copied().and_then(Self::decode)
    }

    #[inline]
    pub fn is_variadic(self) -> bool {
        self.filter.is_variadic()
    }

    pub fn to_tree(self) -> OwnedTree {
        OwnedTree::from_raw(vec![NodeType::Placeholder.tag(), self.encode()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn byte_encoding() {
        for tag in Tag::iter() {
            for filter in [Filter::One, Filter::ZeroOrMore, Filter::OneOrMore] {
                let p = Placeholder::new(tag, filter);
                assert_eq!(Placeholder::decode(p.encode()), Some(p));
                assert_eq!(Placeholder::read(p.to_tree().root()), Some(p));
            }
        }
        assert_eq!(Placeholder::decode(0x07), None);
        assert_eq!(Placeholder::decode(0x30), None);
    }

    #[test]
    fn builders() {
        let p = Placeholder::read(Tag::C.one_or_more().root()).unwrap();
        assert_eq!(p.tag, Tag::C);
        assert!(p.is_variadic());
        assert_eq!(p.filter.min_trees(), 1);
        assert!(!Placeholder::read(Tag::A.one().root()).unwrap().is_variadic());
    }
}
