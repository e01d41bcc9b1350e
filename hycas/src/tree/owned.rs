//! Standalone trees living outside the arena.
use std::fmt;

use crate::error::{CalcError, CalcResult};
use crate::number::Number;
use crate::tree::node::{MAX_NARY_CHILDREN, TreeRef, validate_tree};
use crate::tree::node_type::{Arity, NodeType, PayloadShape};

/// Version byte prepended by [`OwnedTree::to_bytes`].
pub const FORMAT_VERSION: u8 = 1;

/// A single well-formed tree stored in its own buffer.
///
/// Used for patterns, for content built before it is inserted in an arena, and as the
/// exchange format with storage.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OwnedTree {
    bytes: Vec<u8>,
}

impl OwnedTree {
    /// Copy the tree rooted at `tree`.
    pub fn from_tree(tree: TreeRef<'_>) -> Self {
        Self {
            bytes: tree.tree_bytes().to_vec(),
        }
    }

    /// Wrap bytes that are already known to hold exactly one tree.
    pub(crate) fn from_raw(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(validate_tree(&bytes, 0), Ok(bytes.len()));
        Self { bytes }
    }

    /// Validate and wrap an encoded tree (no version byte).
    pub fn from_encoded(bytes: Vec<u8>) -> CalcResult<Self> {
        let size = validate_tree(&bytes, 0).map_err(CalcError::Malformed)?;
        if size != bytes.len() {
            return Err(CalcError::Malformed(format!(
                "{} trailing bytes after tree",
                bytes.len() - size
            )));
        }
        Ok(Self { bytes })
    }

    /// A node without children.
    pub fn leaf(node_type: NodeType) -> Self {
        debug_assert_eq!(node_type.payload_shape(), PayloadShape::None);
        debug_assert_eq!(node_type.arity(), Arity::Fixed(0));
        Self {
            bytes: vec![node_type.tag()],
        }
    }

    /// A node with children. N-ary types get their child count; fixed-arity types must
    /// receive exactly their arity.
    pub fn node(
        node_type: NodeType,
        payload: &[u8],
        children: impl IntoIterator<Item = OwnedTree>,
    ) -> CalcResult<Self> {
        let mut bytes = vec![node_type.tag()];
        let count_at = bytes.len();
        if node_type.is_nary() {
            bytes.push(0);
        } else {
            bytes.extend_from_slice(payload);
        }
        let mut count = 0usize;
        for child in children {
            bytes.extend_from_slice(&child.bytes);
            count += 1;
        }
        match node_type.arity() {
            Arity::NAry if count > MAX_NARY_CHILDREN => {
                return Err(CalcError::Malformed(format!(
                    "{node_type:?} cannot hold {count} children"
                )));
            }
            Arity::NAry => bytes[count_at] = count as u8,
            Arity::Fixed(n) if n as usize != count => {
                return Err(CalcError::Malformed(format!(
                    "{node_type:?} expects {n} children, got {count}"
                )));
            }
            Arity::Fixed(_) => {}
        }
        Self::from_encoded(bytes)
    }

    pub fn number(value: &Number) -> CalcResult<Self> {
        Ok(Self {
            bytes: value.encoded()?,
        })
    }

    #[inline]
    pub fn root(&self) -> TreeRef<'_> {
        TreeRef::new(&self.bytes, 0)
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.root().node_type()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Serialize for storage: version byte followed by the encoded tree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + 1);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.bytes);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CalcResult<Self> {
        match bytes.split_first() {
            Some((&FORMAT_VERSION, rest)) => Self::from_encoded(rest.to_vec()),
            Some((version, _)) => Err(CalcError::Malformed(format!(
                "unsupported format version {version}"
            ))),
            None => Err(CalcError::Malformed("empty input".into())),
        }
    }
}

impl fmt::Debug for OwnedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::tree::pretty::to_plain_string(self.root(), 120))
    }
}

impl fmt::Display for OwnedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = f.width().unwrap_or(80);
        write!(f, "{}", crate::tree::pretty::to_plain_string(self.root(), width))
    }
}

impl<'a> From<TreeRef<'a>> for OwnedTree {
    fn from(tree: TreeRef<'a>) -> Self {
        OwnedTree::from_tree(tree)
    }
}

/// Terse constructors for literal trees, mostly used to write rewrite rules and tests.
///
/// These panic on structurally impossible input (more than 255 children to an n-ary node),
/// which cannot happen for literals.
pub mod shapes {
    use super::OwnedTree;
    use crate::number::{Number, Rational};
    use crate::tree::node_type::{ConstantKind, NodeType};

    fn build(node_type: NodeType, payload: &[u8], children: Vec<OwnedTree>) -> OwnedTree {
        match OwnedTree::node(node_type, payload, children) {
            Ok(tree) => tree,
            Err(err) => panic!("invalid literal tree: {err}"),
        }
    }

    fn named(node_type: NodeType, name: &str, children: Vec<OwnedTree>) -> OwnedTree {
        assert!(name.len() <= u8::MAX as usize, "name too long: {name}");
        let mut payload = vec![name.len() as u8];
        payload.extend_from_slice(name.as_bytes());
        build(node_type, &payload, children)
    }

    pub fn number(value: Number) -> OwnedTree {
        OwnedTree::number(&value).unwrap_or_else(|_| undefined())
    }

    pub fn int(value: i64) -> OwnedTree {
        number(Number::integer(value))
    }

    pub fn rational(num: i64, den: i64) -> OwnedTree {
        match Rational::from_i64_pair(num, den) {
            Some(r) => number(Number::Rational(r)),
            None => undefined(),
        }
    }

    pub fn float(value: f64) -> OwnedTree {
        number(Number::Float(value))
    }

    pub fn constant(kind: ConstantKind) -> OwnedTree {
        build(NodeType::Constant, &[kind as u8], vec![])
    }

    pub fn pi() -> OwnedTree {
        constant(ConstantKind::Pi)
    }

    pub fn e() -> OwnedTree {
        constant(ConstantKind::E)
    }

    pub fn i() -> OwnedTree {
        constant(ConstantKind::I)
    }

    pub fn sym(name: &str) -> OwnedTree {
        named(NodeType::UserSymbol, name, vec![])
    }

    pub fn func(name: &str, arg: OwnedTree) -> OwnedTree {
        named(NodeType::UserFunction, name, vec![arg])
    }

    pub fn seq(name: &str, index: OwnedTree) -> OwnedTree {
        named(NodeType::UserSequence, name, vec![index])
    }

    pub fn undefined() -> OwnedTree {
        OwnedTree::leaf(NodeType::Undefined)
    }

    pub fn nonreal() -> OwnedTree {
        OwnedTree::leaf(NodeType::NonReal)
    }

    pub fn code_point(c: char) -> OwnedTree {
        build(NodeType::CodePointLayout, &(c as u32).to_le_bytes(), vec![])
    }

    macro_rules! nary {
        ($($name:ident => $ty:ident),* $(,)?) => {
            $(
                pub fn $name(children: impl IntoIterator<Item = OwnedTree>) -> OwnedTree {
                    build(NodeType::$ty, &[], children.into_iter().collect())
                }
            )*
        };
    }

    macro_rules! unary {
        ($($name:ident => $ty:ident),* $(,)?) => {
            $(
                pub fn $name(a: OwnedTree) -> OwnedTree {
                    build(NodeType::$ty, &[], vec![a])
                }
            )*
        };
    }

    macro_rules! binary {
        ($($name:ident => $ty:ident),* $(,)?) => {
            $(
                pub fn $name(a: OwnedTree, b: OwnedTree) -> OwnedTree {
                    build(NodeType::$ty, &[], vec![a, b])
                }
            )*
        };
    }

    nary! {
        add => Add,
        mult => Mult,
        list => List,
        set => Set,
        rack => RackLayout,
    }

    unary! {
        opposite => Opposite,
        sqrt => Sqrt,
        exp => Exp,
        ln => Ln,
        log => Log,
        abs => Abs,
        factorial => Factorial,
        cos => Cos,
        sin => Sin,
        tan => Tan,
        acos => ACos,
        asin => ASin,
        atan => ATan,
        parentheses => ParenthesesLayout,
        superscript => VerticalOffsetLayout,
    }

    binary! {
        pow => Pow,
        sub => Sub,
        div => Div,
        nth_root => NthRoot,
        logarithm => Logarithm,
        trig => Trig,
        atrig => ATrig,
        dependency => Dependency,
        fraction => FractionLayout,
    }
}
