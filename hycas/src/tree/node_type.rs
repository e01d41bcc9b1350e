//! Node vocabulary: type tags, payload shapes and static properties.
//!
//! Every node starts with one tag byte taken from [`NodeType`]. The payload that follows the
//! tag is described by [`PayloadShape`]; children follow the payload in preorder.
//!
//! The declaration order of [`NodeType`] is meaningful: numbers come first so they can be
//! recognised with a single comparison, and the canonical ordering of commutative operators
//! uses the tag value as its coarse rank (see [`crate::tree::comparison`]).
use bitflags::bitflags;
use strum::{EnumIter, FromRepr, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, FromRepr, IntoStaticStr)]
#[repr(u8)]
pub enum NodeType {
    // Numbers
    Zero,
    One,
    Two,
    MinusOne,
    Half,
    IntegerShort,
    IntegerPosBig,
    IntegerNegBig,
    RationalShort,
    RationalPosBig,
    RationalNegBig,
    Float,

    // Constants
    Constant,

    // Algebraic core, kept after projection. Product before power before sum: the canonical
    // order sorts `2·x` before `x^2` before `x + 1`.
    Mult,
    Pow,
    Add,
    Factorial,

    // User named
    UserSymbol,
    UserFunction,
    UserSequence,

    // Transcendental system forms
    Exp,
    Ln,
    Abs,
    Trig,
    ATrig,

    // User-facing forms, projected away before reduction
    Sub,
    Div,
    Opposite,
    Sqrt,
    NthRoot,
    Log,
    Logarithm,
    Cos,
    Sin,
    Tan,
    ACos,
    ASin,
    ATan,

    // Containers and markers
    List,
    Set,
    Dependency,
    Undefined,
    NonReal,

    // Pattern vocabulary
    Placeholder,

    // Layout primitives
    RackLayout,
    CodePointLayout,
    FractionLayout,
    ParenthesesLayout,
    VerticalOffsetLayout,
}

/// How many children follow a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(u8),
    /// Child count is stored in the payload.
    NAry,
}

/// Layout of the inline payload that follows the tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    None,
    /// A fixed number of bytes.
    Fixed(u8),
    /// One byte holding the number of children.
    ChildCount,
    /// One length byte followed by that many UTF-8 bytes.
    Name,
    /// One length byte followed by a little-endian magnitude.
    BigInteger,
    /// Two length bytes (numerator, denominator) followed by both magnitudes.
    BigRational,
}

bitflags! {
    /// Static properties of a node type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        const NUMBER = 1 << 0;
        const RATIONAL = 1 << 1;
        const INTEGER = 1 << 2;
        const NARY = 1 << 3;
        const COMMUTATIVE = 1 << 4;
        const USER_NAMED = 1 << 5;
        const LAYOUT = 1 << 6;
        /// Forms that projection rewrites into system forms.
        const PROJECTABLE = 1 << 7;
    }
}

impl NodeType {
    /// Total number of node types.
    pub const COUNT: usize = NodeType::VerticalOffsetLayout as usize + 1;

    #[inline]
    pub fn from_tag(tag: u8) -> Option<NodeType> {
        NodeType::from_repr(tag)
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn arity(self) -> Arity {
        use NodeType::*;
        match self {
            Add | Mult | List | Set | RackLayout => Arity::NAry,
            Zero | One | Two | MinusOne | Half | IntegerShort | IntegerPosBig | IntegerNegBig
            | RationalShort | RationalPosBig | RationalNegBig | Float | Constant | UserSymbol
            | Undefined | NonReal | Placeholder | CodePointLayout => Arity::Fixed(0),
            UserFunction | UserSequence | Exp | Ln | Abs | Factorial | Opposite | Sqrt | Log
            | Cos | Sin | Tan | ACos | ASin | ATan | ParenthesesLayout | VerticalOffsetLayout => {
                Arity::Fixed(1)
            }
            Pow | Trig | ATrig | Sub | Div | NthRoot | Logarithm | Dependency | FractionLayout => {
                Arity::Fixed(2)
            }
        }
    }

    pub fn payload_shape(self) -> PayloadShape {
        use NodeType::*;
        match self {
            IntegerShort | Constant | Placeholder => PayloadShape::Fixed(1),
            RationalShort => PayloadShape::Fixed(2),
            CodePointLayout => PayloadShape::Fixed(4),
            Float => PayloadShape::Fixed(8),
            IntegerPosBig | IntegerNegBig => PayloadShape::BigInteger,
            RationalPosBig | RationalNegBig => PayloadShape::BigRational,
            UserSymbol | UserFunction | UserSequence => PayloadShape::Name,
            Add | Mult | List | Set | RackLayout => PayloadShape::ChildCount,
            _ => PayloadShape::None,
        }
    }

    pub fn flags(self) -> NodeFlags {
        use NodeType::*;
        match self {
            Zero | One | Two | MinusOne | IntegerShort | IntegerPosBig | IntegerNegBig => {
                NodeFlags::NUMBER | NodeFlags::RATIONAL | NodeFlags::INTEGER
            }
            Half | RationalShort | RationalPosBig | RationalNegBig => {
                NodeFlags::NUMBER | NodeFlags::RATIONAL
            }
            Float => NodeFlags::NUMBER,
            Add | Mult => NodeFlags::NARY | NodeFlags::COMMUTATIVE,
            Set => NodeFlags::NARY | NodeFlags::COMMUTATIVE,
            List => NodeFlags::NARY,
            RackLayout => NodeFlags::NARY | NodeFlags::LAYOUT,
            CodePointLayout | FractionLayout | ParenthesesLayout | VerticalOffsetLayout => {
                NodeFlags::LAYOUT
            }
            UserSymbol | UserFunction | UserSequence => NodeFlags::USER_NAMED,
            Sub | Div | Opposite | Sqrt | NthRoot | Log | Logarithm | Cos | Sin | Tan | ACos
            | ASin | ATan => NodeFlags::PROJECTABLE,
            _ => NodeFlags::empty(),
        }
    }

    #[inline]
    pub fn is_number(self) -> bool {
        self.flags().contains(NodeFlags::NUMBER)
    }

    #[inline]
    pub fn is_rational(self) -> bool {
        self.flags().contains(NodeFlags::RATIONAL)
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        self.flags().contains(NodeFlags::INTEGER)
    }

    #[inline]
    pub fn is_nary(self) -> bool {
        self.arity() == Arity::NAry
    }

    #[inline]
    pub fn is_commutative(self) -> bool {
        self.flags().contains(NodeFlags::COMMUTATIVE)
    }

    #[inline]
    pub fn is_user_named(self) -> bool {
        self.flags().contains(NodeFlags::USER_NAMED)
    }

    #[inline]
    pub fn is_layout(self) -> bool {
        self.flags().contains(NodeFlags::LAYOUT)
    }
}

/// The mathematical constants known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, IntoStaticStr)]
#[repr(u8)]
pub enum ConstantKind {
    Pi,
    E,
    I,
}

impl ConstantKind {
    pub fn value(self) -> Option<f64> {
        match self {
            ConstantKind::Pi => Some(std::f64::consts::PI),
            ConstantKind::E => Some(std::f64::consts::E),
            ConstantKind::I => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstantKind::Pi => "π",
            ConstantKind::E => "e",
            ConstantKind::I => "i",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn numbers_precede_every_other_type() {
        let last_number = NodeType::iter().filter(|t| t.is_number()).max().unwrap();
        let first_other = NodeType::iter().filter(|t| !t.is_number()).min().unwrap();
        assert!(last_number < first_other);
    }

    #[test]
    fn tags_roundtrip() {
        for t in NodeType::iter() {
            assert_eq!(NodeType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(NodeType::iter().count(), NodeType::COUNT);
        assert_eq!(NodeType::from_tag(NodeType::COUNT as u8), None);
    }

    #[test]
    fn nary_types_store_child_count() {
        for t in NodeType::iter() {
            assert_eq!(t.is_nary(), t.payload_shape() == PayloadShape::ChildCount, "{t:?}");
        }
    }
}
