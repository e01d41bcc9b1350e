//! Exact rationals and floats, and their node encoding.
//!
//! The arbitrary-precision arithmetic is delegated to `num-bigint`; this module only adds the
//! normalised rational wrapper and the mapping to and from number nodes.
use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{CalcError, CalcResult};
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;

/// Largest magnitude (in bytes) a big number node can carry.
pub const MAX_MAGNITUDE_BYTES: usize = u8::MAX as usize;

/// Largest `n` for which `n!` is folded exactly.
pub const MAX_EXACT_FACTORIAL: u32 = 100;

/// A normalised fraction: the denominator is positive and coprime with the numerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    num: BigInt,
    den: BigInt,
}

impl Rational {
    /// Returns `None` when `den` is zero.
    pub fn new(num: BigInt, den: BigInt) -> Option<Self> {
        if den.is_zero() {
            return None;
        }
        let gcd = num.gcd(&den);
        let (mut num, mut den) = if gcd.is_one() {
            (num, den)
        } else {
            (num / &gcd, den / &gcd)
        };
        if den.is_negative() {
            num = -num;
            den = -den;
        }
        Some(Self { num, den })
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        Self {
            num: value.into(),
            den: BigInt::one(),
        }
    }

    pub fn from_i64_pair(num: i64, den: i64) -> Option<Self> {
        Self::new(BigInt::from(num), BigInt::from(den))
    }

    #[inline]
    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    #[inline]
    pub fn denominator(&self) -> &BigInt {
        &self.den
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        self.den.is_one()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.num.is_one() && self.den.is_one()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.num.is_negative()
    }

    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.num.to_i64()
        } else {
            None
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            num: -&self.num,
            den: self.den.clone(),
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            num: self.num.abs(),
            den: self.den.clone(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let num = &self.num * &other.den + &other.num * &self.den;
        let den = &self.den * &other.den;
        Self::new(num, den).unwrap_or_else(|| Self::integer(0))
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self::new(&self.num * &other.num, &self.den * &other.den)
            .unwrap_or_else(|| Self::integer(0))
    }

    /// `None` for zero.
    pub fn inverse(&self) -> Option<Self> {
        Self::new(self.den.clone(), self.num.clone())
    }

    /// Integer power. Returns `None` for `0^negative` or when the result would not fit in a
    /// number node.
    pub fn pow(&self, exponent: i64) -> Option<Self> {
        let base = if exponent < 0 { self.inverse()? } else { self.clone() };
        let e = exponent.unsigned_abs();
        let bits = base.num.bits().max(base.den.bits());
        if bits > 1 && bits.saturating_mul(e) > (MAX_MAGNITUDE_BYTES as u64) * 8 {
            return None;
        }
        let e = u32::try_from(e).ok()?;
        Self::new(base.num.pow(e), base.den.pow(e))
    }

    /// Exact `n`-th root, if it exists among rationals.
    pub fn root(&self, n: u32) -> Option<Self> {
        if n == 0 || (self.is_negative() && n % 2 == 0) {
            return None;
        }
        let num_root = self.num.nth_root(n);
        let den_root = self.den.nth_root(n);
        if num_root.pow(n) == self.num && den_root.pow(n) == self.den {
            Self::new(num_root, den_root)
        } else {
            None
        }
    }

    pub fn factorial(&self) -> Option<Self> {
        let n = self.to_i64()?;
        if !(0..=MAX_EXACT_FACTORIAL as i64).contains(&n) {
            return None;
        }
        let mut acc = BigInt::one();
        for k in 2..=n {
            acc *= k;
        }
        Some(Self::integer(acc))
    }

    pub fn to_f64(&self) -> f64 {
        let shift = self.num.bits().max(self.den.bits()).saturating_sub(1000);
        let (num, den) = if shift > 0 {
            (&self.num >> shift, &self.den >> shift)
        } else {
            (self.num.clone(), self.den.clone())
        };
        match (num.to_f64(), den.to_f64()) {
            (Some(n), Some(d)) if d != 0.0 => n / d,
            _ => f64::NAN,
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Value carried by a number node.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Rational(Rational),
    Float(f64),
}

impl Number {
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Number::Rational(Rational::integer(value))
    }

    /// Decode the number stored at `node`, if it is a number node.
    pub fn read(node: TreeRef<'_>) -> Option<Number> {
        let payload = node.payload();
        let rational = match node.node_type() {
            NodeType::Zero => Rational::integer(0),
            NodeType::One => Rational::integer(1),
            NodeType::Two => Rational::integer(2),
            NodeType::MinusOne => Rational::integer(-1),
            NodeType::Half => Rational::from_i64_pair(1, 2)?,
            NodeType::IntegerShort => Rational::integer(payload[0] as i8),
            NodeType::IntegerPosBig | NodeType::IntegerNegBig => {
                let sign = sign_of(node.node_type());
                Rational::integer(BigInt::from_bytes_le(sign, &payload[1..]))
            }
            NodeType::RationalShort => {
                Rational::from_i64_pair(payload[0] as i8 as i64, payload[1] as i64)?
            }
            NodeType::RationalPosBig | NodeType::RationalNegBig => {
                let sign = sign_of(node.node_type());
                let num_len = payload[0] as usize;
                let num = BigInt::from_bytes_le(sign, &payload[2..2 + num_len]);
                let den = BigInt::from_bytes_le(Sign::Plus, &payload[2 + num_len..]);
                Rational::new(num, den)?
            }
            NodeType::Float => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&payload[..8]);
                return Some(Number::Float(f64::from_le_bytes(raw)));
            }
            _ => return None,
        };
        Some(Number::Rational(rational))
    }

    /// Append the canonical node encoding of this number to `out`.
    ///
    /// Non-finite floats encode as `Undefined`. Fails when a magnitude does not fit on
    /// [`MAX_MAGNITUDE_BYTES`].
    pub fn encode(&self, out: &mut Vec<u8>) -> CalcResult<()> {
        match self {
            Number::Float(value) => {
                if value.is_finite() {
                    out.push(NodeType::Float.tag());
                    out.extend_from_slice(&value.to_le_bytes());
                } else {
                    out.push(NodeType::Undefined.tag());
                }
                Ok(())
            }
            Number::Rational(r) => encode_rational(r, out),
        }
    }

    pub fn encoded(&self) -> CalcResult<Vec<u8>> {
        let mut out = Vec::with_capacity(4);
        self.encode(&mut out)?;
        Ok(out)
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Rational(r) => r.to_f64(),
            Number::Float(f) => *f,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Rational(r) => r.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Number::Rational(r) => r.is_one(),
            Number::Float(f) => *f == 1.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::Rational(r) => r.is_negative(),
            Number::Float(f) => *f < 0.0,
        }
    }

    pub fn as_rational(&self) -> Option<&Rational> {
        match self {
            Number::Rational(r) => Some(r),
            Number::Float(_) => None,
        }
    }

    /// Floats contaminate: any float operand makes the result a float.
    pub fn add(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Rational(a), Number::Rational(b)) => Number::Rational(a.add(b)),
            _ => Number::Float(self.to_f64() + other.to_f64()),
        }
    }

    pub fn mul(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Rational(a), Number::Rational(b)) => Number::Rational(a.mul(b)),
            _ => Number::Float(self.to_f64() * other.to_f64()),
        }
    }

    /// Power when the result is a number. Rational exponents only fold when the root is exact.
    pub fn pow(&self, exponent: &Number) -> Option<Number> {
        match (self, exponent) {
            (Number::Rational(base), Number::Rational(e)) => {
                let numerator = e.numerator().to_i64()?;
                if e.is_integer() {
                    return base.pow(numerator).map(Number::Rational);
                }
                let n = e.denominator().to_u32()?;
                base.root(n)?.pow(numerator).map(Number::Rational)
            }
            _ => {
                let value = self.to_f64().powf(exponent.to_f64());
                value.is_finite().then_some(Number::Float(value))
            }
        }
    }

    pub fn to_float(&self) -> Number {
        Number::Float(self.to_f64())
    }

    /// Value ordering; floats and rationals compare by magnitude.
    pub fn compare(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Rational(a), Number::Rational(b)) => a.cmp(b),
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Rational(r) => write!(f, "{r}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<Rational> for Number {
    fn from(value: Rational) -> Self {
        Number::Rational(value)
    }
}

#[inline]
fn sign_of(node_type: NodeType) -> Sign {
    match node_type {
        NodeType::IntegerNegBig | NodeType::RationalNegBig => Sign::Minus,
        _ => Sign::Plus,
    }
}

fn magnitude(value: &BigInt) -> CalcResult<Vec<u8>> {
    let (_, bytes) = value.to_bytes_le();
    if bytes.len() > MAX_MAGNITUDE_BYTES {
        return Err(CalcError::CapacityExceeded {
            requested: bytes.len(),
            capacity: MAX_MAGNITUDE_BYTES,
        });
    }
    Ok(bytes)
}

fn encode_rational(r: &Rational, out: &mut Vec<u8>) -> CalcResult<()> {
    let negative = r.is_negative();
    if r.is_integer() {
        let tag = match r.numerator().to_i64() {
            Some(0) => Some(NodeType::Zero),
            Some(1) => Some(NodeType::One),
            Some(2) => Some(NodeType::Two),
            Some(-1) => Some(NodeType::MinusOne),
            _ => None,
        };
        if let Some(tag) = tag {
            out.push(tag.tag());
            return Ok(());
        }
        if let Some(small) = r.numerator().to_i8() {
            out.extend_from_slice(&[NodeType::IntegerShort.tag(), small as u8]);
            return Ok(());
        }
        let bytes = magnitude(r.numerator())?;
        let tag = if negative {
            NodeType::IntegerNegBig
        } else {
            NodeType::IntegerPosBig
        };
        out.push(tag.tag());
        out.push(bytes.len() as u8);
        out.extend_from_slice(&bytes);
        return Ok(());
    }

    if r.numerator().is_one() && r.denominator() == &BigInt::from(2) {
        out.push(NodeType::Half.tag());
        return Ok(());
    }
    if let (Some(num), Some(den)) = (r.numerator().to_i8(), r.denominator().to_u8()) {
        out.extend_from_slice(&[NodeType::RationalShort.tag(), num as u8, den]);
        return Ok(());
    }
    let num = magnitude(r.numerator())?;
    let den = magnitude(r.denominator())?;
    let tag = if negative {
        NodeType::RationalNegBig
    } else {
        NodeType::RationalPosBig
    };
    out.push(tag.tag());
    out.push(num.len() as u8);
    out.push(den.len() as u8);
    out.extend_from_slice(&num);
    out.extend_from_slice(&den);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(number: Number) -> Number {
        let bytes = number.encoded().unwrap();
        Number::read(TreeRef::new(&bytes, 0)).unwrap()
    }

    #[test]
    fn canonical_encodings() {
        assert_eq!(Number::integer(0).encoded().unwrap(), vec![NodeType::Zero.tag()]);
        assert_eq!(Number::integer(-1).encoded().unwrap(), vec![NodeType::MinusOne.tag()]);
        assert_eq!(
            Number::Rational(Rational::from_i64_pair(2, 4).unwrap()).encoded().unwrap(),
            vec![NodeType::Half.tag()]
        );
        assert_eq!(Number::integer(-7).encoded().unwrap()[0], NodeType::IntegerShort.tag());
        assert_eq!(Number::integer(1000).encoded().unwrap()[0], NodeType::IntegerPosBig.tag());
        assert_eq!(Number::Float(f64::NAN).encoded().unwrap(), vec![NodeType::Undefined.tag()]);
    }

    #[test]
    fn big_values_survive_encoding() {
        let big = Rational::integer(3).pow(200).unwrap();
        let fraction = Rational::new(-big.numerator().clone(), BigInt::from(1001)).unwrap();
        assert_eq!(roundtrip(Number::Rational(fraction.clone())), Number::Rational(fraction));
        assert_eq!(roundtrip(Number::Float(2.5)), Number::Float(2.5));
    }

    #[test]
    fn normalisation_and_arithmetic() {
        let a = Rational::from_i64_pair(6, -8).unwrap();
        assert_eq!(a.numerator(), &BigInt::from(-3));
        assert_eq!(a.denominator(), &BigInt::from(4));
        let b = Rational::from_i64_pair(1, 4).unwrap();
        assert_eq!(a.add(&b), Rational::from_i64_pair(-1, 2).unwrap());
        assert!(Rational::from_i64_pair(1, 0).is_none());
        assert!(Rational::integer(0).inverse().is_none());
    }

    #[test]
    fn exact_powers_and_roots() {
        let four = Number::integer(4);
        let half = Number::Rational(Rational::from_i64_pair(1, 2).unwrap());
        assert_eq!(four.pow(&half), Some(Number::integer(2)));
        assert_eq!(Number::integer(2).pow(&half), None);
        assert_eq!(
            Number::integer(2).pow(&Number::integer(-2)),
            Some(Number::Rational(Rational::from_i64_pair(1, 4).unwrap()))
        );
        assert_eq!(Number::integer(2).pow(&Number::integer(100_000)), None);
        assert_eq!(Rational::integer(5).factorial(), Some(Rational::integer(120)));
    }

    #[test]
    fn floats_contaminate() {
        let sum = Number::integer(1).add(&Number::Float(0.5));
        assert_eq!(sum, Number::Float(1.5));
    }
}
