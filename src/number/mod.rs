//! The numeric tower.
//!
//! A CBOR value can hold a number in seven representations: 64-bit integers,
//! big integers, single and double precision floats, decimal fractions,
//! bigfloats and rationals. [`Number`] is the closed sum of those kinds and
//! provides the predicates, conversions and the cross-kind total order that
//! the rest of the crate relies on.
//!
//! ```
//! use cbor_codec::number::{DecimalFraction, Number};
//! use std::cmp::Ordering;
//!
//! let a = Number::Decimal(DecimalFraction::new(15, -1));
//! assert_eq!(a.compare(&Number::Double(1.5)), Ordering::Equal);
//! assert!(a.can_fit_in_f64());
//! assert!(!a.is_integral());
//! ```

mod exact;
mod fraction;
mod rational;

pub use fraction::{BigFloat, DecimalFraction, Fraction};
pub use rational::Rational;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{CborError, Result};
use exact::Exact;

/// How a fraction or rational departs from an ordinary finite number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    Finite,
    NegativeZero,
    PositiveInfinity,
    NegativeInfinity,
    NaN,
}

impl Class {
    pub fn is_finite(self) -> bool {
        matches!(self, Class::Finite | Class::NegativeZero)
    }
}

/// Result of [`Number::sign`]. `NaN` has no sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signum {
    Negative,
    Zero,
    Positive,
    NaN,
}

impl Signum {
    /// -1, 0 or 1, or `None` for NaN.
    pub fn as_i32(self) -> Option<i32> {
        match self {
            Signum::Negative => Some(-1),
            Signum::Zero => Some(0),
            Signum::Positive => Some(1),
            Signum::NaN => None,
        }
    }
}

/// A number of any of the seven kinds a CBOR value can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Integer(i64),
    /// Always outside the `i64` range when built through [`Number::from_bigint`].
    BigInt(BigInt),
    Single(f32),
    Double(f64),
    Decimal(DecimalFraction),
    BigFloat(BigFloat),
    Rational(Rational),
}

impl Number {
    /// Picks `Integer` when the value fits in an `i64`.
    pub fn from_bigint(value: BigInt) -> Number {
        match value.to_i64() {
            Some(i) => Number::Integer(i),
            None => Number::BigInt(value),
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Number::Integer(_) | Number::BigInt(_) => false,
            Number::Single(f) => f.is_nan(),
            Number::Double(f) => f.is_nan(),
            Number::Decimal(d) => d.is_nan(),
            Number::BigFloat(b) => b.is_nan(),
            Number::Rational(r) => r.is_nan(),
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.is_positive_infinity() || self.is_negative_infinity()
    }

    pub fn is_positive_infinity(&self) -> bool {
        match self {
            Number::Integer(_) | Number::BigInt(_) => false,
            Number::Single(f) => *f == f32::INFINITY,
            Number::Double(f) => *f == f64::INFINITY,
            Number::Decimal(d) => d.class() == Class::PositiveInfinity,
            Number::BigFloat(b) => b.class() == Class::PositiveInfinity,
            Number::Rational(r) => r.class() == Class::PositiveInfinity,
        }
    }

    pub fn is_negative_infinity(&self) -> bool {
        match self {
            Number::Integer(_) | Number::BigInt(_) => false,
            Number::Single(f) => *f == f32::NEG_INFINITY,
            Number::Double(f) => *f == f64::NEG_INFINITY,
            Number::Decimal(d) => d.class() == Class::NegativeInfinity,
            Number::BigFloat(b) => b.class() == Class::NegativeInfinity,
            Number::Rational(r) => r.class() == Class::NegativeInfinity,
        }
    }

    pub fn is_finite(&self) -> bool {
        !self.is_nan() && !self.is_infinite()
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(i) => *i == 0,
            Number::BigInt(b) => b.is_zero(),
            Number::Single(f) => *f == 0.0,
            Number::Double(f) => *f == 0.0,
            Number::Decimal(d) => d.is_zero(),
            Number::BigFloat(b) => b.is_zero(),
            Number::Rational(r) => r.is_zero(),
        }
    }

    /// Sign of the value; zero (including negative zero) is `Zero`.
    pub fn sign(&self) -> Signum {
        if self.is_nan() {
            return Signum::NaN;
        }
        if self.is_zero() {
            return Signum::Zero;
        }
        let negative = match self {
            Number::Integer(i) => *i < 0,
            Number::BigInt(b) => b.is_negative(),
            Number::Single(f) => *f < 0.0,
            Number::Double(f) => *f < 0.0,
            Number::Decimal(d) => d.is_negative(),
            Number::BigFloat(b) => b.is_negative(),
            Number::Rational(r) => r.is_negative(),
        };
        if negative {
            Signum::Negative
        } else {
            Signum::Positive
        }
    }

    pub fn is_integral(&self) -> bool {
        match self {
            Number::Integer(_) | Number::BigInt(_) => true,
            Number::Single(f) => f.is_finite() && f.trunc() == *f,
            Number::Double(f) => f.is_finite() && f.trunc() == *f,
            Number::Decimal(d) => d.is_integral(),
            Number::BigFloat(b) => b.is_integral(),
            Number::Rational(r) => r.is_integral(),
        }
    }

    fn exact(&self) -> Result<Exact> {
        Exact::from_number(self).ok_or_else(|| CborError::range("value is not a finite number"))
    }

    /// Integer part, rounding toward zero. Fails for NaN and infinities.
    pub fn truncate(&self) -> Result<BigInt> {
        match self {
            Number::Integer(i) => Ok(BigInt::from(*i)),
            Number::BigInt(b) => Ok(b.clone()),
            Number::Double(f) if f.is_finite() => BigInt::from_f64(f.trunc())
                .ok_or_else(|| CborError::range("value is not a finite number")),
            _ => self.exact()?.truncate(),
        }
    }

    /// Exact integer value; fails when the number has a fractional part or is not finite.
    pub fn to_bigint(&self) -> Result<BigInt> {
        if !self.is_integral() {
            return Err(CborError::range(format!("{self} is not an integer")));
        }
        self.truncate()
    }

    pub fn to_i64(&self) -> Result<i64> {
        if let Number::Integer(i) = self {
            return Ok(*i);
        }
        self.to_bigint()?
            .to_i64()
            .ok_or_else(|| CborError::range(format!("{self} does not fit in an i64")))
    }

    pub fn to_i32(&self) -> Result<i32> {
        self.to_bigint()?
            .to_i32()
            .ok_or_else(|| CborError::range(format!("{self} does not fit in an i32")))
    }

    /// Nearest double. NaN and infinities map to their double counterparts.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Single(f) => f64::from(*f),
            Number::Double(f) => *f,
            _ if self.is_nan() => f64::NAN,
            _ if self.is_positive_infinity() => f64::INFINITY,
            _ if self.is_negative_infinity() => f64::NEG_INFINITY,
            _ => match Exact::from_number(self) {
                Some(exact) => exact.to_f64(),
                None => f64::NAN,
            },
        }
    }

    /// Nearest single.
    pub fn to_f32(&self) -> f32 {
        match self {
            Number::Single(f) => *f,
            Number::Double(f) => *f as f32,
            _ if self.is_nan() => f32::NAN,
            _ if self.is_positive_infinity() => f32::INFINITY,
            _ if self.is_negative_infinity() => f32::NEG_INFINITY,
            _ => match Exact::from_number(self) {
                Some(exact) => exact.to_f32(),
                None => f32::NAN,
            },
        }
    }

    /// Exact rational form. Non-finite values map to non-finite rationals.
    pub fn to_rational(&self) -> Result<Rational> {
        if self.is_nan() {
            return Ok(Rational::nan());
        }
        if self.is_infinite() {
            return Ok(Rational::infinity(self.is_negative_infinity()));
        }
        match self {
            Number::Integer(i) => Ok(Rational::from_integer(*i)),
            Number::BigInt(b) => Ok(Rational::from_integer(b.clone())),
            Number::Rational(r) => Ok(r.clone()),
            _ if self.is_zero() && self.has_sign_bit() => Ok(Rational::negative_zero()),
            _ => Ok(Rational::from(self.exact()?.to_big_rational()?)),
        }
    }

    fn has_sign_bit(&self) -> bool {
        match self {
            Number::Integer(i) => *i < 0,
            Number::BigInt(b) => b.is_negative(),
            Number::Single(f) => f.is_sign_negative(),
            Number::Double(f) => f.is_sign_negative(),
            Number::Decimal(d) => d.is_negative(),
            Number::BigFloat(b) => b.is_negative(),
            Number::Rational(r) => r.is_negative(),
        }
    }

    /// Whether the value converts to an `i32` without loss.
    pub fn can_fit_in_i32(&self) -> bool {
        self.is_integral() && self.can_truncated_int_fit_in_i32()
    }

    /// Whether the value converts to an `i64` without loss.
    pub fn can_fit_in_i64(&self) -> bool {
        self.is_integral() && self.can_truncated_int_fit_in_i64()
    }

    /// Whether truncating toward zero leaves a value in the `i32` range.
    pub fn can_truncated_int_fit_in_i32(&self) -> bool {
        self.truncated_fits(|b| b.to_i32().is_some())
    }

    /// Whether truncating toward zero leaves a value in the `i64` range.
    pub fn can_truncated_int_fit_in_i64(&self) -> bool {
        self.truncated_fits(|b| b.to_i64().is_some())
    }

    fn truncated_fits(&self, fits: impl Fn(&BigInt) -> bool) -> bool {
        match self {
            Number::Integer(i) => fits(&BigInt::from(*i)),
            Number::BigInt(b) => fits(b),
            _ if !self.is_finite() => false,
            _ => match Exact::from_number(self) {
                // nothing beyond 2^70 survives either range; skip materializing it
                Some(exact) if exact.is_zero() || exact.log2_estimate() < 70.0 => {
                    exact.truncate().is_ok_and(|b| fits(&b))
                }
                _ => false,
            },
        }
    }

    /// Whether the value survives a round trip through `f64`. NaN always fits.
    pub fn can_fit_in_f64(&self) -> bool {
        match self {
            Number::Single(_) | Number::Double(_) => true,
            _ if self.is_nan() || self.is_infinite() => true,
            _ => self.compare(&Number::Double(self.to_f64())) == Ordering::Equal,
        }
    }

    /// Whether the value survives a round trip through `f32`. NaN always fits.
    pub fn can_fit_in_f32(&self) -> bool {
        match self {
            Number::Single(_) => true,
            _ if self.is_nan() || self.is_infinite() => true,
            _ => self.compare(&Number::Single(self.to_f32())) == Ordering::Equal,
        }
    }

    pub fn negate(&self) -> Number {
        match self {
            Number::Integer(i) => match i.checked_neg() {
                Some(n) => Number::Integer(n),
                None => Number::BigInt(-BigInt::from(*i)),
            },
            Number::BigInt(b) => Number::from_bigint(-b),
            Number::Single(f) => Number::Single(-f),
            Number::Double(f) => Number::Double(-f),
            Number::Decimal(d) => Number::Decimal(d.negate()),
            Number::BigFloat(b) => Number::BigFloat(b.negate()),
            Number::Rational(r) => Number::Rational(r.negate()),
        }
    }

    pub fn abs(&self) -> Number {
        match self {
            Number::Integer(i) => match i.checked_abs() {
                Some(n) => Number::Integer(n),
                None => Number::BigInt(BigInt::from(*i).abs()),
            },
            Number::BigInt(b) => Number::BigInt(b.abs()),
            Number::Single(f) => Number::Single(f.abs()),
            Number::Double(f) => Number::Double(f.abs()),
            Number::Decimal(d) => Number::Decimal(d.abs()),
            Number::BigFloat(b) => Number::BigFloat(b.abs()),
            Number::Rational(r) => Number::Rational(r.abs()),
        }
    }

    /// Compares by mathematical value across kinds. NaN is greater than every
    /// other number, including positive infinity, and equal to any other NaN.
    /// Exact: a decimal `0.1` is less than the double nearest to it.
    pub fn compare(&self, other: &Number) -> Ordering {
        exact::compare(self, other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::BigInt(b) => write!(f, "{b}"),
            Number::Single(x) => write!(f, "{x}"),
            Number::Double(x) => write!(f, "{x}"),
            Number::Decimal(d) => write!(f, "{d}"),
            Number::BigFloat(b) => write!(f, "{b}"),
            Number::Rational(r) => write!(f, "{r}"),
        }
    }
}
