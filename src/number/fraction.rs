use num_bigint::BigInt;
use num_traits::{Float, Signed, ToPrimitive, Zero};
use std::fmt;

use super::Class;

/// An arbitrary-precision `mantissa * RADIX^exponent`.
///
/// CBOR carries two instances of this shape: decimal fractions (tags 4 and
/// 264, `RADIX = 10`) and bigfloats (tags 5 and 265, `RADIX = 2`). Both the
/// mantissa and the exponent are unbounded integers. Non-finite values and
/// negative zero are carried by [`Class`]; for those the mantissa is zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fraction<const RADIX: u32> {
    mantissa: BigInt,
    exponent: BigInt,
    class: Class,
}

/// Base-10 fraction (CBOR tags 4 and 264).
pub type DecimalFraction = Fraction<10>;

/// Base-2 fraction (CBOR tags 5 and 265).
pub type BigFloat = Fraction<2>;

impl<const RADIX: u32> Fraction<RADIX> {
    pub fn new(mantissa: impl Into<BigInt>, exponent: impl Into<BigInt>) -> Self {
        Fraction {
            mantissa: mantissa.into(),
            exponent: exponent.into(),
            class: Class::Finite,
        }
    }

    pub fn nan() -> Self {
        Self::special(Class::NaN)
    }

    pub fn infinity(negative: bool) -> Self {
        if negative {
            Self::special(Class::NegativeInfinity)
        } else {
            Self::special(Class::PositiveInfinity)
        }
    }

    pub fn negative_zero(exponent: impl Into<BigInt>) -> Self {
        Fraction {
            mantissa: BigInt::zero(),
            exponent: exponent.into(),
            class: Class::NegativeZero,
        }
    }

    fn special(class: Class) -> Self {
        Fraction {
            mantissa: BigInt::zero(),
            exponent: BigInt::zero(),
            class,
        }
    }

    pub fn radix() -> u32 {
        RADIX
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> &BigInt {
        &self.exponent
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn is_finite(&self) -> bool {
        self.class.is_finite()
    }

    pub fn is_nan(&self) -> bool {
        self.class == Class::NaN
    }

    pub fn is_infinite(&self) -> bool {
        matches!(
            self.class,
            Class::PositiveInfinity | Class::NegativeInfinity
        )
    }

    pub fn is_zero(&self) -> bool {
        self.class == Class::NegativeZero || (self.class == Class::Finite && self.mantissa.is_zero())
    }

    /// True when the sign bit is set, including negative zero and negative infinity.
    pub fn is_negative(&self) -> bool {
        match self.class {
            Class::Finite => self.mantissa.is_negative(),
            Class::NegativeZero | Class::NegativeInfinity => true,
            Class::PositiveInfinity | Class::NaN => false,
        }
    }

    /// Whether the value has no fractional part.
    pub fn is_integral(&self) -> bool {
        if !self.is_finite() {
            return false;
        }
        if !self.exponent.is_negative() || self.mantissa.is_zero() {
            return true;
        }
        // exponents beyond 64 bits can never be absorbed by a materialized mantissa
        let Some(shift) = (-&self.exponent).to_u64() else {
            return false;
        };
        if RADIX == 2 {
            return self.mantissa.trailing_zeros().is_some_and(|tz| tz >= shift);
        }
        // RADIX^shift > 2^shift, so a mantissa with fewer bits can't be a multiple of it
        if shift > self.mantissa.bits() {
            return false;
        }
        let Ok(shift) = u32::try_from(shift) else {
            return false;
        };
        (&self.mantissa % BigInt::from(RADIX).pow(shift)).is_zero()
    }

    pub fn negate(&self) -> Self {
        match self.class {
            Class::Finite if self.mantissa.is_zero() => Self::negative_zero(self.exponent.clone()),
            Class::Finite => Fraction {
                mantissa: -&self.mantissa,
                exponent: self.exponent.clone(),
                class: Class::Finite,
            },
            Class::NegativeZero => Self::new(BigInt::zero(), self.exponent.clone()),
            Class::PositiveInfinity => Self::infinity(true),
            Class::NegativeInfinity => Self::infinity(false),
            Class::NaN => Self::nan(),
        }
    }

    pub fn abs(&self) -> Self {
        if self.is_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }
}

impl From<f64> for BigFloat {
    /// Exact conversion; every finite double is a bigfloat.
    fn from(value: f64) -> Self {
        if value.is_nan() {
            return BigFloat::nan();
        }
        if value.is_infinite() {
            return BigFloat::infinity(value < 0.0);
        }
        if value == 0.0 {
            return if value.is_sign_negative() {
                BigFloat::negative_zero(0)
            } else {
                BigFloat::new(0, 0)
            };
        }
        let (mantissa, exponent, sign) = Float::integer_decode(value);
        let mut mantissa = BigInt::from(mantissa);
        if sign < 0 {
            mantissa = -mantissa;
        }
        BigFloat::new(mantissa, exponent)
    }
}

impl From<f32> for BigFloat {
    fn from(value: f32) -> Self {
        BigFloat::from(f64::from(value))
    }
}

impl<const RADIX: u32> fmt::Display for Fraction<RADIX> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let marker = if RADIX == 10 { 'E' } else { 'P' };
        match self.class {
            Class::Finite => write!(f, "{}{}{}", self.mantissa, marker, self.exponent),
            Class::NegativeZero => write!(f, "-0{}{}", marker, self.exponent),
            Class::PositiveInfinity => f.write_str("Infinity"),
            Class::NegativeInfinity => f.write_str("-Infinity"),
            Class::NaN => f.write_str("NaN"),
        }
    }
}
