use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::fmt;

use super::Class;
use crate::error::{CborError, Result};

/// An arbitrary-precision `numerator / denominator` (CBOR tag 30).
///
/// The denominator is always positive. The fraction is kept as given and not
/// reduced, so `2/4` survives a round trip unchanged; comparisons are by
/// mathematical value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
    class: Class,
}

impl Rational {
    /// Builds `numerator / denominator`, moving a negative sign onto the numerator.
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Result<Self> {
        let mut numerator = numerator.into();
        let mut denominator = denominator.into();
        if denominator.is_zero() {
            return Err(CborError::argument("rational denominator is zero"));
        }
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }
        Ok(Rational {
            numerator,
            denominator,
            class: Class::Finite,
        })
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Rational {
            numerator: value.into(),
            denominator: BigInt::one(),
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

    pub fn negative_zero() -> Self {
        Self::special(Class::NegativeZero)
    }

    fn special(class: Class) -> Self {
        Rational {
            numerator: BigInt::zero(),
            denominator: BigInt::one(),
            class,
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
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
        self.class == Class::NegativeZero || (self.class == Class::Finite && self.numerator.is_zero())
    }

    pub fn is_negative(&self) -> bool {
        match self.class {
            Class::Finite => self.numerator.is_negative(),
            Class::NegativeZero | Class::NegativeInfinity => true,
            Class::PositiveInfinity | Class::NaN => false,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.is_finite() && self.numerator.is_multiple_of(&self.denominator)
    }

    pub fn negate(&self) -> Self {
        match self.class {
            Class::Finite if self.numerator.is_zero() => Self::negative_zero(),
            Class::Finite => Rational {
                numerator: -&self.numerator,
                denominator: self.denominator.clone(),
                class: Class::Finite,
            },
            Class::NegativeZero => Self::from_integer(0),
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

    /// The reduced mathematical value, or `None` when not finite.
    pub fn to_big_rational(&self) -> Option<BigRational> {
        self.is_finite()
            .then(|| BigRational::new(self.numerator.clone(), self.denominator.clone()))
    }
}

impl From<BigRational> for Rational {
    fn from(value: BigRational) -> Self {
        let (numerator, denominator) = value.into_raw();
        Rational {
            numerator,
            denominator,
            class: Class::Finite,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.class {
            Class::Finite => write!(f, "{}/{}", self.numerator, self.denominator),
            Class::NegativeZero => f.write_str("-0/1"),
            Class::PositiveInfinity => f.write_str("Infinity"),
            Class::NegativeInfinity => f.write_str("-Infinity"),
            Class::NaN => f.write_str("NaN"),
        }
    }
}
