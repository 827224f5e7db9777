//! Exact arithmetic kernel shared by the numeric tower.
//!
//! Every finite number of every kind is viewed as
//! `±mantissa * 2^pow2 * 10^pow10 / denominator`. Comparisons first use a
//! cheap base-2 logarithm estimate and only materialize the scaled operands
//! when the two magnitudes are close, so numbers with enormous exponents never
//! force enormous allocations.

use num_bigint::{BigInt, BigUint, Sign};
use num_rational::BigRational;
use num_traits::{Float, One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

use super::Number;
use crate::error::{CborError, Result};

/// Largest power of two or ten the kernel will materialize.
const MAX_SCALE: u64 = 1 << 20;

const LOG2_10: f64 = std::f64::consts::LOG2_10;

const LOG2_5: f64 = LOG2_10 - 1.0;

pub(crate) struct Exact {
    negative: bool,
    mantissa: BigUint,
    pow2: BigInt,
    pow10: BigInt,
    denominator: BigUint,
}

impl Exact {
    fn integer(negative: bool, mantissa: BigUint) -> Self {
        Exact {
            negative,
            mantissa,
            pow2: BigInt::zero(),
            pow10: BigInt::zero(),
            denominator: BigUint::one(),
        }
    }

    fn from_f64(value: f64) -> Self {
        let (mantissa, exponent, sign) = Float::integer_decode(value);
        Exact {
            pow2: BigInt::from(exponent),
            ..Exact::integer(sign < 0, BigUint::from(mantissa))
        }
    }

    /// `None` for NaN and infinities.
    pub(crate) fn from_number(number: &Number) -> Option<Self> {
        let exact = match number {
            Number::Integer(i) => Exact::integer(*i < 0, BigUint::from(i.unsigned_abs())),
            Number::BigInt(b) => Exact::integer(b.is_negative(), b.magnitude().clone()),
            Number::Single(f) if f.is_finite() => Exact::from_f64(f64::from(*f)),
            Number::Double(f) if f.is_finite() => Exact::from_f64(*f),
            Number::Single(_) | Number::Double(_) => return None,
            Number::Decimal(d) if d.is_finite() => Exact {
                pow10: d.exponent().clone(),
                ..Exact::integer(d.is_negative(), d.mantissa().magnitude().clone())
            },
            Number::BigFloat(b) if b.is_finite() => Exact {
                pow2: b.exponent().clone(),
                ..Exact::integer(b.is_negative(), b.mantissa().magnitude().clone())
            },
            Number::Rational(r) if r.is_finite() => Exact {
                denominator: r.denominator().magnitude().clone(),
                ..Exact::integer(r.is_negative(), r.numerator().magnitude().clone())
            },
            Number::Decimal(_) | Number::BigFloat(_) | Number::Rational(_) => return None,
        };
        Some(exact)
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Approximate base-2 logarithm of the magnitude, within 2 for ordinary
    /// exponents. Meaningless for zero.
    pub(crate) fn log2_estimate(&self) -> f64 {
        let pow2 = self.pow2.to_f64().unwrap_or(f64::NAN);
        let pow10 = self.pow10.to_f64().unwrap_or(f64::NAN);
        self.mantissa.bits() as f64 - self.denominator.bits() as f64 + pow2 + pow10 * LOG2_10
    }

    fn cmp_magnitude(&self, other: &Exact) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        // self / other = (x / y) * 2^e2 * 5^e5, since 10^k = 2^k * 5^k
        let x = &self.mantissa * &other.denominator;
        let y = &other.mantissa * &self.denominator;
        let e5 = &self.pow10 - &other.pow10;
        let e2 = &self.pow2 - &other.pow2 + &e5;
        if let Some(order) = estimate_order(&x, &y, &e2, &e5) {
            return order;
        }
        // the two magnitudes are within rounding error of each other, so once
        // the power of five is applied the power of two is bounded by the operand sizes
        let exact = scale(&e5).zip(e2.magnitude().to_usize()).map(|(s5, s2)| {
            let p5 = BigUint::from(5u32).pow(s5 as u32);
            let (mut lhs, mut rhs) = if e5.is_negative() { (x, y * p5) } else { (x * p5, y) };
            if e2.is_negative() {
                rhs <<= s2;
            } else {
                lhs <<= s2;
            }
            lhs.cmp(&rhs)
        });
        // TODO: bound log2(5) with interval arithmetic to order near-ties whose
        // power of five is too large to materialize
        exact.unwrap_or_else(|| self.pow10.cmp(&other.pow10).then(self.pow2.cmp(&other.pow2)))
    }

    pub(crate) fn to_big_rational(&self) -> Result<BigRational> {
        let too_large = || CborError::range("exponent too large to convert exactly");
        let s2 = scale(&self.pow2).ok_or_else(too_large)?;
        let s10 = scale(&self.pow10).ok_or_else(too_large)?;
        let mut numer = self.mantissa.clone();
        let mut denom = self.denominator.clone();
        if self.pow2.is_negative() {
            denom <<= s2;
        } else {
            numer <<= s2;
        }
        let p10 = BigUint::from(10u32).pow(s10 as u32);
        if self.pow10.is_negative() {
            denom *= p10;
        } else {
            numer *= p10;
        }
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        Ok(BigRational::new(
            BigInt::from_biguint(sign, numer),
            BigInt::from_biguint(Sign::Plus, denom),
        ))
    }

    /// Integer part, rounding toward zero.
    pub(crate) fn truncate(&self) -> Result<BigInt> {
        if self.is_zero() || self.log2_estimate() < -4.0 {
            return Ok(BigInt::zero());
        }
        Ok(self.to_big_rational()?.trunc().to_integer())
    }

    /// Nearest double; `max_exp`/`min_exp` bound the binary exponents the
    /// target can represent so out-of-range values skip exact evaluation.
    fn to_float(&self, max_exp: f64, min_exp: f64) -> f64 {
        let signed = |x: f64| if self.negative { -x } else { x };
        if self.is_zero() {
            return signed(0.0);
        }
        let estimate = self.log2_estimate();
        if estimate > max_exp + 2.0 {
            return signed(f64::INFINITY);
        }
        if estimate < min_exp - 4.0 {
            return signed(0.0);
        }
        match self.to_big_rational().ok().and_then(|r| r.to_f64()) {
            Some(f) if f == 0.0 => signed(0.0),
            Some(f) => f,
            None => signed(estimate.exp2()),
        }
    }

    pub(crate) fn to_f64(&self) -> f64 {
        self.to_float(1024.0, -1074.0)
    }

    pub(crate) fn to_f32(&self) -> f32 {
        let sign = if self.negative { -1.0f32 } else { 1.0 };
        if self.is_zero() {
            return sign * 0.0;
        }
        let estimate = self.log2_estimate();
        if estimate > 130.0 {
            return sign * f32::INFINITY;
        }
        if estimate < -154.0 {
            return sign * 0.0;
        }
        match self.to_big_rational().ok().and_then(|r| r.to_f32()) {
            Some(f) if f == 0.0 => sign * 0.0,
            Some(f) => f,
            None => self.to_f64() as f32,
        }
    }
}

/// Base-2 logarithm of a non-zero integer, accurate to a few ulps.
fn log2(n: &BigUint) -> f64 {
    let shift = n.bits().saturating_sub(64);
    let top = (n >> shift).to_u64().unwrap_or(u64::MAX);
    (top as f64).log2() + shift as f64
}

/// Sign of `log2(x / y) + e2 + e5 * log2(5)`, or `None` when it is within
/// the rounding error of the computation.
fn estimate_order(x: &BigUint, y: &BigUint, e2: &BigInt, e5: &BigInt) -> Option<Ordering> {
    let sign = |positive: bool| if positive { Ordering::Greater } else { Ordering::Less };
    let mantissas = log2(x) - log2(y);
    let finite = |e: &BigInt| e.to_f64().filter(|f| f.is_finite());
    if let (Some(f2), Some(f5)) = (finite(e2), finite(e5)) {
        let delta = mantissas + f2 + f5 * LOG2_5;
        let error = 1e-9 + (f2.abs() + 3.0 * f5.abs() + mantissas.abs()) * 1e-14;
        return (delta.abs() > error).then(|| sign(delta > 0.0));
    }
    // exponents past the f64 range: millionths, with log2(5) rounded down to six places
    let scaled = e2 * 1_000_000i64 + e5 * 2_321_928i64 + BigInt::from((mantissas * 1e6) as i64);
    let slack = e5.abs() + 1_000_000i64;
    (scaled.abs() > slack).then(|| sign(scaled.is_positive()))
}

fn scale(exponent: &BigInt) -> Option<usize> {
    exponent
        .magnitude()
        .to_u64()
        .filter(|s| *s <= MAX_SCALE)
        .map(|s| s as usize)
}

/// Total numeric order: NaN is greater than everything else and equal to
/// itself, negative zero equals zero.
pub(crate) fn compare(a: &Number, b: &Number) -> Ordering {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => return x.cmp(y),
        (Number::Double(x), Number::Double(y)) if !x.is_nan() && !y.is_nan() => {
            return x.partial_cmp(y).unwrap_or(Ordering::Equal);
        }
        _ => {}
    }
    match (a.is_nan(), b.is_nan()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let (ia, ib) = (infinity_rank(a), infinity_rank(b));
    if ia != 0 || ib != 0 {
        return ia.cmp(&ib);
    }
    let (Some(ea), Some(eb)) = (Exact::from_number(a), Exact::from_number(b)) else {
        return Ordering::Equal;
    };
    let sa = if ea.is_zero() { 0 } else if ea.negative { -1 } else { 1 };
    let sb = if eb.is_zero() { 0 } else if eb.negative { -1 } else { 1 };
    if sa != sb {
        return sa.cmp(&sb);
    }
    let magnitude = ea.cmp_magnitude(&eb);
    if sa < 0 { magnitude.reverse() } else { magnitude }
}

fn infinity_rank(n: &Number) -> i8 {
    if n.is_positive_infinity() {
        1
    } else if n.is_negative_infinity() {
        -1
    } else {
        0
    }
}
