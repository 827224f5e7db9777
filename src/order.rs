//! Total order over values.
//!
//! This order is separate from `==`: equality is structural and bitwise on
//! floats, while this order compares numbers by mathematical value across
//! kinds and only looks at tags once everything else ties. `Value` therefore
//! does not implement `Ord`; use [`Value::total_cmp`] with `sort_by`.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::value::Value;

/// Fixed rank of each category; values in different categories compare by rank.
fn category(value: &Value) -> u8 {
    match value {
        Value::Undefined => 0,
        Value::Null => 1,
        Value::Bool(false) => 2,
        Value::Bool(true) => 3,
        Value::Integer(_)
        | Value::BigInt(_)
        | Value::Single(_)
        | Value::Double(_)
        | Value::Decimal(_)
        | Value::BigFloat(_)
        | Value::Rational(_) => 4,
        Value::Bytes(_) => 5,
        Value::Text(_) => 6,
        Value::Array(_) => 7,
        Value::Map(_) => 8,
        Value::Simple(_) => 9,
        Value::Tag(_, inner) => category(inner.untagged()),
    }
}

impl Value {
    /// Compares two values under the total order.
    ///
    /// `undefined < null < false < true` sit below everything else. Numbers
    /// compare by value with NaN above every other number, byte and text
    /// strings lexicographically, arrays element-wise (a proper prefix is
    /// smaller) and maps by their sorted keys first and then by the values at
    /// those keys. Remaining ties are broken by the tag chains, outermost
    /// first, with a shorter chain ranking lower.
    ///
    /// ```
    /// use cbor_codec::Value;
    /// use std::cmp::Ordering;
    ///
    /// assert_eq!(Value::Null.total_cmp(&Value::Bool(false)), Ordering::Less);
    /// assert_eq!(Value::Integer(1).total_cmp(&Value::Double(1.0)), Ordering::Equal);
    /// assert_eq!(
    ///     Value::Double(f64::NAN).total_cmp(&Value::Double(f64::INFINITY)),
    ///     Ordering::Greater
    /// );
    /// ```
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        compare_untagged(self.untagged(), other.untagged())
            .then_with(|| self.tags().cmp(&other.tags()))
    }
}

fn compare_untagged(a: &Value, b: &Value) -> Ordering {
    let rank = category(a).cmp(&category(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Simple(x), Value::Simple(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ordering::Equal;
            }
            let (x, y) = (x.borrow(), y.borrow());
            compare_sequences(x.iter(), y.iter())
        }
        (Value::Map(x), Value::Map(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ordering::Equal;
            }
            let (x, y) = (x.borrow(), y.borrow());
            let mut xs: Vec<_> = x.iter().collect();
            let mut ys: Vec<_> = y.iter().collect();
            xs.sort_by(|p, q| p.0.total_cmp(q.0));
            ys.sort_by(|p, q| p.0.total_cmp(q.0));
            compare_sequences(xs.iter().map(|e| e.0), ys.iter().map(|e| e.0))
                .then_with(|| compare_sequences(xs.iter().map(|e| e.1), ys.iter().map(|e| e.1)))
        }
        _ => match (a.to_number(), b.to_number()) {
            (Ok(x), Ok(y)) => x.compare(&y),
            // same rank and not a number: the two dedicated-value ranks hold a single value each
            _ => Ordering::Equal,
        },
    }
}

fn compare_sequences<'a>(
    mut xs: impl Iterator<Item = &'a Value>,
    mut ys: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.total_cmp(y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}
