//! Diagnostic notation (RFC 8949 section 8) for `Display` and `Debug`.

use std::fmt::{self, Write};

use crate::number::Class;
use crate::value::Value;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_value(f, self, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_value(f: &mut fmt::Formatter, value: &Value, stack: &mut Vec<*const ()>) -> fmt::Result {
    if let Some(ptr) = value.container_ptr() {
        if stack.contains(&ptr) {
            return f.write_str("<cycle>");
        }
        stack.push(ptr);
        let result = write_container(f, value, stack);
        stack.pop();
        return result;
    }
    match value {
        Value::Integer(i) => write!(f, "{i}"),
        Value::BigInt(b) => write!(f, "{b}"),
        Value::Bytes(b) => write!(f, "h'{}'", hex::encode(b)),
        Value::Text(s) => write_text(f, s),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Null => f.write_str("null"),
        Value::Undefined => f.write_str("undefined"),
        Value::Simple(s) => write!(f, "simple({})", s.get()),
        Value::Single(x) => {
            write_float(f, f64::from(*x))?;
            f.write_str("_2")
        }
        Value::Double(x) => write_float(f, *x),
        Value::Decimal(d) => match d.class() {
            Class::Finite => write_pair(f, 4, d.exponent(), d.mantissa()),
            Class::NegativeZero => write!(f, "4([{}, -0])", d.exponent()),
            _ => write_float(f, non_finite(d.is_nan(), d.is_negative())),
        },
        Value::BigFloat(b) => match b.class() {
            Class::Finite => write_pair(f, 5, b.exponent(), b.mantissa()),
            Class::NegativeZero => write!(f, "5([{}, -0])", b.exponent()),
            _ => write_float(f, non_finite(b.is_nan(), b.is_negative())),
        },
        Value::Rational(r) => match r.class() {
            Class::Finite => write_pair(f, 30, r.numerator(), r.denominator()),
            Class::NegativeZero => f.write_str("-0.0"),
            _ => write_float(f, non_finite(r.is_nan(), r.is_negative())),
        },
        Value::Tag(tag, inner) => {
            write!(f, "{tag}(")?;
            write_value(f, inner, stack)?;
            f.write_char(')')
        }
        Value::Array(_) | Value::Map(_) => Ok(()),
    }
}

fn write_container(f: &mut fmt::Formatter, value: &Value, stack: &mut Vec<*const ()>) -> fmt::Result {
    match value {
        Value::Array(items) => {
            f.write_char('[')?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, item, stack)?;
            }
            f.write_char(']')
        }
        Value::Map(map) => {
            f.write_char('{')?;
            for (i, (k, v)) in map.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, k, stack)?;
                f.write_str(": ")?;
                write_value(f, v, stack)?;
            }
            f.write_char('}')
        }
        _ => Ok(()),
    }
}

fn write_pair(f: &mut fmt::Formatter, tag: u64, a: impl fmt::Display, b: impl fmt::Display) -> fmt::Result {
    write!(f, "{tag}([{a}, {b}])")
}

fn non_finite(nan: bool, negative: bool) -> f64 {
    match (nan, negative) {
        (true, _) => f64::NAN,
        (false, true) => f64::NEG_INFINITY,
        (false, false) => f64::INFINITY,
    }
}

fn write_float(f: &mut fmt::Formatter, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{x:?}")
    }
}

fn write_text(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
