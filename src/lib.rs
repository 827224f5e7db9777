//! # CBOR codec
//!
//! A CBOR (Concise Binary Object Representation, RFC 8949) encoder/decoder
//! built around a dynamic [`Value`] tree.
//!
//! ## Features
//! - Full support for CBOR major types 0-7, including indefinite-length
//!   strings, arrays and maps and half-precision floats on input
//! - Arbitrary-precision numbers: bignums (tags 2/3), decimal fractions
//!   (tags 4/264), bigfloats (tags 5/265) and rationals (tag 30) decode into
//!   native numeric kinds and compare by value across kinds
//! - Tag validation through a [`TagRegistry`] of [`TagHandler`]s checked
//!   against declarative [`TypeFilter`]s; custom tags can be registered
//! - Shortest-form integers and lengths on output, optional deterministic
//!   map key order, and cycle detection for shared containers
//! - A nesting limit on input so hostile documents cannot exhaust the stack
//!
//! ## Example
//! ```rust
//! use cbor_codec::{Value, from_slice, to_vec};
//!
//! let bytes = hex::decode("c48221196ab3").unwrap(); // 4([-2, 27315])
//! let value = from_slice(&bytes).unwrap();
//! assert!(matches!(value, Value::Decimal(_)));
//! assert_eq!(value.to_f64().unwrap(), 273.15);
//! assert_eq!(to_vec(&value).unwrap(), bytes);
//!
//! let array = Value::array(vec![1.into(), "two".into()]);
//! array.push(Value::Null).unwrap();
//! assert_eq!(array.to_string(), r#"[1, "two", null]"#);
//! ```

use std::io::{Read, Write};

pub mod error;
pub mod number;
pub mod tags;

mod decoder;
mod diag;
mod encoder;
mod filter;
mod map;
mod order;
mod value;

pub use decoder::{DecodeOptions, Decoder};
pub use encoder::{EncodeOptions, Encoder, TEXT_CHUNK_SIZE};
pub use error::{CborError, Result};
pub use filter::TypeFilter;
pub use map::CborMap;
pub use number::Number;
pub use tags::{TagHandler, TagRegistry};
pub use value::{ArrayRef, MapRef, SimpleValue, Value};

// CBOR major types
pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

/// Terminator of indefinite-length items.
pub(crate) const BREAK: u8 = 0xff;

// Tags with built-in handlers
pub const TAG_DATETIME_STRING: u64 = 0; // Standard date/time string (RFC 3339)
pub const TAG_POSITIVE_BIGNUM: u64 = 2;
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
pub const TAG_DECIMAL_FRACTION: u64 = 4;
pub const TAG_BIGFLOAT: u64 = 5;
pub const TAG_STRING_REF: u64 = 25; // index into a string reference namespace
pub const TAG_SHAREABLE: u64 = 28; // value that may be referenced by tag 29
pub const TAG_SHARED_REF: u64 = 29; // index of a shareable value
pub const TAG_RATIONAL: u64 = 30;
pub const TAG_URI: u64 = 32; // URI (RFC 3986)
pub const TAG_UUID: u64 = 37;
pub const TAG_STRING_REF_NAMESPACE: u64 = 256;
pub const TAG_DECIMAL_FRACTION_EXTENDED: u64 = 264; // exponent may be a bignum
pub const TAG_BIGFLOAT_EXTENDED: u64 = 265; // exponent may be a bignum

// Convenience functions

/// Encodes `value` into a new buffer.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_writer_with(&mut buf, value, options)?;
    Ok(buf)
}

pub fn to_writer<W: Write>(writer: W, value: &Value) -> Result<()> {
    to_writer_with(writer, value, EncodeOptions::default())
}

pub fn to_writer_with<W: Write>(writer: W, value: &Value, options: EncodeOptions) -> Result<()> {
    let mut encoder = Encoder::with_options(writer, options);
    encoder.encode(value)
}

/// Decodes exactly one item; empty input and trailing bytes are errors.
pub fn from_slice(slice: &[u8]) -> Result<Value> {
    from_slice_with(slice, DecodeOptions::default())
}

pub fn from_slice_with(slice: &[u8], options: DecodeOptions) -> Result<Value> {
    if slice.is_empty() {
        return Err(CborError::format("empty input"));
    }
    let mut decoder = Decoder::with_options(slice, options);
    let value = decoder.read_value()?;
    let rest = decoder.into_inner();
    if !rest.is_empty() {
        return Err(CborError::format(format!(
            "{} trailing bytes after the value",
            rest.len()
        )));
    }
    Ok(value)
}

/// Reads one item from `reader`, leaving anything after it unread.
pub fn from_reader<R: Read>(reader: R) -> Result<Value> {
    Decoder::new(reader).read_value()
}

pub fn from_reader_with<R: Read>(reader: R, options: DecodeOptions) -> Result<Value> {
    Decoder::with_options(reader, options).read_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use number::{BigFloat, DecimalFraction, Rational};

    fn round_trip(value: &Value) -> Value {
        from_slice(&to_vec(value).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip_scalars() {
        let values = [
            Value::from(0),
            Value::from(-1),
            Value::from(i64::MAX),
            Value::from(i64::MIN),
            Value::from(u64::MAX),
            Value::from(BigInt::from(u64::MAX) * 1000),
            Value::from(-BigInt::from(u64::MAX) * 1000),
            Value::from("hello"),
            Value::from(""),
            Value::from(vec![0u8, 1, 2]),
            Value::Bool(true),
            Value::Null,
            Value::Undefined,
            Value::simple(99).unwrap(),
            Value::Single(3.5),
            Value::Double(-0.0),
            Value::Double(f64::NAN),
        ];
        for value in values {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn test_round_trip_numbers() {
        let values = [
            Value::from(DecimalFraction::new(27315, -2)),
            Value::from(DecimalFraction::new(BigInt::from(u64::MAX) * 7, 300)),
            Value::from(BigFloat::new(-3, -1)),
            Value::from(BigFloat::new(1, BigInt::from(1u8) << 80usize)),
            Value::from(Rational::new(2, 4).unwrap()),
            Value::from(Rational::new(-1, BigInt::from(u64::MAX) * 3).unwrap()),
        ];
        for value in values {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn test_round_trip_containers() {
        let map = Value::new_map();
        map.add("list", Value::array(vec![1.into(), 2.5f64.into()])).unwrap();
        map.add(Value::array(vec![]), Value::tagged(1000, "x")).unwrap();
        map.add(-7, Value::from(uuid::Uuid::from_bytes([9; 16]))).unwrap();
        assert_eq!(round_trip(&map), map);
    }

    #[test]
    fn test_trailing_bytes() {
        let err = from_slice(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, CborError::Format(ref m) if m.contains("trailing")));
        assert!(matches!(from_slice(&[]), Err(CborError::Format(_))));
    }

    #[test]
    fn test_from_reader_leaves_rest() {
        let bytes = [0x01u8, 0x02];
        let mut reader = &bytes[..];
        assert_eq!(from_reader(&mut reader).unwrap(), Value::Integer(1));
        assert_eq!(reader, &[0x02]);
    }

    #[test]
    fn test_to_writer() {
        let mut buf = Vec::new();
        to_writer(&mut buf, &Value::from("a")).unwrap();
        assert_eq!(buf, [0x61, 0x61]);
    }
}
