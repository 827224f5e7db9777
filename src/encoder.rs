use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::io::Write;

use crate::error::{CborError, Result};
use crate::map::CborMap;
use crate::number::Class;
use crate::value::Value;
use crate::{
    BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED, TAG_BIGFLOAT, TAG_BIGFLOAT_EXTENDED, TAG_DECIMAL_FRACTION,
    TAG_DECIMAL_FRACTION_EXTENDED, TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM, TAG_RATIONAL,
};

/// Largest text chunk written for long strings.
pub const TEXT_CHUNK_SIZE: usize = 4096;

/// Encoder settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write map entries ordered by the bytes of their encoded keys
    /// (RFC 8949 deterministic encoding) instead of insertion order.
    pub sort_map_keys: bool,
    /// Write every string with a definite length. By default text strings
    /// longer than [`TEXT_CHUNK_SIZE`] bytes are written as indefinite-length
    /// strings of chunks no longer than that.
    pub definite_lengths: bool,
}

/// Writes values as CBOR.
///
/// Integers and lengths always use the shortest head, floats keep their
/// precision, and numbers that CBOR only knows through tags (bignums,
/// fractions, rationals) are written with those tags.
pub struct Encoder<W: Write> {
    writer: W,
    options: EncodeOptions,
    /// Containers currently being written, for cycle detection.
    stack: Vec<*const ()>,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    pub fn with_options(writer: W, options: EncodeOptions) -> Self {
        Encoder {
            writer,
            options,
            stack: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_type_value(&mut self, major: u8, value: u64) -> Result<()> {
        if value < 24 {
            self.writer.write_all(&[(major << 5) | value as u8])?;
        } else if value < 256 {
            self.writer.write_all(&[(major << 5) | 24, value as u8])?;
        } else if value < 65536 {
            self.writer.write_all(&[(major << 5) | 25])?;
            self.writer.write_all(&(value as u16).to_be_bytes())?;
        } else if value < 4294967296 {
            self.writer.write_all(&[(major << 5) | 26])?;
            self.writer.write_all(&(value as u32).to_be_bytes())?;
        } else {
            self.writer.write_all(&[(major << 5) | 27])?;
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    fn write_len(&mut self, major: u8, len: usize) -> Result<()> {
        self.write_type_value(major, len as u64)
    }

    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.write_type_value(MAJOR_TAG, tag)
    }

    /// Writes one complete value.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Integer(i) => self.write_i64(*i),
            Value::BigInt(b) => self.write_bigint(b),
            Value::Bytes(b) => {
                self.write_len(MAJOR_BYTES, b.len())?;
                self.writer.write_all(b)?;
                Ok(())
            }
            Value::Text(s) => self.write_text(s),
            Value::Array(_) | Value::Map(_) => self.write_container(value),
            Value::Bool(false) => self.write_simple(20),
            Value::Bool(true) => self.write_simple(21),
            Value::Null => self.write_simple(22),
            Value::Undefined => self.write_simple(23),
            Value::Simple(s) => self.write_simple(s.get()),
            Value::Single(f) => {
                self.writer.write_all(&[0xfa])?;
                self.writer.write_all(&f.to_bits().to_be_bytes())?;
                Ok(())
            }
            Value::Double(f) => self.write_f64(*f),
            Value::Decimal(d) => match d.class() {
                Class::Finite => self.write_fraction(
                    TAG_DECIMAL_FRACTION,
                    TAG_DECIMAL_FRACTION_EXTENDED,
                    d.exponent(),
                    d.mantissa(),
                ),
                _ => self.write_non_finite(d.class()),
            },
            Value::BigFloat(b) => match b.class() {
                Class::Finite => self.write_fraction(
                    TAG_BIGFLOAT,
                    TAG_BIGFLOAT_EXTENDED,
                    b.exponent(),
                    b.mantissa(),
                ),
                _ => self.write_non_finite(b.class()),
            },
            Value::Rational(r) => match r.class() {
                Class::Finite if r.denominator().is_one() => self.write_bigint(r.numerator()),
                Class::Finite => {
                    self.write_tag(TAG_RATIONAL)?;
                    self.write_len(MAJOR_ARRAY, 2)?;
                    self.write_bigint(r.numerator())?;
                    self.write_bigint(r.denominator())
                }
                _ => self.write_non_finite(r.class()),
            },
            Value::Tag(tag, inner) => {
                self.write_tag(*tag)?;
                self.encode(inner)
            }
        }
    }

    fn write_i64(&mut self, i: i64) -> Result<()> {
        if i >= 0 {
            self.write_type_value(MAJOR_UNSIGNED, i as u64)
        } else {
            self.write_type_value(MAJOR_NEGATIVE, (-1 - i) as u64)
        }
    }

    /// Plain integer when the magnitude fits the head, otherwise a tag 2 or 3 bignum.
    fn write_bigint(&mut self, value: &BigInt) -> Result<()> {
        let (major, tag, magnitude) = if value.is_negative() {
            (MAJOR_NEGATIVE, TAG_NEGATIVE_BIGNUM, -(value + 1u8))
        } else {
            (MAJOR_UNSIGNED, TAG_POSITIVE_BIGNUM, value.clone())
        };
        if let Some(n) = magnitude.to_u64() {
            return self.write_type_value(major, n);
        }
        let (_, bytes) = magnitude.to_bytes_be();
        self.write_tag(tag)?;
        self.write_len(MAJOR_BYTES, bytes.len())?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    fn write_f64(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(&[0xfb])?;
        self.writer.write_all(&f.to_bits().to_be_bytes())?;
        Ok(())
    }

    fn write_non_finite(&mut self, class: Class) -> Result<()> {
        self.write_f64(match class {
            Class::NegativeZero => -0.0,
            Class::PositiveInfinity => f64::INFINITY,
            Class::NegativeInfinity => f64::NEG_INFINITY,
            Class::NaN | Class::Finite => f64::NAN,
        })
    }

    fn write_fraction(
        &mut self,
        tag: u64,
        extended_tag: u64,
        exponent: &BigInt,
        mantissa: &BigInt,
    ) -> Result<()> {
        if exponent.is_zero() {
            return self.write_bigint(mantissa);
        }
        // tags 4 and 5 only allow exponents with a plain integer encoding
        let plain = if exponent.is_negative() {
            (-(exponent + 1u8)).to_u64().is_some()
        } else {
            exponent.to_u64().is_some()
        };
        self.write_tag(if plain { tag } else { extended_tag })?;
        self.write_len(MAJOR_ARRAY, 2)?;
        self.write_bigint(exponent)?;
        self.write_bigint(mantissa)
    }

    fn write_simple(&mut self, n: u8) -> Result<()> {
        if n < 24 {
            self.writer.write_all(&[(MAJOR_SIMPLE << 5) | n])?;
        } else {
            self.writer.write_all(&[(MAJOR_SIMPLE << 5) | 24, n])?;
        }
        Ok(())
    }

    fn write_text(&mut self, s: &str) -> Result<()> {
        if self.options.definite_lengths || s.len() <= TEXT_CHUNK_SIZE {
            self.write_len(MAJOR_TEXT, s.len())?;
            self.writer.write_all(s.as_bytes())?;
            return Ok(());
        }
        self.writer.write_all(&[(MAJOR_TEXT << 5) | 31])?;
        let mut rest = s;
        while !rest.is_empty() {
            let mut end = rest.len().min(TEXT_CHUNK_SIZE);
            while !rest.is_char_boundary(end) {
                end -= 1;
            }
            let (chunk, tail) = rest.split_at(end);
            self.write_len(MAJOR_TEXT, chunk.len())?;
            self.writer.write_all(chunk.as_bytes())?;
            rest = tail;
        }
        self.writer.write_all(&[BREAK])?;
        Ok(())
    }

    fn write_container(&mut self, value: &Value) -> Result<()> {
        let Some(ptr) = value.container_ptr() else {
            return Ok(());
        };
        if self.stack.contains(&ptr) {
            tracing::debug!("circular reference at nesting level {}", self.stack.len());
            return Err(CborError::CircularReference);
        }
        self.stack.push(ptr);
        let result = match value {
            Value::Array(items) => self.write_array(&items.borrow()),
            Value::Map(map) => self.write_map(&map.borrow()),
            _ => Ok(()),
        };
        self.stack.pop();
        result
    }

    fn write_array(&mut self, items: &[Value]) -> Result<()> {
        self.write_len(MAJOR_ARRAY, items.len())?;
        for item in items {
            self.encode(item)?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &CborMap) -> Result<()> {
        self.write_len(MAJOR_MAP, map.len())?;
        if !self.options.sort_map_keys {
            for (key, value) in map {
                self.encode(key)?;
                self.encode(value)?;
            }
            return Ok(());
        }
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            entries.push((self.encode_detached(key)?, value));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in entries {
            self.writer.write_all(&key)?;
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encodes `value` into a fresh buffer, keeping the cycle stack.
    fn encode_detached(&mut self, value: &Value) -> Result<Vec<u8>> {
        let mut nested = Encoder {
            writer: Vec::new(),
            options: self.options,
            stack: std::mem::take(&mut self.stack),
        };
        let result = nested.encode(value);
        self.stack = nested.stack;
        result.map(|()| nested.writer)
    }
}
