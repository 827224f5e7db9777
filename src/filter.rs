//! Structural schemas for tagged content.
//!
//! A [`TypeFilter`] describes which shapes of value a tag accepts. Filters are
//! immutable; every `with_*` method returns a new filter.
//!
//! ```
//! use cbor_codec::{TypeFilter, Value};
//!
//! // a two-element array of integers, as used by decimal fractions
//! let pair = TypeFilter::NONE.with_array_exact_length(vec![
//!     TypeFilter::INTEGER,
//!     TypeFilter::INTEGER,
//! ]);
//! assert!(pair.check(&Value::array(vec![(-2).into(), 27315.into()])).is_ok());
//! assert!(pair.check(&Value::array(vec![1.into()])).is_err());
//! ```

use num_traits::{Signed, ToPrimitive};

use crate::error::{CborError, Result};
use crate::value::Value;
use crate::{
    MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT,
    MAJOR_UNSIGNED, TAG_BIGFLOAT, TAG_BIGFLOAT_EXTENDED, TAG_DECIMAL_FRACTION,
    TAG_DECIMAL_FRACTION_EXTENDED, TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM, TAG_RATIONAL,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum ArrayShape {
    AnyLength,
    /// Exact length; positions past the end of `elements` accept anything.
    Exact { len: usize, elements: Vec<TypeFilter> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeFilter {
    /// One bit per major type.
    types: u8,
    /// Floats are accepted even without the major type 7 bit.
    floating_point: bool,
    any_tag: bool,
    tags: Vec<u64>,
    array: ArrayShape,
}

pub(crate) static ANY_FILTER: TypeFilter = TypeFilter::ANY;

impl TypeFilter {
    /// Accepts nothing.
    pub const NONE: TypeFilter = TypeFilter {
        types: 0,
        floating_point: false,
        any_tag: false,
        tags: Vec::new(),
        array: ArrayShape::AnyLength,
    };

    /// Accepts every value.
    pub const ANY: TypeFilter = TypeFilter {
        types: 0xff,
        floating_point: true,
        any_tag: true,
        tags: Vec::new(),
        array: ArrayShape::AnyLength,
    };

    pub const UNSIGNED_INTEGER: TypeFilter = TypeFilter::NONE.with_major_type(MAJOR_UNSIGNED);

    pub const NEGATIVE_INTEGER: TypeFilter = TypeFilter::NONE.with_major_type(MAJOR_NEGATIVE);

    pub const INTEGER: TypeFilter = TypeFilter::UNSIGNED_INTEGER.with_major_type(MAJOR_NEGATIVE);

    pub const BYTE_STRING: TypeFilter = TypeFilter::NONE.with_major_type(MAJOR_BYTES);

    pub const TEXT_STRING: TypeFilter = TypeFilter::NONE.with_major_type(MAJOR_TEXT);

    pub const fn with_major_type(mut self, major: u8) -> Self {
        self.types |= 1 << (major & 7);
        self
    }

    pub const fn with_unsigned_integer(self) -> Self {
        self.with_major_type(MAJOR_UNSIGNED)
    }

    pub const fn with_negative_integer(self) -> Self {
        self.with_major_type(MAJOR_NEGATIVE)
    }

    pub const fn with_byte_string(self) -> Self {
        self.with_major_type(MAJOR_BYTES)
    }

    pub const fn with_text_string(self) -> Self {
        self.with_major_type(MAJOR_TEXT)
    }

    pub const fn with_map(self) -> Self {
        self.with_major_type(MAJOR_MAP)
    }

    /// Accepts single and double precision floats.
    pub const fn with_floating_point(mut self) -> Self {
        self.floating_point = true;
        self
    }

    /// Accepts every major type 7 value, floats included.
    pub const fn with_simple_values(self) -> Self {
        self.with_major_type(MAJOR_SIMPLE)
    }

    pub fn with_array_any_length(mut self) -> Self {
        self.types |= 1 << MAJOR_ARRAY;
        self.array = ArrayShape::AnyLength;
        self
    }

    /// Accepts arrays with exactly `elements.len()` items, each matching the
    /// filter at its position.
    pub fn with_array_exact_length(self, elements: Vec<TypeFilter>) -> Self {
        let len = elements.len();
        self.with_array_length(len, elements)
    }

    /// Accepts arrays of exactly `len` items; `elements` constrains the first
    /// positions and the rest accept anything.
    pub fn with_array_length(mut self, len: usize, mut elements: Vec<TypeFilter>) -> Self {
        elements.truncate(len);
        self.types |= 1 << MAJOR_ARRAY;
        self.array = ArrayShape::Exact { len, elements };
        self
    }

    pub fn with_tags(mut self, tags: &[u64]) -> Self {
        self.types |= 1 << MAJOR_TAG;
        for tag in tags {
            if !self.tags.contains(tag) {
                self.tags.push(*tag);
            }
        }
        self
    }

    pub fn with_any_tag(mut self) -> Self {
        self.types |= 1 << MAJOR_TAG;
        self.any_tag = true;
        self
    }

    pub fn major_type_matches(&self, major: u8) -> bool {
        major < 8 && self.types & (1 << major) != 0
    }

    /// Whether an array of `len` items is accepted, ignoring its contents.
    pub fn array_length_matches(&self, len: usize) -> bool {
        if !self.major_type_matches(MAJOR_ARRAY) {
            return false;
        }
        match &self.array {
            ArrayShape::AnyLength => true,
            ArrayShape::Exact { len: expected, .. } => *expected == len,
        }
    }

    pub fn tag_allowed(&self, tag: u64) -> bool {
        self.major_type_matches(MAJOR_TAG) && (self.any_tag || self.tags.contains(&tag))
    }

    /// The filter for the array item at `index`.
    pub fn sub_filter(&self, index: usize) -> &TypeFilter {
        match &self.array {
            ArrayShape::Exact { elements, .. } => elements.get(index).unwrap_or(&ANY_FILTER),
            ArrayShape::AnyLength => &ANY_FILTER,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    /// Checks `value` against this filter, describing the first mismatch.
    pub fn check(&self, value: &Value) -> Result<()> {
        match value {
            Value::Integer(i) => {
                let major = if *i < 0 { MAJOR_NEGATIVE } else { MAJOR_UNSIGNED };
                self.require_major(major, value)
            }
            Value::BigInt(b) => {
                let (major, tag) = if b.is_negative() {
                    (MAJOR_NEGATIVE, TAG_NEGATIVE_BIGNUM)
                } else {
                    (MAJOR_UNSIGNED, TAG_POSITIVE_BIGNUM)
                };
                // magnitudes up to 2^64 still have a plain integer encoding
                let fits = if b.is_negative() {
                    (-b - 1u8).to_u64().is_some()
                } else {
                    b.to_u64().is_some()
                };
                if (fits && self.major_type_matches(major)) || self.tag_allowed(tag) {
                    Ok(())
                } else {
                    Err(mismatch(value))
                }
            }
            Value::Bytes(_) => self.require_major(MAJOR_BYTES, value),
            Value::Text(_) => self.require_major(MAJOR_TEXT, value),
            Value::Map(_) => self.require_major(MAJOR_MAP, value),
            Value::Array(items) => {
                let items = items.borrow();
                if !self.array_length_matches(items.len()) {
                    return Err(if self.major_type_matches(MAJOR_ARRAY) {
                        CborError::format(format!(
                            "array of length {} has the wrong number of items",
                            items.len()
                        ))
                    } else {
                        mismatch(value)
                    });
                }
                for (index, item) in items.iter().enumerate() {
                    self.sub_filter(index).check(item)?;
                }
                Ok(())
            }
            Value::Single(_) | Value::Double(_) => {
                if self.floating_point || self.major_type_matches(MAJOR_SIMPLE) {
                    Ok(())
                } else {
                    Err(mismatch(value))
                }
            }
            Value::Bool(_) | Value::Null | Value::Undefined | Value::Simple(_) => {
                self.require_major(MAJOR_SIMPLE, value)
            }
            Value::Decimal(_) => {
                self.require_any_tag(&[TAG_DECIMAL_FRACTION, TAG_DECIMAL_FRACTION_EXTENDED], value)
            }
            Value::BigFloat(_) => self.require_any_tag(&[TAG_BIGFLOAT, TAG_BIGFLOAT_EXTENDED], value),
            Value::Rational(_) => self.require_any_tag(&[TAG_RATIONAL], value),
            // an allowed tag vouches for its content, which its own handler checks
            Value::Tag(tag, _) => {
                if self.tag_allowed(*tag) {
                    Ok(())
                } else {
                    Err(CborError::format(format!("tag {tag} is not allowed here")))
                }
            }
        }
    }

    fn require_major(&self, major: u8, value: &Value) -> Result<()> {
        if self.major_type_matches(major) {
            Ok(())
        } else {
            Err(mismatch(value))
        }
    }

    fn require_any_tag(&self, tags: &[u64], value: &Value) -> Result<()> {
        if tags.iter().any(|t| self.tag_allowed(*t)) {
            Ok(())
        } else {
            Err(mismatch(value))
        }
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        TypeFilter::NONE
    }
}

fn mismatch(value: &Value) -> CborError {
    CborError::format(format!("unexpected {}", value.kind_name()))
}
