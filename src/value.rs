use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use uuid::Uuid;

use crate::error::{CborError, Result};
use crate::map::CborMap;
use crate::number::{BigFloat, Class, DecimalFraction, Number, Rational};
use crate::tags::TagRegistry;
use crate::{TAG_URI, TAG_UUID};

/// Shared, mutable handle to the items of a CBOR array.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable handle to the entries of a CBOR map.
pub type MapRef = Rc<RefCell<CborMap>>;

/// A major type 7 value that is neither a float nor one of the dedicated
/// `false`, `true`, `null` and `undefined` values.
///
/// 20 through 23 are those dedicated values and 24 through 31 are reserved by
/// the wire format, so none of them can be held here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleValue(u8);

impl SimpleValue {
    pub fn new(value: u8) -> Result<Self> {
        if (20..=31).contains(&value) {
            return Err(CborError::argument(format!(
                "simple value {value} is reserved"
            )));
        }
        Ok(SimpleValue(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Dynamic CBOR value
///
/// Arrays and maps are reference-counted handles: cloning a `Value` that holds
/// one shares the container, and mutation through one clone is visible
/// through the others. Equality and hashing are structural.
///
/// # Example
/// ```
/// use cbor_codec::{Value, from_slice, to_vec};
///
/// let value = Value::new_map();
/// value.add("name", "Alice").unwrap();
/// value.add("age", 30).unwrap();
///
/// let bytes = to_vec(&value).unwrap();
/// let decoded = from_slice(&bytes).unwrap();
/// assert_eq!(value, decoded);
/// ```
#[derive(Clone)]
pub enum Value {
    /// Integer in the `i64` range
    Integer(i64),
    /// Integer outside the `i64` range. `Value::from` picks `Integer` for
    /// anything smaller; an in-range `BigInt` built directly still equals,
    /// hashes and encodes like that `Integer`.
    BigInt(BigInt),
    Bytes(Vec<u8>),
    Text(String),
    Array(ArrayRef),
    Map(MapRef),
    Bool(bool),
    Null,
    Undefined,
    Simple(SimpleValue),
    Single(f32),
    Double(f64),
    Decimal(DecimalFraction),
    BigFloat(BigFloat),
    Rational(Rational),
    /// Tagged value (tag number, boxed content)
    Tag(u64, Box<Value>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_array() -> Value {
        Value::array(Vec::new())
    }

    pub fn map(map: CborMap) -> Value {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn new_map() -> Value {
        Value::map(CborMap::new())
    }

    /// The major type 7 value with the given number.
    ///
    /// 20 through 23 give the dedicated boolean, null and undefined values;
    /// 24 through 31 are rejected.
    pub fn simple(value: u8) -> Result<Value> {
        match value {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            23 => Ok(Value::Undefined),
            _ => SimpleValue::new(value).map(Value::Simple),
        }
    }

    /// Wraps `value` in `tag` without any validation.
    pub fn tagged(tag: u64, value: impl Into<Value>) -> Value {
        Value::Tag(tag, Box::new(value.into()))
    }

    /// Wraps `value` in `tag` and runs the tag's registered validator, which
    /// may turn the result into a native kind (tags 2 and 3 become integers).
    pub fn with_tag(tag: u64, value: impl Into<Value>) -> Result<Value> {
        TagRegistry::global().validate(tag, value.into())
    }

    /// Text from UTF-16 code units. Unpaired surrogates become U+FFFD.
    pub fn from_utf16(units: &[u16]) -> Value {
        Value::Text(String::from_utf16_lossy(units))
    }

    /// A tag 32 value holding a validated URI reference.
    pub fn uri(uri: &str) -> Result<Value> {
        Value::with_tag(TAG_URI, uri)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns true for `Integer` and `BigInt`
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::BigInt(_))
    }

    /// Returns true for any of the seven numeric kinds
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Integer(_)
                | Value::BigInt(_)
                | Value::Single(_)
                | Value::Double(_)
                | Value::Decimal(_)
                | Value::BigFloat(_)
                | Value::Rational(_)
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Single(_) | Value::Double(_))
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Value::Tag(_, _))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is an `Integer`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value of a `Single` or `Double`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(f) => Some(f64::from(*f)),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the tag number and inner value, if this is a tagged value
    pub fn as_tag(&self) -> Option<(u64, &Value)> {
        match self {
            Value::Tag(tag, value) => Some((*tag, value)),
            _ => None,
        }
    }

    /// Reads a tag 37 byte string of exactly 16 bytes.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Tag(TAG_UUID, inner) => match inner.as_ref() {
                Value::Bytes(b) => Uuid::from_slice(b).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    /// The tag numbers on this value, outermost first.
    pub fn tags(&self) -> Vec<u64> {
        let mut tags = Vec::new();
        let mut current = self;
        while let Value::Tag(tag, inner) = current {
            tags.push(*tag);
            current = inner;
        }
        tags
    }

    pub fn has_tag(&self, tag: u64) -> bool {
        let mut current = self;
        while let Value::Tag(t, inner) = current {
            if *t == tag {
                return true;
            }
            current = inner;
        }
        false
    }

    pub fn outermost_tag(&self) -> Option<u64> {
        match self {
            Value::Tag(tag, _) => Some(*tag),
            _ => None,
        }
    }

    pub fn innermost_tag(&self) -> Option<u64> {
        self.tags().last().copied()
    }

    /// The payload with every tag removed.
    pub fn untagged(&self) -> &Value {
        let mut current = self;
        while let Value::Tag(_, inner) = current {
            current = inner;
        }
        current
    }

    /// The payload with only the outermost tag removed.
    pub fn untag_one(&self) -> &Value {
        match self {
            Value::Tag(_, inner) => inner,
            _ => self,
        }
    }

    pub fn into_untagged(self) -> Value {
        let mut current = self;
        while let Value::Tag(_, inner) = current {
            current = *inner;
        }
        current
    }

    /// The numeric value, for any of the seven numeric kinds.
    pub fn to_number(&self) -> Result<Number> {
        match self {
            Value::Integer(i) => Ok(Number::Integer(*i)),
            Value::BigInt(b) => Ok(Number::BigInt(b.clone())),
            Value::Single(f) => Ok(Number::Single(*f)),
            Value::Double(f) => Ok(Number::Double(*f)),
            Value::Decimal(d) => Ok(Number::Decimal(d.clone())),
            Value::BigFloat(b) => Ok(Number::BigFloat(b.clone())),
            Value::Rational(r) => Ok(Number::Rational(r.clone())),
            _ => Err(CborError::invalid_operation(format!(
                "{} is not a number",
                self.kind_name()
            ))),
        }
    }

    /// Converts an integral number to `i32`; fails with a range error if the
    /// value has a fractional part or does not fit.
    pub fn to_i32(&self) -> Result<i32> {
        self.to_number()?.to_i32()
    }

    pub fn to_i64(&self) -> Result<i64> {
        self.to_number()?.to_i64()
    }

    /// Nearest `f64` to the numeric value.
    pub fn to_f64(&self) -> Result<f64> {
        Ok(self.to_number()?.to_f64())
    }

    /// Number of items in an array or entries in a map.
    pub fn count(&self) -> Result<usize> {
        match self {
            Value::Array(a) => Ok(a.borrow().len()),
            Value::Map(m) => Ok(m.borrow().len()),
            _ => Err(self.not_a("an array or map")),
        }
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        let items = self.array_ref()?.borrow();
        items
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index, items.len()))
    }

    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let mut items = self.array_ref()?.borrow_mut();
        let len = items.len();
        let slot = items.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
        *slot = value.into();
        Ok(())
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.array_ref()?.borrow_mut().push(value.into());
        Ok(())
    }

    pub fn get_key(&self, key: &Value) -> Result<Option<Value>> {
        Ok(self.map_ref()?.borrow().get(key).cloned())
    }

    /// Sets a map entry, replacing any existing value for the key.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        let map = self.key_target(&key)?;
        Ok(map.borrow_mut().insert(key, value))
    }

    /// Adds a map entry; an existing key is an argument error.
    pub fn add(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let map = self.key_target(&key)?;
        map.borrow_mut().add(key, value)
    }

    pub fn remove_key(&self, key: &Value) -> Result<Option<Value>> {
        let map = self.key_target(key)?;
        Ok(map.borrow_mut().remove(key))
    }

    /// The map to update with `key`. Hashing a key that holds the map itself
    /// would need the map while it is borrowed for writing.
    fn key_target(&self, key: &Value) -> Result<&MapRef> {
        let map = self.map_ref()?;
        if key.reaches(Rc::as_ptr(map) as *const (), &mut Vec::new()) {
            return Err(CborError::argument("a map cannot be used as its own key"));
        }
        Ok(map)
    }

    /// Whether this value is, or contains, the container at `target`.
    fn reaches(&self, target: *const (), seen: &mut Vec<*const ()>) -> bool {
        if let Value::Tag(_, inner) = self {
            return inner.reaches(target, seen);
        }
        let Some(ptr) = self.container_ptr() else {
            return false;
        };
        if ptr == target {
            return true;
        }
        if seen.contains(&ptr) {
            return false;
        }
        seen.push(ptr);
        match self {
            Value::Array(items) => items.borrow().iter().any(|item| item.reaches(target, seen)),
            Value::Map(map) => map
                .borrow()
                .iter()
                .any(|(k, v)| k.reaches(target, seen) || v.reaches(target, seen)),
            _ => false,
        }
    }

    fn array_ref(&self) -> Result<&ArrayRef> {
        self.as_array().ok_or_else(|| self.not_a("an array"))
    }

    fn map_ref(&self) -> Result<&MapRef> {
        self.as_map().ok_or_else(|| self.not_a("a map"))
    }

    fn not_a(&self, expected: &str) -> CborError {
        CborError::invalid_operation(format!("{} is not {expected}", self.kind_name()))
    }

    /// Identity of the shared container behind an array or map.
    pub(crate) fn container_ptr(&self) -> Option<*const ()> {
        match self {
            Value::Array(a) => Some(Rc::as_ptr(a) as *const ()),
            Value::Map(m) => Some(Rc::as_ptr(m) as *const ()),
            _ => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::BigInt(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::Text(_) => "text string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Simple(_) => "simple value",
            Value::Single(_) | Value::Double(_) => "float",
            Value::Decimal(_) => "decimal fraction",
            Value::BigFloat(_) => "bigfloat",
            Value::Rational(_) => "rational",
            Value::Tag(_, _) => "tagged value",
        }
    }
}

fn out_of_range(index: usize, len: usize) -> CborError {
    CborError::argument(format!("index {index} out of range for length {len}"))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Integer(i), Value::BigInt(b)) | (Value::BigInt(b), Value::Integer(i)) => {
                b.to_i64() == Some(*i)
            }
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Simple(a), Value::Simple(b)) => a == b,
            // bitwise, so NaN equals itself and 0.0 differs from -0.0
            (Value::Single(a), Value::Single(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::BigFloat(a), Value::BigFloat(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (Value::Tag(t1, v1), Value::Tag(t2, v2)) => t1 == t2 && v1 == v2,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Value::BigInt(b) = self {
            if let Some(i) = b.to_i64() {
                return Value::Integer(i).hash(state);
            }
        }
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::BigInt(b) => b.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Array(a) => a.borrow().hash(state),
            Value::Map(m) => m.borrow().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null | Value::Undefined => {}
            Value::Simple(s) => s.hash(state),
            Value::Single(f) => f.to_bits().hash(state),
            Value::Double(f) => f.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::BigFloat(b) => b.hash(state),
            Value::Rational(r) => r.hash(state),
            Value::Tag(tag, inner) => {
                tag.hash(state);
                inner.hash(state);
            }
        }
    }
}

macro_rules! from_small_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )*
    };
}

from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::BigInt(BigInt::from(value)),
        }
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::from(BigInt::from(value))
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::from(BigInt::from(value))
    }
}

impl From<BigInt> for Value {
    /// Picks `Integer` whenever the value fits in an `i64`.
    fn from(value: BigInt) -> Self {
        match value.to_i64() {
            Some(i) => Value::Integer(i),
            None => Value::BigInt(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Single(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::array(value)
    }
}

impl From<CborMap> for Value {
    fn from(value: CborMap) -> Self {
        Value::map(value)
    }
}

impl From<SimpleValue> for Value {
    fn from(value: SimpleValue) -> Self {
        Value::Simple(value)
    }
}

impl From<DecimalFraction> for Value {
    /// A finite fraction with a zero exponent becomes a plain integer.
    fn from(value: DecimalFraction) -> Self {
        if value.class() == Class::Finite && value.exponent().is_zero() {
            Value::from(value.mantissa().clone())
        } else {
            Value::Decimal(value)
        }
    }
}

impl From<BigFloat> for Value {
    /// A finite bigfloat with a zero exponent becomes a plain integer.
    fn from(value: BigFloat) -> Self {
        if value.class() == Class::Finite && value.exponent().is_zero() {
            Value::from(value.mantissa().clone())
        } else {
            Value::BigFloat(value)
        }
    }
}

impl From<Rational> for Value {
    /// A finite rational with denominator 1 becomes a plain integer.
    fn from(value: Rational) -> Self {
        if value.class() == Class::Finite && value.denominator().is_one() {
            Value::from(value.numerator().clone())
        } else {
            Value::Rational(value)
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        match value {
            Number::Integer(i) => Value::Integer(i),
            Number::BigInt(b) => Value::from(b),
            Number::Single(f) => Value::Single(f),
            Number::Double(f) => Value::Double(f),
            Number::Decimal(d) => Value::from(d),
            Number::BigFloat(b) => Value::from(b),
            Number::Rational(r) => Value::from(r),
        }
    }
}

impl From<Uuid> for Value {
    /// A tag 37 byte string.
    fn from(value: Uuid) -> Self {
        Value::tagged(TAG_UUID, value.as_bytes().to_vec())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::BigInt(b) => {
                if let Some(i) = b.to_i128() {
                    serializer.serialize_i128(i)
                } else if let Some(u) = b.to_u128() {
                    serializer.serialize_u128(u)
                } else {
                    serializer.collect_str(b)
                }
            }
            Value::Single(f) => serializer.serialize_f32(*f),
            Value::Double(f) => serializer.serialize_f64(*f),
            Value::Decimal(_) | Value::BigFloat(_) | Value::Rational(_) => match self.to_number() {
                Ok(n) => serializer.serialize_f64(n.to_f64()),
                Err(_) => serializer.serialize_unit(),
            },
            Value::Simple(s) => serializer.serialize_u8(s.get()),
            Value::Bytes(b) => serde_bytes::Bytes::new(b).serialize(serializer),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(a) => a.borrow().serialize(serializer),
            Value::Map(m) => serializer.collect_map(m.borrow().iter()),
            // tags have no serde equivalent; only the content is visible
            Value::Tag(_, inner) => inner.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid CBOR value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Integer(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_i128<E>(self, value: i128) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_u128<E>(self, value: u128) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_f32<E>(self, value: f32) -> std::result::Result<Value, E> {
                Ok(Value::Single(value))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Double(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Text(value.to_owned()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::Text(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_seq<V>(self, mut visitor: V) -> std::result::Result<Value, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(visitor.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = visitor.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::array(vec))
            }

            fn visit_map<V>(self, mut visitor: V) -> std::result::Result<Value, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut map = CborMap::new();
                while let Some((key, value)) = visitor.next_entry::<Value, Value>()? {
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_normalization() {
        assert_eq!(Value::from(u64::MAX >> 1), Value::Integer(i64::MAX));
        assert!(matches!(Value::from(u64::MAX), Value::BigInt(_)));
        assert_eq!(Value::from(BigInt::from(-7)), Value::Integer(-7));
        assert_eq!(Value::from(-5i128), Value::Integer(-5));
    }

    #[test]
    fn test_in_range_bigint_variant() {
        let direct = Value::BigInt(BigInt::from(5));
        assert_eq!(direct, Value::Integer(5));
        assert_eq!(Value::Integer(5), direct);
        assert_ne!(direct, Value::Integer(6));
        assert_eq!(crate::to_vec(&direct).unwrap(), vec![0x05]);

        let mut set = std::collections::HashSet::new();
        set.insert(Value::Integer(5));
        assert!(set.contains(&direct));
        assert!(!set.contains(&Value::BigInt(BigInt::from(u64::MAX))));
    }

    #[test]
    fn test_fraction_normalization() {
        assert_eq!(
            Value::from(DecimalFraction::new(42, 0)),
            Value::Integer(42)
        );
        assert!(matches!(
            Value::from(DecimalFraction::new(42, 1)),
            Value::Decimal(_)
        ));
        assert!(matches!(
            Value::from(DecimalFraction::negative_zero(0)),
            Value::Decimal(_)
        ));
        assert_eq!(Value::from(BigFloat::new(-3, 0)), Value::Integer(-3));
        assert_eq!(
            Value::from(Rational::new(9, 1).unwrap()),
            Value::Integer(9)
        );
        assert!(matches!(
            Value::from(Rational::new(9, 2).unwrap()),
            Value::Rational(_)
        ));
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(Value::simple(20).unwrap(), Value::Bool(false));
        assert_eq!(Value::simple(23).unwrap(), Value::Undefined);
        assert!(matches!(Value::simple(16).unwrap(), Value::Simple(s) if s.get() == 16));
        assert!(matches!(Value::simple(24), Err(CborError::Argument(_))));
        assert!(SimpleValue::new(255).is_ok());
        assert!(SimpleValue::new(21).is_err());
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::Double(1.0), Value::Single(1.0));
        assert_ne!(Value::Double(1.0), Value::Integer(1));
    }

    #[test]
    fn test_tag_chain() {
        let v = Value::tagged(1, Value::tagged(2, Value::tagged(3, "x")));
        assert_eq!(v.tags(), vec![1, 2, 3]);
        assert_eq!(v.outermost_tag(), Some(1));
        assert_eq!(v.innermost_tag(), Some(3));
        assert!(v.has_tag(2));
        assert!(!v.has_tag(4));
        assert_eq!(v.untagged(), &Value::from("x"));
        assert_eq!(v.untag_one().tags(), vec![2, 3]);
        assert_eq!(v.clone().into_untagged(), Value::from("x"));
        assert_eq!(Value::from(1).innermost_tag(), None);
    }

    #[test]
    fn test_array_api() {
        let array = Value::array(vec![1.into(), 2.into()]);
        array.push("three").unwrap();
        assert_eq!(array.count().unwrap(), 3);
        assert_eq!(array.get(2).unwrap(), Value::from("three"));
        array.set(0, 10).unwrap();
        assert_eq!(array.get(0).unwrap(), Value::from(10));
        assert!(matches!(array.get(3), Err(CborError::Argument(_))));
        assert!(matches!(array.set(5, 0), Err(CborError::Argument(_))));
        assert!(matches!(
            array.get_key(&Value::from(0)),
            Err(CborError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_shared_container() {
        let array = Value::new_array();
        let alias = array.clone();
        alias.push(1).unwrap();
        assert_eq!(array.count().unwrap(), 1);
    }

    #[test]
    fn test_map_api() {
        let map = Value::new_map();
        map.add("a", 1).unwrap();
        assert!(matches!(map.add("a", 2), Err(CborError::Argument(_))));
        assert_eq!(map.insert("a", 3).unwrap(), Some(Value::from(1)));
        assert_eq!(map.get_key(&"a".into()).unwrap(), Some(Value::from(3)));
        assert_eq!(map.remove_key(&"a".into()).unwrap(), Some(Value::from(3)));
        assert_eq!(map.count().unwrap(), 0);
        assert!(matches!(map.push(1), Err(CborError::InvalidOperation(_))));
        assert!(matches!(
            Value::from(1).count(),
            Err(CborError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_map_as_own_key() {
        let map = Value::new_map();
        assert!(matches!(map.add(map.clone(), 1), Err(CborError::Argument(_))));
        let wrapped = Value::tagged(1000, Value::array(vec![map.clone()]));
        assert!(matches!(map.insert(wrapped.clone(), 1), Err(CborError::Argument(_))));
        assert!(matches!(map.remove_key(&wrapped), Err(CborError::Argument(_))));
        assert_eq!(map.count().unwrap(), 0);

        // another map as a key is fine
        let other = Value::new_map();
        other.add(map.clone(), 2).unwrap();
        assert_eq!(other.get_key(&map).unwrap(), Some(Value::from(2)));

        // so is the map as one of its own values
        map.add("self", map.clone()).unwrap();
        assert_eq!(map.count().unwrap(), 1);
    }

    #[test]
    fn test_numeric_api() {
        assert_eq!(Value::from(7).to_i32().unwrap(), 7);
        assert_eq!(Value::Double(2.5).to_f64().unwrap(), 2.5);
        assert!(matches!(
            Value::Double(2.5).to_i64(),
            Err(CborError::Range(_))
        ));
        assert!(matches!(
            Value::from("7").to_i32(),
            Err(CborError::InvalidOperation(_))
        ));
        assert!(matches!(
            Value::from(i64::MAX).to_i32(),
            Err(CborError::Range(_))
        ));
    }

    #[test]
    fn test_from_utf16() {
        let units: Vec<u16> = "a\u{1F600}".encode_utf16().collect();
        assert_eq!(Value::from_utf16(&units), Value::from("a\u{1F600}"));
        assert_eq!(
            Value::from_utf16(&[0x61, 0xD800]),
            Value::from("a\u{FFFD}")
        );
    }

    #[test]
    fn test_uuid() {
        let uuid = Uuid::from_bytes([7; 16]);
        let value = Value::from(uuid);
        assert_eq!(value.outermost_tag(), Some(TAG_UUID));
        assert_eq!(value.as_uuid(), Some(uuid));
        assert_eq!(Value::tagged(TAG_UUID, vec![1u8, 2]).as_uuid(), None);
    }

    #[test]
    fn test_serde_json_interop() {
        let value: Value = serde_json::from_str(r#"{"a": [1, 2.5, null, "x"]}"#).unwrap();
        let inner = value.get_key(&"a".into()).unwrap().unwrap();
        assert_eq!(inner.get(0).unwrap(), Value::Integer(1));
        assert_eq!(inner.get(1).unwrap(), Value::Double(2.5));
        assert_eq!(inner.get(2).unwrap(), Value::Null);

        let json = serde_json::to_string(&Value::tagged(
            99,
            Value::array(vec![Value::from(u64::MAX), Value::Undefined]),
        ))
        .unwrap();
        assert_eq!(json, "[18446744073709551615,null]");
    }
}
