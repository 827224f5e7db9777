//! Tag validation.
//!
//! A [`TagRegistry`] maps tag numbers to [`TagHandler`]s. When the decoder
//! finishes a tagged item it hands the content to the registry, which checks
//! it against the handler's [`TypeFilter`] and then lets the handler either
//! keep the tag or fold the item into a native kind. Tags without a handler
//! pass through unchanged.
//!
//! Built-in handlers:
//!
//! | Tag | Content | Result |
//! |---|---|---|
//! | 0 | text string | kept |
//! | 2, 3 | byte string | integer |
//! | 4, 264 | `[exponent, mantissa]` | decimal fraction |
//! | 5, 265 | `[exponent, mantissa]` | bigfloat |
//! | 25, 29 | unsigned integer | kept |
//! | 28, 256 | anything | kept |
//! | 30 | `[numerator, denominator]` | rational |
//! | 32 | URI text string | kept |
//! | 37 | 16-byte string | kept |

use num_bigint::{BigInt, Sign};
use num_traits::Signed;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use url::Url;

use crate::error::{CborError, Result};
use crate::filter::{ANY_FILTER, TypeFilter};
use crate::number::{BigFloat, DecimalFraction, Rational};
use crate::value::Value;
use crate::{
    TAG_BIGFLOAT, TAG_BIGFLOAT_EXTENDED, TAG_DATETIME_STRING, TAG_DECIMAL_FRACTION,
    TAG_DECIMAL_FRACTION_EXTENDED, TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM, TAG_RATIONAL,
    TAG_SHAREABLE, TAG_SHARED_REF, TAG_STRING_REF, TAG_STRING_REF_NAMESPACE, TAG_URI, TAG_UUID,
};

/// Validates and normalizes the content of one tag.
pub trait TagHandler: Send + Sync {
    /// Shape the content must have; checked before [`TagHandler::validate`] runs.
    fn filter(&self) -> &TypeFilter {
        &ANY_FILTER
    }

    /// Returns the value that replaces `tag(content)`: usually the tagged
    /// value itself, or a native value the tag was folded into.
    fn validate(&self, tag: u64, content: Value) -> Result<Value>;
}

impl<F> TagHandler for F
where
    F: Fn(u64, Value) -> Result<Value> + Send + Sync,
{
    fn validate(&self, tag: u64, content: Value) -> Result<Value> {
        self(tag, content)
    }
}

struct Builtin {
    filter: TypeFilter,
    validate: fn(u64, Value) -> Result<Value>,
}

impl TagHandler for Builtin {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, content: Value) -> Result<Value> {
        (self.validate)(tag, content)
    }
}

/// Tag number to handler mapping.
///
/// Registration replaces any earlier handler for the same tag. All methods
/// take `&self`, so a registry can be shared between threads.
pub struct TagRegistry {
    handlers: RwLock<HashMap<u64, Arc<dyn TagHandler>>>,
}

impl TagRegistry {
    /// A registry holding the built-in handlers.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.install_builtins();
        registry
    }

    /// A registry with no handlers; every tag passes through.
    pub fn empty() -> Self {
        TagRegistry {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, populated with the built-ins on first use.
    pub fn global() -> &'static TagRegistry {
        static GLOBAL: OnceLock<TagRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TagRegistry::new)
    }

    /// Installs `handler` for `tag`, returning the handler it replaced.
    pub fn register(
        &self,
        tag: u64,
        handler: impl TagHandler + 'static,
    ) -> Option<Arc<dyn TagHandler>> {
        let previous = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tag, Arc::new(handler));
        if previous.is_some() {
            tracing::debug!("replaced handler for tag {}", tag);
        } else {
            tracing::debug!("registered handler for tag {}", tag);
        }
        previous
    }

    pub fn unregister(&self, tag: u64) -> Option<Arc<dyn TagHandler>> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tag)
    }

    pub fn handler(&self, tag: u64) -> Option<Arc<dyn TagHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tag)
            .cloned()
    }

    pub fn is_registered(&self, tag: u64) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&tag)
    }

    /// Runs the handler for `tag` on `content`.
    ///
    /// Fails with a format error when the content does not match the
    /// handler's filter or the handler rejects it. Without a handler the
    /// result is simply `tag(content)`.
    pub fn validate(&self, tag: u64, content: Value) -> Result<Value> {
        // the lock is released before the handler runs
        let Some(handler) = self.handler(tag) else {
            return Ok(Value::tagged(tag, content));
        };
        handler
            .filter()
            .check(&content)
            .and_then(|()| handler.validate(tag, content))
            .map_err(|e| {
                tracing::debug!("tag {} rejected: {}", tag, e);
                match e {
                    CborError::Format(msg) => CborError::format(format!("tag {tag}: {msg}")),
                    other => other,
                }
            })
    }

    fn install_builtins(&self) {
        let bignum_integer = TypeFilter::INTEGER.with_tags(&[TAG_POSITIVE_BIGNUM, TAG_NEGATIVE_BIGNUM]);
        let builtin = |tag: u64, filter: TypeFilter, validate: fn(u64, Value) -> Result<Value>| {
            self.handlers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(tag, Arc::new(Builtin { filter, validate }));
        };

        builtin(TAG_DATETIME_STRING, TypeFilter::TEXT_STRING, keep);
        for tag in [TAG_POSITIVE_BIGNUM, TAG_NEGATIVE_BIGNUM] {
            // nested tags on the byte string are dropped
            builtin(tag, TypeFilter::BYTE_STRING.with_any_tag(), bignum);
        }
        for tag in [TAG_DECIMAL_FRACTION, TAG_BIGFLOAT] {
            let filter = TypeFilter::NONE
                .with_array_exact_length(vec![TypeFilter::INTEGER, bignum_integer.clone()]);
            builtin(tag, filter, fraction);
        }
        for tag in [TAG_DECIMAL_FRACTION_EXTENDED, TAG_BIGFLOAT_EXTENDED] {
            let filter = TypeFilter::NONE
                .with_array_exact_length(vec![bignum_integer.clone(), bignum_integer.clone()]);
            builtin(tag, filter, fraction);
        }
        for tag in [TAG_STRING_REF, TAG_SHARED_REF] {
            builtin(tag, TypeFilter::UNSIGNED_INTEGER, keep);
        }
        for tag in [TAG_SHAREABLE, TAG_STRING_REF_NAMESPACE] {
            builtin(tag, TypeFilter::ANY, keep);
        }
        builtin(
            TAG_RATIONAL,
            TypeFilter::NONE.with_array_exact_length(vec![bignum_integer.clone(), bignum_integer]),
            rational,
        );
        builtin(TAG_URI, TypeFilter::TEXT_STRING, uri);
        builtin(TAG_UUID, TypeFilter::BYTE_STRING, uuid);
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut tags: Vec<_> = handlers.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("TagRegistry").field("tags", &tags).finish()
    }
}

fn keep(tag: u64, content: Value) -> Result<Value> {
    Ok(Value::tagged(tag, content))
}

fn bignum(tag: u64, content: Value) -> Result<Value> {
    bignum_value(tag, content.untagged()).map(Value::from)
}

fn bignum_value(tag: u64, content: &Value) -> Result<BigInt> {
    let Value::Bytes(bytes) = content else {
        return Err(CborError::format("bignum content must be a byte string"));
    };
    let magnitude = BigInt::from_bytes_be(Sign::Plus, bytes);
    Ok(if tag == TAG_NEGATIVE_BIGNUM {
        -(magnitude + 1u8)
    } else {
        magnitude
    })
}

fn integer_of(value: &Value, what: &str) -> Result<BigInt> {
    match value {
        Value::Integer(i) => Ok(BigInt::from(*i)),
        Value::BigInt(b) => Ok(b.clone()),
        Value::Tag(tag @ (TAG_POSITIVE_BIGNUM | TAG_NEGATIVE_BIGNUM), inner) => {
            bignum_value(*tag, inner.untagged())
        }
        _ => Err(CborError::format(format!("{what} must be an integer"))),
    }
}

fn pair(content: &Value, first: &str, second: &str) -> Result<(BigInt, BigInt)> {
    let items = content
        .as_array()
        .ok_or_else(|| CborError::format("expected a two-element array"))?
        .borrow();
    match items.as_slice() {
        [a, b] => Ok((integer_of(a, first)?, integer_of(b, second)?)),
        _ => Err(CborError::format("expected a two-element array")),
    }
}

fn fraction(tag: u64, content: Value) -> Result<Value> {
    let (exponent, mantissa) = pair(&content, "exponent", "mantissa")?;
    Ok(match tag {
        TAG_DECIMAL_FRACTION | TAG_DECIMAL_FRACTION_EXTENDED => {
            Value::from(DecimalFraction::new(mantissa, exponent))
        }
        _ => Value::from(BigFloat::new(mantissa, exponent)),
    })
}

fn rational(_tag: u64, content: Value) -> Result<Value> {
    let (numerator, denominator) = pair(&content, "numerator", "denominator")?;
    if !denominator.is_positive() {
        return Err(CborError::format(format!(
            "rational denominator must be positive, got {denominator}"
        )));
    }
    Ok(Value::from(Rational::new(numerator, denominator)?))
}

fn uri(tag: u64, content: Value) -> Result<Value> {
    let Value::Text(text) = &content else {
        return Err(CborError::format("URI must be a text string"));
    };
    check_uri(text)?;
    Ok(Value::tagged(tag, content))
}

fn check_uri(text: &str) -> Result<()> {
    if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CborError::format(format!("invalid URI {text:?}")));
    }
    let invalid = |e: url::ParseError| CborError::format(format!("invalid URI {text:?}: {e}"));
    match Url::parse(text) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            // relative references are resolved against a placeholder base
            let base = Url::parse("http://base.invalid/").map_err(invalid)?;
            base.join(text).map(|_| ()).map_err(invalid)
        }
        Err(e) => Err(invalid(e)),
    }
}

fn uuid(tag: u64, content: Value) -> Result<Value> {
    match content.as_bytes() {
        Some(bytes) if bytes.len() == 16 => Ok(Value::tagged(tag, content)),
        Some(bytes) => Err(CborError::format(format!(
            "UUID must be 16 bytes, got {}",
            bytes.len()
        ))),
        None => Err(CborError::format("UUID must be a byte string")),
    }
}
