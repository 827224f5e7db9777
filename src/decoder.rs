use num_bigint::BigInt;
use std::io::{ErrorKind, Read};

use crate::error::{CborError, Result};
use crate::map::CborMap;
use crate::tags::TagRegistry;
use crate::value::Value;
use crate::{
    BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED,
};

/// Upper bound on capacity reserved from a declared length before any item is read.
const MAX_PREALLOCATE: usize = 1024;

/// Decoder settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest nesting of arrays, maps and tags accepted. Deeper input fails
    /// with a format error instead of exhausting the stack.
    pub max_depth: usize,
    /// Run tag handlers on tagged items. When off, every tag is kept as is.
    pub validate_tags: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_depth: 256,
            validate_tags: true,
        }
    }
}

/// Reads CBOR items from a byte stream.
///
/// `read_value` may be called repeatedly to consume a sequence of items
/// (RFC 8742); [`Decoder::read_next`] does the same but reports a clean end
/// of input as `None`.
pub struct Decoder<'r, R: Read> {
    reader: R,
    options: DecodeOptions,
    registry: &'r TagRegistry,
    depth: usize,
}

impl<R: Read> Decoder<'static, R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Decoder::with_registry(reader, options, TagRegistry::global())
    }
}

impl<'r, R: Read> Decoder<'r, R> {
    /// A decoder that validates tags with `registry` instead of the global one.
    pub fn with_registry(reader: R, options: DecodeOptions, registry: &'r TagRegistry) -> Self {
        Decoder {
            reader,
            options,
            registry,
            depth: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads one complete item.
    pub fn read_value(&mut self) -> Result<Value> {
        self.depth = 0;
        let initial = self.read_u8()?;
        self.decode_item(initial)
    }

    /// Reads one complete item, or returns `None` if the input ends before
    /// its first byte.
    pub fn read_next(&mut self) -> Result<Option<Value>> {
        self.depth = 0;
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return self.decode_item(buf[0]).map(Some),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CborError::Io(e)),
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf).map_err(CborError::from_read)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.reader.read_exact(&mut buf).map_err(CborError::from_read)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf).map_err(CborError::from_read)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf).map_err(CborError::from_read)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// The argument of a head byte: the literal value or its follow-up bytes.
    fn read_length(&mut self, info: u8) -> Result<u64> {
        Ok(match info {
            0..=23 => info as u64,
            24 => self.read_u8()? as u64,
            25 => self.read_u16()? as u64,
            26 => self.read_u32()? as u64,
            27 => self.read_u64()?,
            _ => {
                return Err(CborError::format(format!(
                    "invalid additional information {info}"
                )));
            }
        })
    }

    /// Reads exactly `len` bytes without trusting `len` for the allocation.
    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(64 * 1024) as usize);
        (&mut self.reader)
            .take(len)
            .read_to_end(&mut buf)
            .map_err(CborError::from_read)?;
        if (buf.len() as u64) < len {
            return Err(CborError::format("unexpected end of input"));
        }
        Ok(buf)
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.max_depth {
            tracing::debug!("nesting limit of {} exceeded", self.options.max_depth);
            return Err(CborError::format(format!(
                "nesting deeper than {} levels",
                self.options.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn decode_item(&mut self, initial: u8) -> Result<Value> {
        let major = initial >> 5;
        let info = initial & 0x1f;

        match major {
            MAJOR_UNSIGNED => Ok(Value::from(self.read_length(info)?)),
            MAJOR_NEGATIVE => {
                let n = self.read_length(info)?;
                Ok(match i64::try_from(n) {
                    Ok(n) => Value::Integer(-1 - n),
                    Err(_) => Value::BigInt(-(BigInt::from(n) + 1u8)),
                })
            }
            MAJOR_BYTES => {
                if info == 31 {
                    return self.read_chunks(MAJOR_BYTES).map(Value::Bytes);
                }
                let len = self.read_length(info)?;
                self.read_bytes(len).map(Value::Bytes)
            }
            MAJOR_TEXT => {
                let bytes = if info == 31 {
                    self.read_chunks(MAJOR_TEXT)?
                } else {
                    let len = self.read_length(info)?;
                    self.read_bytes(len)?
                };
                String::from_utf8(bytes)
                    .map(Value::Text)
                    .map_err(|e| CborError::format(format!("invalid UTF-8 in text string: {e}")))
            }
            MAJOR_ARRAY => {
                self.enter()?;
                let items = self.read_array(info)?;
                self.leave();
                Ok(Value::array(items))
            }
            MAJOR_MAP => {
                self.enter()?;
                let map = self.read_map(info)?;
                self.leave();
                Ok(Value::map(map))
            }
            MAJOR_TAG => {
                let tag = self.read_length(info)?;
                self.enter()?;
                let content = self.read_value_inner()?;
                self.leave();
                if self.options.validate_tags {
                    self.registry.validate(tag, content)
                } else {
                    Ok(Value::tagged(tag, content))
                }
            }
            MAJOR_SIMPLE => self.read_simple(info),
            _ => Err(CborError::format(format!("invalid major type {major}"))),
        }
    }

    fn read_value_inner(&mut self) -> Result<Value> {
        let initial = self.read_u8()?;
        self.decode_item(initial)
    }

    /// Concatenates the definite-length chunks of an indefinite-length string.
    fn read_chunks(&mut self, major: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let initial = self.read_u8()?;
            if initial == BREAK {
                return Ok(out);
            }
            let info = initial & 0x1f;
            if initial >> 5 != major || info == 31 {
                return Err(CborError::format(
                    "indefinite-length string chunk has the wrong type",
                ));
            }
            let len = self.read_length(info)?;
            let chunk = self.read_bytes(len)?;
            // a chunk may not end inside a UTF-8 sequence
            if major == MAJOR_TEXT && std::str::from_utf8(&chunk).is_err() {
                return Err(CborError::format("invalid UTF-8 in text string chunk"));
            }
            out.extend_from_slice(&chunk);
        }
    }

    fn read_array(&mut self, info: u8) -> Result<Vec<Value>> {
        if info == 31 {
            let mut items = Vec::new();
            loop {
                let initial = self.read_u8()?;
                if initial == BREAK {
                    return Ok(items);
                }
                items.push(self.decode_item(initial)?);
            }
        }
        let len = self.read_length(info)?;
        let mut items = Vec::with_capacity((len as usize).min(MAX_PREALLOCATE));
        for _ in 0..len {
            items.push(self.read_value_inner()?);
        }
        Ok(items)
    }

    /// A later duplicate key replaces the earlier entry.
    fn read_map(&mut self, info: u8) -> Result<CborMap> {
        if info == 31 {
            let mut map = CborMap::new();
            loop {
                let initial = self.read_u8()?;
                if initial == BREAK {
                    return Ok(map);
                }
                let key = self.decode_item(initial)?;
                let value = self.read_value_inner()?;
                map.insert(key, value);
            }
        }
        let len = self.read_length(info)?;
        let mut map = CborMap::with_capacity((len as usize).min(MAX_PREALLOCATE));
        for _ in 0..len {
            let key = self.read_value_inner()?;
            let value = self.read_value_inner()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_simple(&mut self, info: u8) -> Result<Value> {
        match info {
            0..=23 => Value::simple(info),
            24 => {
                let n = self.read_u8()?;
                if n < 32 {
                    return Err(CborError::format(format!(
                        "simple value {n} must use the one-byte form"
                    )));
                }
                Value::simple(n)
            }
            25 => Ok(Value::Single(half::f16::from_bits(self.read_u16()?).to_f32())),
            26 => Ok(Value::Single(f32::from_bits(self.read_u32()?))),
            27 => Ok(Value::Double(f64::from_bits(self.read_u64()?))),
            31 => Err(CborError::format("unexpected break")),
            _ => Err(CborError::format(format!(
                "invalid additional information {info} for major type 7"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_slice;

    fn decode_hex(s: &str) -> Result<Value> {
        from_slice(&hex::decode(s).unwrap())
    }

    #[test]
    fn test_integers() {
        assert_eq!(decode_hex("17").unwrap(), Value::Integer(23));
        assert_eq!(decode_hex("1818").unwrap(), Value::Integer(24));
        assert_eq!(decode_hex("20").unwrap(), Value::Integer(-1));
        assert_eq!(
            decode_hex("3b7fffffffffffffff").unwrap(),
            Value::Integer(i64::MIN)
        );
        assert_eq!(
            decode_hex("1bffffffffffffffff").unwrap(),
            Value::from(u64::MAX)
        );
        assert_eq!(
            decode_hex("3bffffffffffffffff").unwrap(),
            Value::from(-BigInt::from(u64::MAX) - 1)
        );
    }

    #[test]
    fn test_indefinite_strings() {
        assert_eq!(
            decode_hex("5f42010243030405ff").unwrap(),
            Value::from(vec![1u8, 2, 3, 4, 5])
        );
        assert_eq!(
            decode_hex("7f657374726561646d696e67ff").unwrap(),
            Value::from("streaming")
        );
        // a byte string chunk inside a text string
        assert!(matches!(
            decode_hex("7f4101ff"),
            Err(CborError::Format(_))
        ));
        // nested indefinite chunk
        assert!(matches!(
            decode_hex("5f5fffff"),
            Err(CborError::Format(_))
        ));
    }

    #[test]
    fn test_utf8_errors() {
        // "\u{e9}" cut after its first byte
        assert!(matches!(decode_hex("61c3"), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("62c3"), Err(CborError::Format(_))));
        // chunks that split one character
        assert!(matches!(
            decode_hex("7f61c361a9ff"),
            Err(CborError::Format(_))
        ));
    }

    #[test]
    fn test_truncated_and_trailing() {
        assert!(matches!(decode_hex(""), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("1901"), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("5a00010000"), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("8301"), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("0101"), Err(CborError::Format(_))));
        assert!(matches!(decode_hex("9f01"), Err(CborError::Format(_))));
    }

    #[test]
    fn test_invalid_heads() {
        for bad in ["1c", "3d", "5c", "7d", "9c", "bc", "dc", "fc", "ff", "1f", "df"] {
            assert!(
                matches!(decode_hex(bad), Err(CborError::Format(_))),
                "{bad} should be rejected"
            );
        }
        // break as a map value
        assert!(matches!(decode_hex("bf01ff"), Err(CborError::Format(_))));
        // two-byte simple values below 32
        assert!(matches!(decode_hex("f818"), Err(CborError::Format(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = vec![0x81u8; 300];
        deep.push(0x00);
        assert!(matches!(from_slice(&deep), Err(CborError::Format(_))));

        let options = DecodeOptions {
            max_depth: 400,
            ..Default::default()
        };
        assert!(crate::from_slice_with(&deep, options).is_ok());

        let tags = [vec![0xc6u8; 300], vec![0x00]].concat();
        assert!(matches!(from_slice(&tags), Err(CborError::Format(_))));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let value = decode_hex("a2616101616102").unwrap();
        assert_eq!(value.count().unwrap(), 1);
        assert_eq!(
            value.get_key(&"a".into()).unwrap(),
            Some(Value::Integer(2))
        );
    }

    #[test]
    fn test_tag_validation_switch() {
        assert_eq!(decode_hex("c24101").unwrap(), Value::Integer(1));
        let options = DecodeOptions {
            validate_tags: false,
            ..Default::default()
        };
        let raw = crate::from_slice_with(&hex::decode("c24101").unwrap(), options).unwrap();
        assert_eq!(raw, Value::tagged(2, vec![1u8]));

        let registry = TagRegistry::empty();
        let bytes = hex::decode(format!("d82550{}", "00".repeat(16))).unwrap();
        let mut decoder = Decoder::with_registry(&bytes[..], DecodeOptions::default(), &registry);
        assert!(decoder.read_value().unwrap().has_tag(37));
    }

    #[test]
    fn test_sequence() {
        let bytes = hex::decode("0161618101").unwrap();
        let mut decoder = Decoder::new(&bytes[..]);
        assert_eq!(decoder.read_next().unwrap(), Some(Value::Integer(1)));
        assert_eq!(decoder.read_next().unwrap(), Some(Value::from("a")));
        assert_eq!(
            decoder.read_next().unwrap(),
            Some(Value::array(vec![1.into()]))
        );
        assert_eq!(decoder.read_next().unwrap(), None);
    }

    #[test]
    fn test_half_precision() {
        assert_eq!(decode_hex("f93c00").unwrap(), Value::Single(1.0));
        assert_eq!(decode_hex("f90001").unwrap(), Value::Single(5.960464477539063e-8));
        assert_eq!(decode_hex("f9fc00").unwrap(), Value::Single(f32::NEG_INFINITY));
    }
}
