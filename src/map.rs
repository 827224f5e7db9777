use indexmap::IndexMap;
use indexmap::map::{Iter, Keys, Values};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{CborError, Result};
use crate::value::Value;

/// The entries of a CBOR map.
///
/// Keys are unique under [`Value`]'s structural equality. Entries keep the
/// order they were inserted in, which is the order the encoder writes them
/// unless key sorting is requested; equality and hashing ignore that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CborMap {
    entries: IndexMap<Value, Value>,
}

impl CborMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CborMap {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key` to `value`, returning the previous value. An existing key
    /// keeps its position.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Adds a new entry; fails if the key is already present.
    pub fn add(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(CborError::argument(format!("key {key} already exists")));
        }
        self.entries.insert(key, value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> Iter<'_, Value, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> Keys<'_, Value, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> Values<'_, Value, Value> {
        self.entries.values()
    }
}

impl Hash for CborMap {
    /// Order-independent: each entry is hashed on its own and the results are summed.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self.entries.iter().fold(0u64, |acc, (k, v)| {
            let mut entry = DefaultHasher::new();
            k.hash(&mut entry);
            v.hash(&mut entry);
            acc.wrapping_add(entry.finish())
        });
        state.write_usize(self.entries.len());
        state.write_u64(combined);
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for CborMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CborMap {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CborMap {
    type Item = (&'a Value, &'a Value);
    type IntoIter = Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
