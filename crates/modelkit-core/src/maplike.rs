//! Map-like behavior as a trait
//!
//! [`MapLike`] captures "hash-like" behavior over a minimal required set
//! (`get_entry`, `set_entry`, `remove_entry`, `entry_keys`); everything
//! else (`has_key`, `fetch`, `merge_entries`, sizes) is a default method
//! built only on top of that set.

use crate::value::{MapKey, RawMap, Value};

/// Keyed, ordered access to values
///
/// Implemented by [`RawMap`] and by
/// [`KeyedCollection`](crate::collection::KeyedCollection). Ingestion
/// surfaces require only this capability of their input.
pub trait MapLike {
    /// Look up an entry by key
    fn get_entry(&self, key: &MapKey) -> Option<&Value>;

    /// Insert or replace an entry, returning the former value
    fn set_entry(&mut self, key: MapKey, value: Value) -> Option<Value>;

    /// Remove an entry, returning the former value
    fn remove_entry(&mut self, key: &MapKey) -> Option<Value>;

    /// All keys, in insertion order
    fn entry_keys(&self) -> Vec<MapKey>;

    /// True iff the key is present
    fn has_key(&self, key: &MapKey) -> bool {
        self.get_entry(key).is_some()
    }

    /// The value for `key`, or `fallback` when absent
    fn fetch(&self, key: &MapKey, fallback: Value) -> Value {
        self.get_entry(key).cloned().unwrap_or(fallback)
    }

    /// Number of entries
    fn len(&self) -> usize {
        self.entry_keys().len()
    }

    /// True iff there are no entries
    fn is_empty(&self) -> bool {
        self.entry_keys().is_empty()
    }

    /// Adopt every entry of `other`, last writer wins per key
    fn merge_entries(&mut self, other: &dyn MapLike) {
        for key in other.entry_keys() {
            if let Some(value) = other.get_entry(&key) {
                self.set_entry(key, value.clone());
            }
        }
    }
}

impl MapLike for RawMap {
    fn get_entry(&self, key: &MapKey) -> Option<&Value> {
        self.get(key)
    }

    fn set_entry(&mut self, key: MapKey, value: Value) -> Option<Value> {
        self.insert(key, value)
    }

    fn remove_entry(&mut self, key: &MapKey) -> Option<Value> {
        self.shift_remove(key)
    }

    fn entry_keys(&self) -> Vec<MapKey> {
        self.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_on_required_set() {
        let mut map = RawMap::new();
        map.set_entry(MapKey::sym("a"), Value::Int(1));
        map.set_entry(MapKey::sym("b"), Value::Int(2));

        assert!(map.has_key(&MapKey::sym("a")));
        assert!(!map.has_key(&MapKey::sym("z")));
        assert_eq!(map.fetch(&MapKey::sym("z"), Value::Int(9)), Value::Int(9));
        assert_eq!(MapLike::len(&map), 2);
        assert!(!MapLike::is_empty(&map));
    }

    #[test]
    fn merge_entries_last_writer_wins() {
        let mut left = RawMap::new();
        left.insert(MapKey::sym("a"), Value::Int(1));
        let mut right = RawMap::new();
        right.insert(MapKey::sym("a"), Value::Int(10));
        right.insert(MapKey::sym("b"), Value::Int(2));

        left.merge_entries(&right);
        assert_eq!(left.get(&MapKey::sym("a")), Some(&Value::Int(10)));
        assert_eq!(left.get(&MapKey::sym("b")), Some(&Value::Int(2)));
    }
}
