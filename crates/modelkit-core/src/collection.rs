//! Keyed child collections
//!
//! A [`KeyedCollection`] is an ordered, key-unique container of coerced
//! children. Keys are derived from each child's key attribute (`name`
//! unless configured otherwise), so the container behaves like a map
//! whose keys are guaranteed to agree with the children they index.

use tracing::trace;

use crate::coerce::registry::{TypeHandle, TypeRegistry};
use crate::error::ModelError;
use crate::maplike::MapLike;
use crate::value::{MapKey, RawMap, Value};

/// Ordered, key-unique container of typed children
///
/// Insertion order is preserved; inserting under an existing key updates
/// in place without changing the entry's position.
#[derive(Debug, Clone)]
pub struct KeyedCollection {
    item_handle: TypeHandle,
    key_attr: String,
    entries: RawMap,
}

impl KeyedCollection {
    /// An empty collection of `item_handle` children keyed by `name`
    #[must_use]
    pub fn new(item_handle: TypeHandle) -> Self {
        Self::with_key_attr(item_handle, "name")
    }

    /// An empty collection keyed by an arbitrary child attribute
    #[must_use]
    pub fn with_key_attr(item_handle: TypeHandle, key_attr: impl Into<String>) -> Self {
        Self {
            item_handle,
            key_attr: key_attr.into(),
            entries: RawMap::new(),
        }
    }

    /// The handle children are coerced through
    #[inline]
    #[must_use]
    pub fn item_handle(&self) -> &TypeHandle {
        &self.item_handle
    }

    /// The attribute keys are derived from
    #[inline]
    #[must_use]
    pub fn key_attr(&self) -> &str {
        &self.key_attr
    }

    /// Look up a child
    #[inline]
    #[must_use]
    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// True iff a child exists under `key`
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff there are no children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    #[must_use]
    pub fn keys(&self) -> Vec<MapKey> {
        self.entries.keys().cloned().collect()
    }

    /// (key, child) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    /// Map view of the entries
    #[must_use]
    pub fn to_raw_map(&self) -> RawMap {
        self.entries.clone()
    }

    /// Insert a child under the key derived from its key attribute
    pub fn add(&mut self, child: Value) -> Result<MapKey, ModelError> {
        let key = self.derive_key(&child)?;
        self.entries.insert(key.clone(), child);
        Ok(key)
    }

    /// Insert a child under an explicit key
    pub fn insert(&mut self, key: MapKey, child: Value) -> Option<Value> {
        self.entries.insert(key, child)
    }

    /// Derive a child's collection key from its key attribute
    ///
    /// Records are asked for the attribute without memoizing a default;
    /// plain maps are probed under the symbol then string key form. The
    /// result must itself have a key form.
    pub fn derive_key(&self, child: &Value) -> Result<MapKey, ModelError> {
        let key_value = match child {
            Value::Record(record) => record.peek(&self.key_attr),
            Value::Map(map) => map
                .get(&MapKey::sym(self.key_attr.clone()))
                .or_else(|| map.get(&MapKey::str_key(self.key_attr.clone())))
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
        MapKey::from_value(&key_value).ok_or_else(|| ModelError::UnderivableKey {
            key_attr: self.key_attr.clone(),
            value: child.to_string(),
        })
    }

    /// Bulk-adopt children from a map, list, or sibling collection
    ///
    /// Map inputs keep their own keys; list items are coerced first and
    /// then keyed by their key attribute. Existing keys are updated in
    /// place. Anything else is rejected as not map-like.
    pub fn merge_from(&mut self, raw: &Value, registry: &TypeRegistry) -> Result<(), ModelError> {
        match raw {
            Value::Collection(other) => {
                for (key, child) in other.iter() {
                    self.entries.insert(key.clone(), child.clone());
                }
                Ok(())
            }
            Value::Map(map) => {
                let strategy = registry.lookup(&self.item_handle)?;
                for (key, item) in map {
                    let coerced = strategy
                        .receive(item.clone(), registry)
                        .map_err(|e| ModelError::at_field(key.to_string(), e))?;
                    self.entries.insert(key.clone(), coerced);
                }
                Ok(())
            }
            Value::List(items) => {
                let strategy = registry.lookup(&self.item_handle)?;
                for item in items {
                    let coerced = strategy.receive(item.clone(), registry)?;
                    if coerced.is_null() {
                        continue;
                    }
                    self.add(coerced)?;
                }
                Ok(())
            }
            other => Err(ModelError::NotMapLike {
                value: other.to_string(),
            }),
        }
    }

    /// Fetch the child under `key`, creating it on a miss
    ///
    /// A `partial` that is already a typed instance is adopted wholesale
    /// under `key`. A plain map partial is never an instance - it is
    /// construction input even when the item strategy would call it
    /// native - so the key attribute and owner back-reference always get
    /// stamped (the key wins over a conflicting partial entry). An
    /// existing child is updated in place from the partial's attributes,
    /// never replaced.
    pub fn get_or_create(
        &mut self,
        key: MapKey,
        partial: Option<Value>,
        owner: Option<(String, Value)>,
        registry: &TypeRegistry,
    ) -> Result<Value, ModelError> {
        let strategy = registry.lookup(&self.item_handle)?;

        if let Some(ref given) = partial {
            let is_instance =
                !given.is_null() && !matches!(given, Value::Map(_)) && strategy.is_native(given);
            if is_instance {
                self.entries.insert(key, given.clone());
                return Ok(given.clone());
            }
        }

        if self.entries.contains_key(&key) {
            if let Some(ref given) = partial {
                if !given.is_null() {
                    if let Some(Value::Record(existing)) = self.entries.get_mut(&key) {
                        existing.receive_attrs(given)?;
                    }
                }
            }
            return Ok(self.entries.get(&key).cloned().unwrap_or(Value::Null));
        }

        trace!(key = %key, key_attr = %self.key_attr, "creating collection child");
        let mut seed = RawMap::new();
        if let Some(given) = partial {
            if !given.is_null() {
                let map = given.to_raw_map().ok_or_else(|| ModelError::NotMapLike {
                    value: given.to_string(),
                })?;
                seed.extend(map);
            }
        }
        if let Some((owner_attr, owner_value)) = owner {
            seed.insert(MapKey::sym(owner_attr), owner_value);
        }
        seed.insert(MapKey::sym(self.key_attr.clone()), key.to_value());

        let child = strategy.receive(Value::Map(seed), registry)?;
        self.entries.insert(key.clone(), child.clone());
        Ok(child)
    }
}

/// Same item type, key attribute, and entries
impl PartialEq for KeyedCollection {
    fn eq(&self, other: &Self) -> bool {
        self.item_handle.cache_key() == other.item_handle.cache_key()
            && self.key_attr == other.key_attr
            && self.entries == other.entries
    }
}

impl MapLike for KeyedCollection {
    fn get_entry(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    fn set_entry(&mut self, key: MapKey, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    fn remove_entry(&mut self, key: &MapKey) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    fn entry_keys(&self) -> Vec<MapKey> {
        self.entries.keys().cloned().collect()
    }
}
