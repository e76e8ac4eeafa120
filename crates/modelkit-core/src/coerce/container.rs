//! Container strategies
//!
//! Containers compose nested strategies: a list strategy holds an item
//! handle, a map strategy holds a key handle and a value handle. They are
//! never native - `convert` always builds a fresh product and receives
//! every element through the nested strategies, so callers never alias an
//! ingested container. Blankish input short-circuits to the absence
//! marker before any of that, so a null never becomes an empty container.

use crate::coerce::registry::{TypeHandle, TypeRegistry};
use crate::coerce::strategy::CoercionStrategy;
use crate::error::CoerceError;
use crate::value::{MapKey, RawMap, Value};

/// Coerces to `Value::List`, receiving every element via the item handle
#[derive(Debug, Clone)]
pub struct ListStrategy {
    name: String,
    item: TypeHandle,
}

impl ListStrategy {
    /// List strategy over the given item handle
    pub fn new(item: TypeHandle) -> Self {
        Self {
            name: format!("list<{}>", item.cache_key()),
            item,
        }
    }

    /// The item handle
    #[inline]
    #[must_use]
    pub fn item_handle(&self) -> &TypeHandle {
        &self.item
    }
}

impl CoercionStrategy for ListStrategy {
    fn target_name(&self) -> &str {
        &self.name
    }

    // Containers are always rebuilt; an input list is never native.
    fn is_native(&self, _value: &Value) -> bool {
        false
    }

    fn convert(&self, value: Value, registry: &TypeRegistry) -> Result<Value, CoerceError> {
        let items = match value {
            Value::List(items) => items,
            other => {
                return Err(CoerceError::mismatch(
                    &other,
                    &self.name,
                    format!("no conversion from {}", other.type_name()),
                ))
            }
        };

        let item_strategy = registry.lookup(&self.item)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(item_strategy.receive(item, registry)?);
        }
        Ok(Value::List(out))
    }
}

/// Coerces to `Value::Map`, receiving keys and values via nested handles
///
/// Coerced keys must still have a key form (symbol, string, integer,
/// boolean); a key strategy producing anything else is a mismatch.
#[derive(Debug, Clone)]
pub struct MapStrategy {
    name: String,
    key: TypeHandle,
    value: TypeHandle,
}

impl MapStrategy {
    /// Map strategy over the given key and value handles
    pub fn new(key: TypeHandle, value: TypeHandle) -> Self {
        Self {
            name: format!("map<{},{}>", key.cache_key(), value.cache_key()),
            key,
            value,
        }
    }
}

impl CoercionStrategy for MapStrategy {
    fn target_name(&self) -> &str {
        &self.name
    }

    fn is_native(&self, _value: &Value) -> bool {
        false
    }

    fn convert(&self, value: Value, registry: &TypeRegistry) -> Result<Value, CoerceError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(CoerceError::mismatch(
                    &other,
                    &self.name,
                    format!("no conversion from {}", other.type_name()),
                ))
            }
        };

        let key_strategy = registry.lookup(&self.key)?;
        let value_strategy = registry.lookup(&self.value)?;

        let mut out = RawMap::with_capacity(entries.len());
        for (raw_key, raw_value) in entries {
            let coerced_key = key_strategy.receive(raw_key.to_value(), registry)?;
            let key = MapKey::from_value(&coerced_key).ok_or_else(|| {
                CoerceError::mismatch(&coerced_key, &self.name, "not usable as a map key")
            })?;
            let coerced_value = value_strategy.receive(raw_value, registry)?;
            out.insert(key, coerced_value);
        }
        Ok(Value::Map(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_receives_every_element() {
        let registry = TypeRegistry::new();
        let s = ListStrategy::new(TypeHandle::name("symbol"));

        let got = s
            .receive(
                Value::List(vec![Value::str("a"), Value::str("b"), Value::sym("c")]),
                &registry,
            )
            .unwrap();
        assert_eq!(
            got,
            Value::List(vec![Value::sym("a"), Value::sym("b"), Value::sym("c")])
        );
    }

    #[test]
    fn list_null_short_circuits_to_null() {
        let registry = TypeRegistry::new();
        let s = ListStrategy::new(TypeHandle::name("symbol"));
        assert_eq!(s.receive(Value::Null, &registry).unwrap(), Value::Null);
    }

    #[test]
    fn list_rejects_non_lists() {
        let registry = TypeRegistry::new();
        let s = ListStrategy::new(TypeHandle::name("integer"));
        assert!(s.receive(Value::Int(3), &registry).is_err());
    }

    #[test]
    fn list_propagates_element_mismatch() {
        let registry = TypeRegistry::new();
        let s = ListStrategy::new(TypeHandle::name("integer"));
        let err = s
            .receive(Value::List(vec![Value::str("nope")]), &registry)
            .unwrap_err();
        assert!(matches!(err, CoerceError::Mismatch { .. }));
    }

    #[test]
    fn map_coerces_keys_and_values() {
        let registry = TypeRegistry::new();
        let s = MapStrategy::new(TypeHandle::name("symbol"), TypeHandle::name("integer"));

        let mut raw = RawMap::new();
        raw.insert(MapKey::str_key("volume"), Value::str("455"));
        let got = s.receive(Value::Map(raw), &registry).unwrap();

        let mut expected = RawMap::new();
        expected.insert(MapKey::sym("volume"), Value::Int(455));
        assert_eq!(got, Value::Map(expected));
    }

    #[test]
    fn containers_rebuild_even_when_elements_are_native() {
        let registry = TypeRegistry::new();
        let s = ListStrategy::new(TypeHandle::name("integer"));
        let input = Value::List(vec![Value::Int(1), Value::Int(2)]);

        assert!(!s.is_native(&input));
        let once = s.receive(input.clone(), &registry).unwrap();
        assert_eq!(once, input);
        let twice = s.receive(once.clone(), &registry).unwrap();
        assert_eq!(twice, once);
    }
}
