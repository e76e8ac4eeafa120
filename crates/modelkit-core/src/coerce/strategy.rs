//! The coercion strategy trait
//!
//! Every strategy classifies a value three ways: blankish (becomes the
//! absence marker), native (passes through unchanged), or convertible.
//! The provided [`CoercionStrategy::receive`] method fixes that flow;
//! concrete strategies supply the classification and the conversion.

use std::fmt;
use std::sync::Arc;

use crate::coerce::registry::TypeRegistry;
use crate::error::CoerceError;
use crate::value::Value;

/// A one-argument conversion function usable as a type handle
pub type AppliedFn = Arc<dyn Fn(Value) -> Result<Value, CoerceError> + Send + Sync>;

/// Per-type native/blankish/convert logic
///
/// # Contract
///
/// - `receive` is idempotent: re-applying it to an already-successful
///   result yields an equal value, and a non-null result is native
/// - blankish wins: a blankish value becomes `Value::Null` and never
///   reaches `convert`
/// - failures surface only as [`CoerceError::Mismatch`]
pub trait CoercionStrategy: fmt::Debug + Send + Sync {
    /// Name of the product type (registry key, error payload)
    fn target_name(&self) -> &str;

    /// True iff the value is already in canonical form for this type
    fn is_native(&self, value: &Value) -> bool;

    /// True iff the value means "no value"
    ///
    /// Default: only the absence marker itself.
    fn is_blankish(&self, value: &Value) -> bool {
        value.is_null()
    }

    /// Convert a non-native, non-blankish value
    ///
    /// Container strategies use `registry` to resolve their item
    /// strategies; scalar strategies ignore it.
    fn convert(&self, value: Value, registry: &TypeRegistry) -> Result<Value, CoerceError>;

    /// The full coercion flow: blankish -> none, native -> unchanged,
    /// else convert
    fn receive(&self, value: Value, registry: &TypeRegistry) -> Result<Value, CoerceError> {
        if self.is_blankish(&value) {
            return Ok(Value::Null);
        }
        if self.is_native(&value) {
            return Ok(value);
        }
        self.convert(value, registry)
    }
}

/// Strategy that accepts everything unchanged
///
/// Always native, never blankish: even `Value::Null` passes through,
/// which makes identity fields transparent to the blankish short-circuit.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityStrategy;

impl CoercionStrategy for IdentityStrategy {
    fn target_name(&self) -> &str {
        "identity"
    }

    fn is_native(&self, _value: &Value) -> bool {
        true
    }

    fn is_blankish(&self, _value: &Value) -> bool {
        false
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        Ok(value)
    }
}

/// Strategy wrapping a one-argument function as `convert`
///
/// Nothing is native and only the absence marker is blankish, so the
/// function sees every non-null input.
#[derive(Clone)]
pub struct AppliedStrategy {
    name: String,
    func: AppliedFn,
}

impl AppliedStrategy {
    /// Wrap `func` under the given target name
    pub fn new(name: impl Into<String>, func: AppliedFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Wrap a plain closure
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, CoerceError> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(func))
    }
}

impl fmt::Debug for AppliedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppliedStrategy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CoercionStrategy for AppliedStrategy {
    fn target_name(&self) -> &str {
        &self.name
    }

    fn is_native(&self, _value: &Value) -> bool {
        false
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        (self.func)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_null_through() {
        let registry = TypeRegistry::new();
        let s = IdentityStrategy;
        assert_eq!(s.receive(Value::Null, &registry).unwrap(), Value::Null);
        assert_eq!(
            s.receive(Value::Int(3), &registry).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn applied_runs_on_every_non_null_input() {
        let registry = TypeRegistry::new();
        let s = AppliedStrategy::from_fn("doubler", |v| match v {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            other => Err(CoerceError::mismatch(&other, "doubler", "not an integer")),
        });

        assert_eq!(s.receive(Value::Int(2), &registry).unwrap(), Value::Int(4));
        assert_eq!(s.receive(Value::Null, &registry).unwrap(), Value::Null);
        assert!(s.receive(Value::sym("x"), &registry).is_err());
    }
}
