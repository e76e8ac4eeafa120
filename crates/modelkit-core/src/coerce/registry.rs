//! Type handles and the strategy registry
//!
//! A [`TypeHandle`] is anything usable as a registry key: a canonical
//! type token or alias, a composed container handle, a strategy instance
//! itself, or a one-argument callable. [`TypeRegistry`] resolves handles
//! to strategies with a fixed fallback protocol and memoizes what it
//! learns - the table only grows and is never torn down.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::coerce::container::{ListStrategy, MapStrategy};
use crate::coerce::scalar::{
    BooleanStrategy, FloatStrategy, IntegerStrategy, StringStrategy, SymbolStrategy, TimeStrategy,
};
use crate::coerce::strategy::{AppliedFn, AppliedStrategy, CoercionStrategy, IdentityStrategy};
use crate::error::CoerceError;

/// Host-provided fallback for resolving unknown type names
pub type ResolverFn = Arc<dyn Fn(&str) -> Option<Arc<dyn CoercionStrategy>> + Send + Sync>;

/// An identifier usable as a registry key
#[derive(Clone)]
pub enum TypeHandle {
    /// Canonical type token or short alias (`"integer"`, `"Engine"`)
    Name(String),
    /// List of the inner handle's type
    List(Box<TypeHandle>),
    /// Map from the key handle's type to the value handle's type
    Map(Box<TypeHandle>, Box<TypeHandle>),
    /// The handle is a strategy instance itself
    Strategy(Arc<dyn CoercionStrategy>),
    /// The handle is a one-argument conversion function
    Applied(AppliedFn),
}

impl TypeHandle {
    /// Name handle constructor
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// List handle over an item handle
    #[inline]
    #[must_use]
    pub fn list(item: TypeHandle) -> Self {
        Self::List(Box::new(item))
    }

    /// Map handle over key and value handles
    #[inline]
    #[must_use]
    pub fn map(key: TypeHandle, value: TypeHandle) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Strategy-instance handle
    #[inline]
    #[must_use]
    pub fn strategy(strategy: Arc<dyn CoercionStrategy>) -> Self {
        Self::Strategy(strategy)
    }

    /// Callable handle
    pub fn applied<F>(func: F) -> Self
    where
        F: Fn(crate::value::Value) -> Result<crate::value::Value, CoerceError>
            + Send
            + Sync
            + 'static,
    {
        Self::Applied(Arc::new(func))
    }

    /// Canonical registry key for this handle
    ///
    /// Composed handles get structural keys (`list<symbol>`,
    /// `map<symbol,integer>`); applied handles have no stable key.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Name(n) => n.clone(),
            Self::List(item) => format!("list<{}>", item.cache_key()),
            Self::Map(k, v) => format!("map<{},{}>", k.cache_key(), v.cache_key()),
            Self::Strategy(s) => s.target_name().to_string(),
            Self::Applied(_) => "<applied>".to_string(),
        }
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.cache_key())
    }
}

impl From<&str> for TypeHandle {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Map from type handles to coercion strategies
///
/// # Lifecycle
///
/// Append-only and lazily populated: successful fallback lookups are
/// memoized, nothing is ever removed. The process-wide instance
/// ([`TypeRegistry::global`]) is expected to be populated at startup
/// before concurrent reads begin; tests construct fresh instances
/// instead. Registration and lookup are individually thread-safe
/// (`DashMap`), but "check then register" sequences need external
/// serialization.
pub struct TypeRegistry {
    strategies: DashMap<String, Arc<dyn CoercionStrategy>>,
    resolver: RwLock<Option<ResolverFn>>,
}

static GLOBAL: Lazy<Arc<TypeRegistry>> = Lazy::new(|| Arc::new(TypeRegistry::new()));

impl TypeRegistry {
    /// Registry seeded with the builtin scalar strategies
    ///
    /// Canonical names plus short aliases: `integer`/`int`, `float`,
    /// `string`/`str`, `symbol`/`sym`, `boolean`/`bool`, `time`,
    /// `identity`/`whatever`.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(Arc::new(IntegerStrategy), &["int"]);
        registry.register(Arc::new(FloatStrategy), &[]);
        registry.register(Arc::new(StringStrategy), &["str"]);
        registry.register(Arc::new(SymbolStrategy), &["sym"]);
        registry.register(Arc::new(BooleanStrategy), &["bool"]);
        registry.register(Arc::new(TimeStrategy), &[]);
        registry.register(Arc::new(IdentityStrategy), &["whatever"]);
        registry
    }

    /// Registry with no registrations at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: DashMap::new(),
            resolver: RwLock::new(None),
        }
    }

    /// The process-wide registry
    ///
    /// Lazily initialized with the builtins, shared for the life of the
    /// process.
    #[must_use]
    pub fn global() -> Arc<TypeRegistry> {
        GLOBAL.clone()
    }

    /// Register a strategy under its target name plus any aliases
    ///
    /// Last registration per handle wins.
    pub fn register(&self, strategy: Arc<dyn CoercionStrategy>, aliases: &[&str]) {
        debug!(
            strategy = %strategy.target_name(),
            ?aliases,
            "registering coercion strategy"
        );
        self.strategies
            .insert(strategy.target_name().to_string(), strategy.clone());
        for alias in aliases {
            self.strategies.insert((*alias).to_string(), strategy.clone());
        }
    }

    /// Install the host-provided name resolver
    pub fn set_resolver(&self, resolver: ResolverFn) {
        *self.resolver.write() = Some(resolver);
    }

    /// True iff an explicit registration exists for this key
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.strategies.contains_key(key)
    }

    /// Number of registered strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True iff nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Resolve a handle to a strategy
    ///
    /// Resolution order:
    /// 1. explicit registration hit by cache key
    /// 2. the handle is a strategy instance: register it under its
    ///    target name (without displacing an explicit registration) and
    ///    return it
    /// 3. the handle is a callable: wrap it as an applied strategy
    ///    (not memoized - closures have no stable key)
    /// 4. a name miss goes to the host-provided resolver; successes are
    ///    memoized
    /// 5. otherwise [`CoerceError::UnknownType`]
    ///
    /// Container handles build their strategy over the resolved inner
    /// handles and memoize it under the structural key.
    pub fn lookup(&self, handle: &TypeHandle) -> Result<Arc<dyn CoercionStrategy>, CoerceError> {
        match handle {
            TypeHandle::Name(name) => {
                if let Some(hit) = self.strategies.get(name.as_str()) {
                    return Ok(hit.value().clone());
                }
                let resolver = self.resolver.read().clone();
                if let Some(resolve) = resolver {
                    if let Some(found) = resolve(name) {
                        debug!(handle = %name, "resolved strategy via host resolver");
                        self.strategies.insert(name.clone(), found.clone());
                        return Ok(found);
                    }
                }
                Err(CoerceError::UnknownType {
                    handle: name.clone(),
                })
            }
            TypeHandle::List(item) => {
                let key = handle.cache_key();
                if let Some(hit) = self.strategies.get(&key) {
                    return Ok(hit.value().clone());
                }
                let built: Arc<dyn CoercionStrategy> =
                    Arc::new(ListStrategy::new((**item).clone()));
                self.strategies.insert(key, built.clone());
                Ok(built)
            }
            TypeHandle::Map(key_handle, value_handle) => {
                let key = handle.cache_key();
                if let Some(hit) = self.strategies.get(&key) {
                    return Ok(hit.value().clone());
                }
                let built: Arc<dyn CoercionStrategy> = Arc::new(MapStrategy::new(
                    (**key_handle).clone(),
                    (**value_handle).clone(),
                ));
                self.strategies.insert(key, built.clone());
                Ok(built)
            }
            TypeHandle::Strategy(strategy) => {
                self.strategies
                    .entry(strategy.target_name().to_string())
                    .or_insert_with(|| strategy.clone());
                Ok(strategy.clone())
            }
            TypeHandle::Applied(func) => {
                Ok(Arc::new(AppliedStrategy::new("<applied>", func.clone())))
            }
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Keep the output small and stable instead of dumping the table.
impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("strategies", &self.strategies.len())
            .field("has_resolver", &self.resolver.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn builtins_resolve_by_name_and_alias() {
        let registry = TypeRegistry::new();
        for key in ["integer", "int", "symbol", "sym", "boolean", "bool", "whatever"] {
            assert!(
                registry.lookup(&TypeHandle::name(key)).is_ok(),
                "missing builtin {key}"
            );
        }
    }

    #[test]
    fn unknown_name_fails() {
        let registry = TypeRegistry::new();
        let err = registry.lookup(&TypeHandle::name("money")).unwrap_err();
        assert!(matches!(err, CoerceError::UnknownType { .. }));
    }

    #[test]
    fn last_registration_wins() {
        let registry = TypeRegistry::new();
        registry.register(Arc::new(IdentityStrategy), &["integer"]);
        let got = registry.lookup(&TypeHandle::name("integer")).unwrap();
        assert_eq!(got.target_name(), "identity");
    }

    #[test]
    fn strategy_handle_registers_itself() {
        let registry = TypeRegistry::empty();
        let strategy: Arc<dyn CoercionStrategy> = Arc::new(SymbolStrategy);
        let got = registry
            .lookup(&TypeHandle::strategy(strategy.clone()))
            .unwrap();
        assert_eq!(got.target_name(), "symbol");
        assert!(registry.contains("symbol"));
    }

    #[test]
    fn strategy_handle_does_not_displace_explicit_registration() {
        let registry = TypeRegistry::empty();
        registry.register(Arc::new(IdentityStrategy), &["symbol"]);
        registry
            .lookup(&TypeHandle::strategy(Arc::new(SymbolStrategy)))
            .unwrap();
        let table_hit = registry.lookup(&TypeHandle::name("symbol")).unwrap();
        assert_eq!(table_hit.target_name(), "identity");
    }

    #[test]
    fn applied_handle_wraps_callable() {
        let registry = TypeRegistry::new();
        let handle = TypeHandle::applied(|v| match v {
            Value::Int(i) => Ok(Value::Int(i + 1)),
            other => Err(CoerceError::mismatch(&other, "inc", "not an integer")),
        });
        let strategy = registry.lookup(&handle).unwrap();
        assert_eq!(
            strategy.receive(Value::Int(1), &registry).unwrap(),
            Value::Int(2)
        );
        assert_eq!(strategy.receive(Value::Null, &registry).unwrap(), Value::Null);
    }

    #[test]
    fn resolver_fallback_is_memoized() {
        let registry = TypeRegistry::new();
        registry.set_resolver(Arc::new(|name| {
            (name == "money").then(|| Arc::new(IntegerStrategy) as Arc<dyn CoercionStrategy>)
        }));

        assert!(!registry.contains("money"));
        registry.lookup(&TypeHandle::name("money")).unwrap();
        assert!(registry.contains("money"));
    }

    #[test]
    fn container_handles_memoize_structural_keys() {
        let registry = TypeRegistry::new();
        let handle = TypeHandle::list(TypeHandle::name("symbol"));
        registry.lookup(&handle).unwrap();
        assert!(registry.contains("list<symbol>"));

        let map_handle = TypeHandle::map(TypeHandle::name("symbol"), TypeHandle::name("integer"));
        registry.lookup(&map_handle).unwrap();
        assert!(registry.contains("map<symbol,integer>"));
    }

    #[test]
    fn global_registry_is_shared() {
        let a = TypeRegistry::global();
        let b = TypeRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.lookup(&TypeHandle::name("integer")).is_ok());
    }
}
