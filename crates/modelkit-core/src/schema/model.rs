//! Model types and schema composition
//!
//! A [`ModelType`] is the runtime type object for one record type: its
//! directly declared fields, its place in an inheritance chain, and a
//! memoized composed view of every field from the root ancestor down.
//!
//! # Invalidation
//!
//! The composed view must be treated as stale whenever *any* type in the
//! hierarchy gains a field - even after a descendant already computed its
//! view. Each type keeps a weak parent-to-children index so declaration
//! invalidates only the affected subtree instead of scanning every live
//! type.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, warn};

use crate::coerce::registry::{TypeHandle, TypeRegistry};
use crate::coerce::strategy::CoercionStrategy;
use crate::error::{CoerceError, ModelError};
use crate::record::{raw_map_view, Record};
use crate::schema::field::{FieldDescriptor, FieldKind, FieldOptions};
use crate::value::{MapKey, Value};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// The discriminator key consulted during ingestion
pub const TYPE_DISCRIMINATOR: &str = "_type";

/// Composed field view: name -> descriptor, root-to-leaf order
pub type FieldMap = IndexMap<String, Arc<FieldDescriptor>>;

/// Runtime type object and per-type schema registry
///
/// Created once per record type (clustered at startup), shared via
/// `Arc`. Schema state is lock-guarded so no reader observes a partially
/// invalidated composed view.
#[derive(Debug)]
pub struct ModelType {
    name: String,
    parent: Option<Arc<ModelType>>,
    registry: Arc<TypeRegistry>,
    own_fields: RwLock<FieldMap>,
    all_fields_memo: RwLock<Option<Arc<FieldMap>>>,
    children: RwLock<Vec<Weak<ModelType>>>,
}

impl ModelType {
    /// Create a root type wired to the process-wide registry
    pub fn create(name: impl Into<String>) -> Arc<Self> {
        Self::create_with(name, TypeRegistry::global())
    }

    /// Create a root type wired to an explicit registry (tests construct
    /// fresh registries; production wires one shared instance at startup)
    pub fn create_with(name: impl Into<String>, registry: Arc<TypeRegistry>) -> Arc<Self> {
        let model = Arc::new(Self {
            name: name.into(),
            parent: None,
            registry,
            own_fields: RwLock::new(FieldMap::new()),
            all_fields_memo: RwLock::new(None),
            children: RwLock::new(Vec::new()),
        });
        model.registry.register_model(&model);
        model
    }

    /// Create a subtype of this type
    ///
    /// The child inherits the parent's registry and is indexed for
    /// subtree invalidation.
    pub fn subtype(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        let child = Arc::new(Self {
            name: name.into(),
            parent: Some(self.clone()),
            registry: self.registry.clone(),
            own_fields: RwLock::new(FieldMap::new()),
            all_fields_memo: RwLock::new(None),
            children: RwLock::new(Vec::new()),
        });
        self.children.write().push(Arc::downgrade(&child));
        self.registry.register_model(&child);
        child
    }

    /// Type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent type, if any
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ModelType>> {
        self.parent.as_ref()
    }

    /// The registry this type resolves strategies against
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// True iff `ancestor` is this type or one of its ancestors
    #[must_use]
    pub fn is_a(self: &Arc<Self>, ancestor: &Arc<ModelType>) -> bool {
        let mut current = Some(self.clone());
        while let Some(model) = current {
            if Arc::ptr_eq(&model, ancestor) {
                return true;
            }
            current = model.parent.clone();
        }
        false
    }

    /// Find a descendant type by name
    #[must_use]
    pub fn find_descendant(self: &Arc<Self>, name: &str) -> Option<Arc<ModelType>> {
        let mut queue: Vec<Arc<ModelType>> = self
            .children
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        while let Some(model) = queue.pop() {
            if model.name == name {
                return Some(model);
            }
            queue.extend(model.children.read().iter().filter_map(Weak::upgrade));
        }
        None
    }

    /// Declare (or redeclare) a scalar field on this type
    ///
    /// Validates the name, enforces dense unique positional indices
    /// across the hierarchy, stores the descriptor, and invalidates the
    /// composed view of this type and every descendant.
    pub fn declare_field(
        &self,
        name: &str,
        type_handle: TypeHandle,
        options: FieldOptions,
    ) -> Result<Arc<FieldDescriptor>, ModelError> {
        self.declare(name, type_handle, FieldKind::Scalar, options)
    }

    /// Declare a collection field holding children of `item_handle`
    ///
    /// The singular name defaults to the field name with one trailing
    /// `s` trimmed; pass [`FieldOptions::with_singular`] to override
    /// (inflection is a collaborator this engine does not carry).
    pub fn declare_collection(
        &self,
        name: &str,
        item_handle: TypeHandle,
        options: FieldOptions,
    ) -> Result<Arc<FieldDescriptor>, ModelError> {
        let singular = options
            .singular
            .clone()
            .unwrap_or_else(|| name.strip_suffix('s').unwrap_or(name).to_string());
        let kind = FieldKind::Collection {
            singular,
            owner_key: options.owner_key.clone(),
        };
        self.declare(name, item_handle, kind, options)
    }

    fn declare(
        &self,
        name: &str,
        type_handle: TypeHandle,
        kind: FieldKind,
        options: FieldOptions,
    ) -> Result<Arc<FieldDescriptor>, ModelError> {
        if !IDENTIFIER.is_match(name) {
            return Err(ModelError::IllegalFieldName {
                name: name.to_string(),
            });
        }
        if let Some(position) = options.position {
            self.check_position(name, position)?;
        }

        let descriptor = Arc::new(FieldDescriptor::new(
            name.to_string(),
            type_handle,
            kind,
            options,
        ));
        self.own_fields
            .write()
            .insert(name.to_string(), descriptor.clone());
        self.invalidate_subtree();
        Ok(descriptor)
    }

    // Positions must arrive sequentially: the next legal index is the
    // number of positional fields already visible on this type. That
    // rules out duplicates and gaps at declaration time. A positional
    // field keeps its index across redeclarations - moving it would
    // either collide with a neighbor or open a gap.
    fn check_position(&self, name: &str, position: usize) -> Result<(), ModelError> {
        let fields = self.all_fields();
        if let Some(current) = fields.get(name).and_then(|d| d.position()) {
            if current == position {
                return Ok(());
            }
            return Err(ModelError::BadPosition {
                name: name.to_string(),
                position,
                expected: current,
            });
        }
        let expected = fields
            .values()
            .filter(|d| d.position().is_some())
            .count();
        if position != expected {
            return Err(ModelError::BadPosition {
                name: name.to_string(),
                position,
                expected,
            });
        }
        Ok(())
    }

    fn invalidate_subtree(&self) {
        debug!(model = %self.name, "invalidating composed field view");
        *self.all_fields_memo.write() = None;
        let children: Vec<Arc<ModelType>> = self
            .children
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for child in children {
            child.invalidate_subtree();
        }
    }

    /// Directly declared fields of this type only
    #[must_use]
    pub fn own_fields(&self) -> FieldMap {
        self.own_fields.read().clone()
    }

    /// Composed field view, root ancestor to this type
    ///
    /// Memoized until any type in the hierarchy declares a field. A
    /// descendant's redeclaration replaces the descriptor but keeps the
    /// ancestor's original position.
    #[must_use]
    pub fn all_fields(&self) -> Arc<FieldMap> {
        if let Some(memo) = self.all_fields_memo.read().as_ref() {
            return memo.clone();
        }

        let mut merged = match &self.parent {
            Some(parent) => (*parent.all_fields()).clone(),
            None => FieldMap::new(),
        };
        for (name, descriptor) in self.own_fields.read().iter() {
            // IndexMap keeps the original slot on re-insert, which is
            // exactly the override-in-place rule.
            merged.insert(name.clone(), descriptor.clone());
        }

        let merged = Arc::new(merged);
        *self.all_fields_memo.write() = Some(merged.clone());
        merged
    }

    /// Descriptor for one field, if declared anywhere in the chain
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Arc<FieldDescriptor>> {
        self.all_fields().get(name).cloned()
    }

    /// True iff the field is declared anywhere in the chain
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.all_fields().contains_key(name)
    }

    /// Positional fields in index order
    #[must_use]
    pub fn positional_fields(&self) -> Vec<Arc<FieldDescriptor>> {
        let mut positional: Vec<Arc<FieldDescriptor>> = self
            .all_fields()
            .values()
            .filter(|d| d.position().is_some())
            .cloned()
            .collect();
        positional.sort_by_key(|d| d.position());
        positional
    }

    /// A fresh, empty record of this type
    #[must_use]
    pub fn new_record(self: &Arc<Self>) -> Record {
        Record::new(self.clone())
    }

    /// Ingestion surface
    ///
    /// - an instance of this type (or a descendant) passes through
    ///   unchanged; so does the absence marker
    /// - a map carrying a `_type` discriminator naming a descendant
    ///   delegates construction to it; an unknown discriminator warns
    ///   and falls through
    /// - anything else map-like constructs a new record and bulk-ingests
    pub fn receive(self: &Arc<Self>, raw: Value) -> Result<Value, ModelError> {
        match &raw {
            Value::Null => return Ok(Value::Null),
            Value::Record(existing) if existing.model().is_a(self) => return Ok(raw),
            _ => {}
        }

        let map = raw_map_view(&raw)?;
        if let Some(tag) = map
            .get(&MapKey::sym(TYPE_DISCRIMINATOR))
            .or_else(|| map.get(&MapKey::str_key(TYPE_DISCRIMINATOR)))
        {
            if let Value::Sym(type_name) | Value::Str(type_name) = tag {
                if type_name != &self.name {
                    if let Some(subtype) = self.find_descendant(type_name) {
                        return subtype.receive(raw);
                    }
                    warn!(
                        model = %self.name,
                        discriminator = %type_name,
                        "discriminator names no compatible subtype; constructing the receiving type"
                    );
                }
            }
        }

        let mut record = Record::new(self.clone());
        record.receive_raw_map(&map)?;
        Ok(Value::Record(Box::new(record)))
    }

    /// Like [`ModelType::receive`], unwrapping the record
    ///
    /// Blankish input is a [`ModelError::NotMapLike`] here, since there
    /// is no record to hand back.
    pub fn receive_record(self: &Arc<Self>, raw: Value) -> Result<Record, ModelError> {
        match self.receive(raw)? {
            Value::Record(record) => Ok(*record),
            other => Err(ModelError::NotMapLike {
                value: other.to_string(),
            }),
        }
    }
}

/// Strategy adapter for record types
///
/// Registered under the model's name when the model is created, so
/// nested record fields resolve through the ordinary registry path.
#[derive(Debug, Clone)]
pub struct RecordStrategy {
    model: Arc<ModelType>,
}

impl RecordStrategy {
    /// Strategy coercing into the given model
    #[must_use]
    pub fn new(model: Arc<ModelType>) -> Self {
        Self { model }
    }
}

impl CoercionStrategy for RecordStrategy {
    fn target_name(&self) -> &str {
        self.model.name()
    }

    fn is_native(&self, value: &Value) -> bool {
        match value {
            Value::Record(record) => record.model().is_a(&self.model),
            _ => false,
        }
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        let rendered = value.to_string();
        self.model
            .receive(value)
            .map_err(|e| CoerceError::Mismatch {
                value: rendered,
                target: self.model.name().to_string(),
                cause: e.to_string(),
            })
    }
}

impl TypeRegistry {
    /// Install a [`RecordStrategy`] for the model under its name
    pub fn register_model(&self, model: &Arc<ModelType>) {
        self.register(Arc::new(RecordStrategy::new(model.clone())), &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawMap;

    fn fresh_registry() -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::new())
    }

    fn declare(model: &Arc<ModelType>, name: &str, handle: &str) {
        model
            .declare_field(name, TypeHandle::name(handle), FieldOptions::new())
            .unwrap();
    }

    #[test]
    fn rejects_illegal_field_names() {
        let model = ModelType::create_with("T", fresh_registry());
        for bad in ["", "1abc", "with space", "with-dash"] {
            let err = model
                .declare_field(bad, TypeHandle::name("integer"), FieldOptions::new())
                .unwrap_err();
            assert!(matches!(err, ModelError::IllegalFieldName { .. }), "{bad}");
        }
        declare(&model, "_ok", "integer");
    }

    #[test]
    fn composed_view_merges_root_to_leaf() {
        let registry = fresh_registry();
        let a = ModelType::create_with("A", registry);
        declare(&a, "x", "integer");
        let b = a.subtype("B");
        declare(&b, "y", "integer");

        let fields = b.all_fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn late_ancestor_growth_reaches_cached_descendants() {
        let registry = fresh_registry();
        let a = ModelType::create_with("A", registry);
        declare(&a, "x", "integer");
        let b = a.subtype("B");
        declare(&b, "y", "integer");

        // B caches its view, then A grows.
        assert_eq!(b.all_fields().len(), 2);
        declare(&a, "z", "integer");

        let fields = b.all_fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "z", "y"]);
    }

    #[test]
    fn redeclaration_keeps_ancestor_position() {
        let registry = fresh_registry();
        let a = ModelType::create_with("A", registry);
        declare(&a, "x", "integer");
        declare(&a, "w", "integer");
        let b = a.subtype("B");
        declare(&b, "x", "string");

        let fields = b.all_fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "w"]);
        assert_eq!(fields["x"].type_handle().cache_key(), "string");
    }

    #[test]
    fn positions_must_be_sequential() {
        let model = ModelType::create_with("T", fresh_registry());
        model
            .declare_field(
                "a",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(0),
            )
            .unwrap();

        let dup = model
            .declare_field(
                "b",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(0),
            )
            .unwrap_err();
        assert!(matches!(dup, ModelError::BadPosition { expected: 1, .. }));

        let gap = model
            .declare_field(
                "b",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(2),
            )
            .unwrap_err();
        assert!(matches!(gap, ModelError::BadPosition { expected: 1, .. }));

        model
            .declare_field(
                "b",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(1),
            )
            .unwrap();
        let positional = model.positional_fields();
        assert_eq!(positional.len(), 2);
        assert_eq!(positional[0].name(), "a");
        assert_eq!(positional[1].name(), "b");
    }

    #[test]
    fn positional_fields_keep_their_index_on_redeclaration() {
        let model = ModelType::create_with("T", fresh_registry());
        model
            .declare_field(
                "a",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(0),
            )
            .unwrap();
        model
            .declare_field(
                "b",
                TypeHandle::name("integer"),
                FieldOptions::new().with_position(1),
            )
            .unwrap();

        // moving a positional field would collide with its neighbor
        let moved = model
            .declare_field(
                "a",
                TypeHandle::name("string"),
                FieldOptions::new().with_position(1),
            )
            .unwrap_err();
        assert!(matches!(
            moved,
            ModelError::BadPosition {
                position: 1,
                expected: 0,
                ..
            }
        ));

        // same index redeclares fine, and density survives
        model
            .declare_field(
                "a",
                TypeHandle::name("string"),
                FieldOptions::new().with_position(0),
            )
            .unwrap();
        let positional = model.positional_fields();
        let indices: Vec<Option<usize>> = positional.iter().map(|d| d.position()).collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }

    #[test]
    fn is_a_walks_the_chain() {
        let registry = fresh_registry();
        let a = ModelType::create_with("A", registry);
        let b = a.subtype("B");
        let c = b.subtype("C");

        assert!(c.is_a(&a));
        assert!(c.is_a(&c));
        assert!(!a.is_a(&c));
        assert_eq!(a.find_descendant("C").unwrap().name(), "C");
        assert!(a.find_descendant("Z").is_none());
    }

    #[test]
    fn receive_passes_instances_through() {
        let registry = fresh_registry();
        let model = ModelType::create_with("T", registry);
        declare(&model, "n", "integer");

        let mut raw = RawMap::new();
        raw.insert(MapKey::sym("n"), Value::str("3"));
        let first = model.receive(Value::Map(raw)).unwrap();
        let again = model.receive(first.clone()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn receive_delegates_on_discriminator() {
        let registry = fresh_registry();
        let base = ModelType::create_with("Base", registry);
        declare(&base, "n", "integer");
        let special = base.subtype("Special");
        declare(&special, "extra_n", "integer");

        let mut raw = RawMap::new();
        raw.insert(MapKey::sym("_type"), Value::str("Special"));
        raw.insert(MapKey::sym("n"), Value::Int(1));
        raw.insert(MapKey::sym("extra_n"), Value::Int(2));

        let got = base.receive(Value::Map(raw)).unwrap();
        let Value::Record(record) = got else {
            panic!("expected a record");
        };
        assert_eq!(record.model().name(), "Special");
        assert!(record.is_set("extra_n"));
    }

    #[test]
    fn receive_rejects_non_map_input() {
        let registry = fresh_registry();
        let model = ModelType::create_with("T", registry);
        let err = model.receive(Value::Int(3)).unwrap_err();
        assert!(matches!(err, ModelError::NotMapLike { .. }));
    }

    #[test]
    fn models_register_their_strategies() {
        let registry = fresh_registry();
        let _model = ModelType::create_with("Engine", registry.clone());
        assert!(registry.contains("Engine"));
        assert!(registry.lookup(&TypeHandle::name("Engine")).is_ok());
    }
}
