//! Record instances
//!
//! A [`Record`] maps field names to tri-state slots: unset, or set to a
//! value (including set-to-none). Reads of unset declared fields run
//! default resolution; bulk ingestion coerces through the owning model's
//! field strategies. The base record is permissive about undeclared
//! names - unmatched keys live in a side "extra attributes" bag - and
//! [`StrictRecord`] layers the fail-fast behavior on top.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::collection::KeyedCollection;
use crate::error::ModelError;
use crate::schema::field::{DefaultSpec, FieldDescriptor, FieldKind, Visibility};
use crate::schema::model::ModelType;
use crate::value::{MapKey, RawMap, Value};

/// A map view of an ingestion input, or [`ModelError::NotMapLike`]
pub(crate) fn raw_map_view(raw: &Value) -> Result<RawMap, ModelError> {
    raw.to_raw_map().ok_or_else(|| ModelError::NotMapLike {
        value: raw.to_string(),
    })
}

/// One typed record: attribute storage and lifecycle
///
/// Created empty (or via [`ModelType::receive`]); mutated only through
/// read/write/unset and the two bulk-ingestion paths; plain data
/// otherwise - share across threads only with external synchronization.
#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<ModelType>,
    attrs: IndexMap<String, Value>,
    extra: IndexMap<String, Value>,
}

impl Record {
    /// An empty record of the given type
    #[must_use]
    pub fn new(model: Arc<ModelType>) -> Self {
        Self {
            model,
            attrs: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }

    /// The record's type
    #[inline]
    #[must_use]
    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    /// Read a field
    ///
    /// Set slots return their value. Unset declared slots run default
    /// resolution:
    /// - no default: null, slot stays unset
    /// - literal: duplicated, stored, returned; a literal null still
    ///   marks the slot set (explicit-none is sticky)
    /// - zero-arg callable: invoked against the instance; a null result
    ///   leaves the slot unset so a later read re-evaluates it
    /// - (instance, name) callable: stored regardless of result
    ///
    /// Undeclared (or hidden-reader) names fall back to the extra bag.
    pub fn read(&mut self, name: &str) -> Value {
        match self.model.field(name) {
            Some(descriptor) if descriptor.reader() != Visibility::Hidden => {
                if let Some(value) = self.attrs.get(name) {
                    return value.clone();
                }
                self.resolve_default(&descriptor)
            }
            _ => self.extra.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Read without memoizing defaults
    ///
    /// Default callables use this to read sibling fields without
    /// mutating the record mid-resolution.
    #[must_use]
    pub fn peek(&self, name: &str) -> Value {
        match self.model.field(name) {
            Some(descriptor) if descriptor.reader() != Visibility::Hidden => {
                if let Some(value) = self.attrs.get(name) {
                    return value.clone();
                }
                match descriptor.default_spec() {
                    DefaultSpec::Unconfigured => Value::Null,
                    DefaultSpec::Literal(value) => value.clone(),
                    DefaultSpec::Thunk(thunk) => thunk(self),
                    DefaultSpec::NamedThunk(thunk) => thunk(self, name),
                }
            }
            _ => self.extra.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    fn resolve_default(&mut self, descriptor: &FieldDescriptor) -> Value {
        let name = descriptor.name().to_string();
        match descriptor.default_spec() {
            DefaultSpec::Unconfigured => Value::Null,
            DefaultSpec::Literal(value) => {
                let duplicate = value.clone();
                self.attrs.insert(name, duplicate.clone());
                duplicate
            }
            DefaultSpec::Thunk(thunk) => {
                let thunk = thunk.clone();
                let value = thunk(self);
                if !value.is_null() {
                    self.attrs.insert(name, value.clone());
                }
                value
            }
            DefaultSpec::NamedThunk(thunk) => {
                let thunk = thunk.clone();
                let value = thunk(self, &name);
                self.attrs.insert(name, value.clone());
                value
            }
        }
    }

    /// Store a value verbatim, mark the slot set, return the value
    ///
    /// Undeclared (or hidden-writer) names land in the extra bag.
    pub fn write(&mut self, name: &str, value: Value) -> Value {
        match self.model.field(name) {
            Some(descriptor) if descriptor.writer() != Visibility::Hidden => {
                self.attrs.insert(name.to_string(), value.clone());
            }
            _ => {
                self.extra.insert(name.to_string(), value.clone());
            }
        }
        value
    }

    /// Clear a slot, returning the former value
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.attrs.shift_remove(name)
    }

    /// True iff the slot is set (the value may be none)
    #[inline]
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// The set attributes (field name -> value)
    #[must_use]
    pub fn attributes(&self) -> IndexMap<String, Value> {
        self.attrs.clone()
    }

    /// The unmatched-key bag accumulated by ingestion
    #[must_use]
    pub fn extra_attributes(&self) -> &IndexMap<String, Value> {
        &self.extra
    }

    /// Map view: set attributes then extras, under symbol keys
    #[must_use]
    pub fn to_raw_map(&self) -> RawMap {
        let mut out = RawMap::with_capacity(self.attrs.len() + self.extra.len());
        for (name, value) in &self.attrs {
            out.insert(MapKey::Sym(name.clone()), value.clone());
        }
        for (name, value) in &self.extra {
            out.entry(MapKey::Sym(name.clone()))
                .or_insert_with(|| value.clone());
        }
        out
    }

    /// Bulk-ingest a raw map, coercing every matched value
    ///
    /// For each declared field the symbol key form is checked before the
    /// string form. Hidden-receiver fields are skipped; unmatched keys
    /// are kept in the extra bag. Not transactional: a mid-ingestion
    /// failure leaves earlier fields written.
    pub fn receive_attrs(&mut self, raw: &Value) -> Result<(), ModelError> {
        let map = raw_map_view(raw)?;
        self.receive_raw_map(&map)
    }

    pub(crate) fn receive_raw_map(&mut self, map: &RawMap) -> Result<(), ModelError> {
        let fields = self.model.all_fields();
        let registry = self.model.registry().clone();

        for (name, descriptor) in fields.iter() {
            if descriptor.receiver() == Visibility::Hidden {
                continue;
            }
            let found = map
                .get(&MapKey::sym(name.clone()))
                .or_else(|| map.get(&MapKey::str_key(name.clone())));
            let Some(raw_value) = found else {
                continue;
            };

            match descriptor.kind() {
                FieldKind::Scalar => {
                    let strategy = registry
                        .lookup(descriptor.type_handle())
                        .map_err(|e| ModelError::at_field(name.clone(), e))?;
                    let coerced = strategy
                        .receive(raw_value.clone(), &registry)
                        .map_err(|e| ModelError::at_field(name.clone(), e))?;
                    trace!(model = %self.model.name(), field = %name, "received field");
                    self.attrs.insert(name.clone(), coerced);
                }
                FieldKind::Collection { .. } => {
                    self.receive_collection_field(name, descriptor, raw_value)?;
                }
            }
        }

        for (key, value) in map.iter() {
            if let Some(text) = key.as_text() {
                if !fields.contains_key(text) {
                    self.extra.insert(text.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }

    // Collection slots are rebuilt fresh on every ingestion, like the
    // container strategies. A null short-circuits to set-to-none.
    fn receive_collection_field(
        &mut self,
        name: &str,
        descriptor: &FieldDescriptor,
        raw: &Value,
    ) -> Result<(), ModelError> {
        if raw.is_null() {
            self.attrs.insert(name.to_string(), Value::Null);
            return Ok(());
        }
        let registry = self.model.registry().clone();
        let mut collection = KeyedCollection::new(descriptor.type_handle().clone());
        collection
            .merge_from(raw, &registry)
            .map_err(|e| match e {
                ModelError::FieldCoercion { path, source } => {
                    ModelError::at_field(format!("{name}.{path}"), source)
                }
                other => other,
            })?;
        self.attrs
            .insert(name.to_string(), Value::Collection(Box::new(collection)));
        Ok(())
    }

    /// Bulk-write a raw map without coercion
    ///
    /// Same key matching as [`Record::receive_attrs`]; values are stored
    /// as-is. For copying already-typed data between records.
    pub fn update_attrs(&mut self, raw: &Value) -> Result<(), ModelError> {
        let map = raw_map_view(raw)?;
        let fields = self.model.all_fields();
        for (name, _descriptor) in fields.iter() {
            let found = map
                .get(&MapKey::sym(name.clone()))
                .or_else(|| map.get(&MapKey::str_key(name.clone())));
            if let Some(value) = found {
                self.attrs.insert(name.clone(), value.clone());
            }
        }
        for (key, value) in map.iter() {
            if let Some(text) = key.as_text() {
                if !fields.contains_key(text) {
                    self.extra.insert(text.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Get-or-create a child in a collection field
    ///
    /// Creates the (empty) collection on first touch, then delegates to
    /// [`KeyedCollection::get_or_create`]. The owner back-reference, if
    /// the field declares one, carries this record's `name` attribute.
    pub fn get_or_create_child(
        &mut self,
        field: &str,
        key: MapKey,
        partial: Option<Value>,
    ) -> Result<Value, ModelError> {
        let descriptor = self
            .model
            .field(field)
            .ok_or_else(|| ModelError::UnknownField {
                model: self.model.name().to_string(),
                field: field.to_string(),
            })?;
        let FieldKind::Collection { owner_key, .. } = descriptor.kind().clone() else {
            return Err(ModelError::NotACollection {
                model: self.model.name().to_string(),
                field: field.to_string(),
            });
        };

        let owner = owner_key.map(|key_name| (key_name, self.peek("name")));
        let registry = self.model.registry().clone();

        if !matches!(self.attrs.get(field), Some(Value::Collection(_))) {
            self.attrs.insert(
                field.to_string(),
                Value::Collection(Box::new(KeyedCollection::new(
                    descriptor.type_handle().clone(),
                ))),
            );
        }
        if let Some(Value::Collection(collection)) = self.attrs.get_mut(field) {
            collection.get_or_create(key, partial, owner, &registry)
        } else {
            Err(ModelError::NotACollection {
                model: self.model.name().to_string(),
                field: field.to_string(),
            })
        }
    }

    /// True iff the collection field holds a child under `key`
    #[must_use]
    pub fn has_child(&self, field: &str, key: &MapKey) -> bool {
        match self.attrs.get(field) {
            Some(Value::Collection(collection)) => collection.contains_key(key),
            _ => false,
        }
    }
}

/// Same concrete type and equal attribute maps
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.attrs == other.attrs
    }
}

/// Fail-fast decorator over [`Record`]
///
/// Reads and writes of undeclared fields fail with
/// [`ModelError::UnknownField`] instead of consulting the extra bag.
/// Everything else derefs to the base record.
#[derive(Debug, Clone, PartialEq)]
pub struct StrictRecord {
    inner: Record,
}

impl StrictRecord {
    /// Wrap a record
    #[must_use]
    pub fn new(inner: Record) -> Self {
        Self { inner }
    }

    /// Read a declared field, or fail
    pub fn read(&mut self, name: &str) -> Result<Value, ModelError> {
        if !self.inner.model.has_field(name) {
            return Err(ModelError::UnknownField {
                model: self.inner.model.name().to_string(),
                field: name.to_string(),
            });
        }
        Ok(self.inner.read(name))
    }

    /// Write a declared field, or fail
    pub fn write(&mut self, name: &str, value: Value) -> Result<Value, ModelError> {
        if !self.inner.model.has_field(name) {
            return Err(ModelError::UnknownField {
                model: self.inner.model.name().to_string(),
                field: name.to_string(),
            });
        }
        Ok(self.inner.write(name, value))
    }

    /// Unwrap the base record
    #[must_use]
    pub fn into_inner(self) -> Record {
        self.inner
    }
}

impl Deref for StrictRecord {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.inner
    }
}

impl DerefMut for StrictRecord {
    fn deref_mut(&mut self) -> &mut Record {
        &mut self.inner
    }
}
