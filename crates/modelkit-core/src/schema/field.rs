//! Field descriptors
//!
//! A [`FieldDescriptor`] is the declared metadata for one named typed
//! slot. Descriptors are owned exclusively by the declaring model's
//! schema and are immutable once built; redeclaring a field builds a
//! fresh descriptor rather than mutating the old one.

use std::fmt;
use std::sync::Arc;

use crate::coerce::registry::TypeHandle;
use crate::record::Record;
use crate::value::Value;

/// Zero-arg default callable, invoked in the instance's context
///
/// May read sibling fields through [`Record::peek`]; must not block.
pub type DefaultThunk = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// (instance, field-name) default callable
pub type NamedDefaultThunk = Arc<dyn Fn(&Record, &str) -> Value + Send + Sync>;

/// How an unset field resolves on first read
///
/// The two callable forms differ from the literal form in how a null
/// result sticks - see [`Record::read`](crate::record::Record::read).
#[derive(Clone, Default)]
pub enum DefaultSpec {
    /// No default configured
    #[default]
    Unconfigured,
    /// Literal value, duplicated on resolution; a literal null is sticky
    Literal(Value),
    /// Computed default; a null result leaves the slot unset
    Thunk(DefaultThunk),
    /// (instance, name) callable; marks the slot set regardless
    NamedThunk(NamedDefaultThunk),
}

impl DefaultSpec {
    /// True whenever a default is configured, independent of whether the
    /// resolved value happens to be null
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "Unconfigured"),
            Self::Literal(v) => write!(f, "Literal({v})"),
            Self::Thunk(_) => write!(f, "Thunk(..)"),
            Self::NamedThunk(_) => write!(f, "NamedThunk(..)"),
        }
    }
}

/// Per-accessor visibility
///
/// `Hidden` disables the accessor entirely: a hidden reader/writer makes
/// the field behave as undeclared through the public surface, a hidden
/// receiver skips the field during bulk ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Part of the public surface
    #[default]
    Public,
    /// Internal to the owning hierarchy
    Protected,
    /// Internal to the declaring type
    Private,
    /// Accessor not synthesized
    Hidden,
}

/// What shape of slot a field declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldKind {
    /// Single value of the field's type
    #[default]
    Scalar,
    /// Keyed collection of children of the field's type
    Collection {
        /// Singular form of the field name (child construction, docs)
        singular: String,
        /// Attribute on each child that points back at the owner
        owner_key: Option<String>,
    },
}

/// Metadata for one named typed slot
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    type_handle: TypeHandle,
    kind: FieldKind,
    default: DefaultSpec,
    doc: Option<String>,
    position: Option<usize>,
    reader: Visibility,
    writer: Visibility,
    receiver: Visibility,
}

impl FieldDescriptor {
    pub(crate) fn new(
        name: String,
        type_handle: TypeHandle,
        kind: FieldKind,
        options: FieldOptions,
    ) -> Self {
        Self {
            name,
            type_handle,
            kind,
            default: options.default,
            doc: options.doc,
            position: options.position,
            reader: options.reader,
            writer: options.writer,
            receiver: options.receiver,
        }
    }

    /// Field name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type handle (for collections, the item type)
    #[inline]
    #[must_use]
    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    /// Scalar or collection
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The configured default
    #[inline]
    #[must_use]
    pub fn default_spec(&self) -> &DefaultSpec {
        &self.default
    }

    /// True iff a default is configured
    #[inline]
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_configured()
    }

    /// Opaque documentation passthrough
    #[inline]
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Positional-argument index, if declared positional
    #[inline]
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Reader visibility
    #[inline]
    #[must_use]
    pub fn reader(&self) -> Visibility {
        self.reader
    }

    /// Writer visibility
    #[inline]
    #[must_use]
    pub fn writer(&self) -> Visibility {
        self.writer
    }

    /// Receiver (bulk-ingestion) visibility
    #[inline]
    #[must_use]
    pub fn receiver(&self) -> Visibility {
        self.receiver
    }
}

/// Recognized declaration options
///
/// Built with the `with_*` methods; everything defaults to "public
/// scalar field, no default, no position".
#[derive(Clone, Debug, Default)]
pub struct FieldOptions {
    pub(crate) default: DefaultSpec,
    pub(crate) doc: Option<String>,
    pub(crate) position: Option<usize>,
    pub(crate) reader: Visibility,
    pub(crate) writer: Visibility,
    pub(crate) receiver: Visibility,
    pub(crate) singular: Option<String>,
    pub(crate) owner_key: Option<String>,
}

impl FieldOptions {
    /// Empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal default value
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = DefaultSpec::Literal(value);
        self
    }

    /// Computed default (zero-arg callable in the instance's context)
    #[must_use]
    pub fn with_default_fn<F>(mut self, func: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.default = DefaultSpec::Thunk(Arc::new(func));
        self
    }

    /// (instance, name) default callable
    #[must_use]
    pub fn with_named_default_fn<F>(mut self, func: F) -> Self
    where
        F: Fn(&Record, &str) -> Value + Send + Sync + 'static,
    {
        self.default = DefaultSpec::NamedThunk(Arc::new(func));
        self
    }

    /// Documentation passthrough
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Positional-argument index
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Reader visibility
    #[must_use]
    pub fn with_reader(mut self, visibility: Visibility) -> Self {
        self.reader = visibility;
        self
    }

    /// Writer visibility
    #[must_use]
    pub fn with_writer(mut self, visibility: Visibility) -> Self {
        self.writer = visibility;
        self
    }

    /// Receiver visibility
    #[must_use]
    pub fn with_receiver(mut self, visibility: Visibility) -> Self {
        self.receiver = visibility;
        self
    }

    /// Singular name for a collection field
    #[must_use]
    pub fn with_singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }

    /// Owner back-reference attribute for a collection field
    #[must_use]
    pub fn with_owner_key(mut self, owner_key: impl Into<String>) -> Self {
        self.owner_key = Some(owner_key.into());
        self
    }
}
