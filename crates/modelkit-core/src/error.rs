//! Error types for the modelkit engine
//!
//! Two enums, split by concern:
//! - [`CoerceError`]: failures inside the strategy layer (conversion
//!   mismatches, registry misses)
//! - [`ModelError`]: failures at the schema/record layer (declaration
//!   errors, ingestion errors), wrapping [`CoerceError`] where a field
//!   coercion is the root cause

use crate::value::Value;

/// Errors surfaced by coercion strategies and the type registry
///
/// Strategies never leak internal exception types: any conversion failure
/// is reported as [`CoerceError::Mismatch`] carrying the offending value,
/// the target type name, and a cause description.
#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    /// Value irreconcilable with the declared type
    #[error("cannot convert {value} into {target}: {cause}")]
    Mismatch {
        /// Rendered offending value
        value: String,
        /// Target type name
        target: String,
        /// Cause description
        cause: String,
    },

    /// No strategy registered for a type handle
    ///
    /// Indicates a missing registration, not a runtime-recoverable
    /// condition.
    #[error("no coercion strategy registered for handle `{handle}`")]
    UnknownType {
        /// The unresolvable handle's cache key
        handle: String,
    },
}

impl CoerceError {
    /// Build a mismatch error from the offending value
    pub fn mismatch(value: &Value, target: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Mismatch {
            value: value.to_string(),
            target: target.into(),
            cause: cause.into(),
        }
    }
}

/// Errors surfaced by schema declaration, records, and collections
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Field name is not a legal identifier
    #[error("illegal field name `{name}`")]
    IllegalFieldName {
        /// The rejected name
        name: String,
    },

    /// Positional index is duplicate or non-dense
    #[error("bad position {position} for field `{name}`: expected {expected}")]
    BadPosition {
        /// Field being declared
        name: String,
        /// Requested positional index
        position: usize,
        /// Next dense index for the hierarchy
        expected: usize,
    },

    /// Read/write of an undeclared field through the strict surface
    #[error("unknown field `{field}` on {model}")]
    UnknownField {
        /// Owning model name
        model: String,
        /// The undeclared field
        field: String,
    },

    /// Ingestion input does not expose a map view
    #[error("cannot ingest {value}: not map-like")]
    NotMapLike {
        /// Rendered offending value
        value: String,
    },

    /// A field's value could not be coerced during ingestion
    ///
    /// `path` is the field path from the ingestion root, e.g.
    /// `engine.volume` for a nested failure.
    #[error("field `{path}`: {source}")]
    FieldCoercion {
        /// Field path from the ingestion root
        path: String,
        /// The underlying coercion failure
        #[source]
        source: CoerceError,
    },

    /// Container-field access on a field that is not a collection
    #[error("field `{field}` on {model} is not a collection")]
    NotACollection {
        /// Owning model name
        model: String,
        /// The non-collection field
        field: String,
    },

    /// A collection child's key could not be derived
    #[error("cannot derive key `{key_attr}` from {value}")]
    UnderivableKey {
        /// The key-extraction attribute
        key_attr: String,
        /// Rendered child value
        value: String,
    },

    /// Coercion failure outside any field context
    #[error(transparent)]
    Coerce(#[from] CoerceError),
}

impl ModelError {
    /// Wrap a coercion failure with its field path
    pub fn at_field(path: impl Into<String>, source: CoerceError) -> Self {
        Self::FieldCoercion {
            path: path.into(),
            source,
        }
    }
}
