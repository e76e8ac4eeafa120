//! Field schemas
//!
//! - [`field`]: per-slot metadata ([`field::FieldDescriptor`]), default
//!   specs, visibility
//! - [`model`]: the per-type schema registry ([`model::ModelType`]) with
//!   inheritance, memoized composition, and ingestion

pub mod field;
pub mod model;

pub use field::{DefaultSpec, FieldDescriptor, FieldKind, FieldOptions, Visibility};
pub use model::ModelType;
