//! modelkit - typed attribute schemas and value coercion
//!
//! Programs declare named, typed fields on a [`ModelType`], then feed it
//! loosely-typed external data (maps, nested maps, scalars) and get back a
//! strongly-typed [`Record`], or a typed error when a value cannot be
//! reconciled with its declared type.
//!
//! # Core pieces
//!
//! - [`Value`]: the dynamic value model - both the loosely-typed input and
//!   the canonical in-memory representation
//! - [`CoercionStrategy`]: per-type native/blankish/convert logic
//! - [`TypeRegistry`]: process-wide handle -> strategy table
//! - [`ModelType`]: per-type field schema composed across an inheritance
//!   chain, memoized and invalidated on schema growth
//! - [`Record`]: tri-state attribute storage with default resolution and
//!   coercing bulk ingestion
//! - [`KeyedCollection`]: ordered, key-unique child container with
//!   autovivification
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use modelkit_core::{FieldOptions, ModelType, TypeHandle, TypeRegistry, Value};
//!
//! let registry = Arc::new(TypeRegistry::new());
//!
//! let engine = ModelType::create_with("Engine", registry.clone());
//! engine.declare_field("volume", TypeHandle::name("integer"), FieldOptions::new()).unwrap();
//!
//! let car = ModelType::create_with("Car", registry.clone());
//! car.declare_field("name", TypeHandle::name("symbol"), FieldOptions::new()).unwrap();
//! car.declare_field("engine", TypeHandle::name("Engine"), FieldOptions::new()).unwrap();
//!
//! let mut raw = indexmap::IndexMap::new();
//! raw.insert(modelkit_core::MapKey::str_key("name"), Value::str("wildcat"));
//! let car_value = car.receive(Value::Map(raw)).unwrap();
//! ```

#![warn(missing_docs)]

pub mod coerce;
pub mod collection;
pub mod error;
pub mod maplike;
pub mod record;
pub mod schema;
pub mod value;

// Re-exports
pub use coerce::registry::{ResolverFn, TypeHandle, TypeRegistry};
pub use coerce::strategy::{AppliedFn, AppliedStrategy, CoercionStrategy, IdentityStrategy};
pub use collection::KeyedCollection;
pub use error::{CoerceError, ModelError};
pub use maplike::MapLike;
pub use record::{Record, StrictRecord};
pub use schema::field::{DefaultSpec, FieldDescriptor, FieldKind, FieldOptions, Visibility};
pub use schema::model::ModelType;
pub use value::{MapKey, RawMap, Value};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for schema declaration and ingestion
    pub use crate::{
        CoerceError, CoercionStrategy, DefaultSpec, FieldOptions, KeyedCollection, MapKey,
        ModelError, ModelType, Record, StrictRecord, TypeHandle, TypeRegistry, Value,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
