//! Value coercion
//!
//! Pluggable per-type conversion behind one [`CoercionStrategy`] trait:
//! - [`strategy`]: the trait, plus the identity and applied wrappers
//! - [`scalar`]: converting/non-converting scalar strategies
//! - [`container`]: list/map strategies that compose nested strategies
//! - [`registry`]: [`TypeHandle`](registry::TypeHandle) resolution and the
//!   process-wide strategy table

pub mod container;
pub mod registry;
pub mod scalar;
pub mod strategy;

pub use container::{ListStrategy, MapStrategy};
pub use registry::{ResolverFn, TypeHandle, TypeRegistry};
pub use scalar::{
    BooleanStrategy, FloatStrategy, IntegerStrategy, StringStrategy, SymbolStrategy, TimeStrategy,
};
pub use strategy::{AppliedFn, AppliedStrategy, CoercionStrategy, IdentityStrategy};
