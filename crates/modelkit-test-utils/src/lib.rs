//! Shared fixtures for modelkit tests
//!
//! The car/engine schema mirrors the kind of nested, collection-bearing
//! model the engine exists to serve. Fixtures always build against a
//! fresh registry so tests never observe each other's registrations.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::Once;

use modelkit_core::{
    FieldOptions, MapKey, ModelType, RawMap, TypeHandle, TypeRegistry, Value,
};

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process
///
/// Respects `RUST_LOG`; a no-op when a subscriber is already installed.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fresh registry seeded with the builtin strategies
pub fn fresh_registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new())
}

/// Car/engine schema over its own registry
pub struct CarFixture {
    pub registry: Arc<TypeRegistry>,
    pub engine: Arc<ModelType>,
    pub car: Arc<ModelType>,
}

/// Engine: `name: symbol`, `volume: integer`, `cylinders: integer`
/// Car: `name: symbol`, `make_model: string`, `year: integer`,
/// `engine: Engine`
pub fn car_fixture() -> CarFixture {
    init_tracing();
    let registry = fresh_registry();

    let engine = ModelType::create_with("Engine", registry.clone());
    for field in ["volume", "cylinders"] {
        engine
            .declare_field(field, TypeHandle::name("integer"), FieldOptions::new())
            .unwrap_or_else(|e| panic!("fixture field {field}: {e}"));
    }
    engine
        .declare_field("name", TypeHandle::name("symbol"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field name: {e}"));

    let car = ModelType::create_with("Car", registry.clone());
    car.declare_field("name", TypeHandle::name("symbol"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field name: {e}"));
    car.declare_field("make_model", TypeHandle::name("string"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field make_model: {e}"));
    car.declare_field("year", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field year: {e}"));
    car.declare_field("engine", TypeHandle::name("Engine"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field engine: {e}"));

    CarFixture {
        registry,
        engine,
        car,
    }
}

/// Garage schema: a `Garage` owning a keyed collection of `Car`s, each
/// child carrying a `garage_name` back-reference
pub struct GarageFixture {
    pub registry: Arc<TypeRegistry>,
    pub engine: Arc<ModelType>,
    pub car: Arc<ModelType>,
    pub garage: Arc<ModelType>,
}

pub fn garage_fixture() -> GarageFixture {
    let CarFixture {
        registry,
        engine,
        car,
    } = car_fixture();

    car.declare_field("garage_name", TypeHandle::name("symbol"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field garage_name: {e}"));

    let garage = ModelType::create_with("Garage", registry.clone());
    garage
        .declare_field("name", TypeHandle::name("symbol"), FieldOptions::new())
        .unwrap_or_else(|e| panic!("fixture field name: {e}"));
    garage
        .declare_collection(
            "cars",
            TypeHandle::name("Car"),
            FieldOptions::new().with_owner_key("garage_name"),
        )
        .unwrap_or_else(|e| panic!("fixture collection cars: {e}"));

    GarageFixture {
        registry,
        engine,
        car,
        garage,
    }
}

/// Raw map literal helper: symbol keys over the given pairs
pub fn sym_map(pairs: &[(&str, Value)]) -> RawMap {
    let mut map = RawMap::new();
    for (key, value) in pairs {
        map.insert(MapKey::sym(*key), value.clone());
    }
    map
}
