//! Schema composition across a live hierarchy

use modelkit_core::prelude::*;
use modelkit_test_utils::{fresh_registry, sym_map};
use pretty_assertions::assert_eq;

#[test]
fn ancestor_growth_reaches_ingestion_immediately() {
    let registry = fresh_registry();
    let base = ModelType::create_with("Base", registry);
    base.declare_field("x", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();
    let leaf = base.subtype("Leaf");

    // leaf ingests once, caching its composed view
    let mut first = leaf
        .receive_record(Value::Map(sym_map(&[("x", Value::str("1"))])))
        .unwrap();
    assert_eq!(first.read("x"), Value::Int(1));

    base.declare_field("z", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();

    let mut second = leaf
        .receive_record(Value::Map(sym_map(&[
            ("x", Value::str("1")),
            ("z", Value::str("2")),
        ])))
        .unwrap();
    assert_eq!(second.read("z"), Value::Int(2));
}

#[test]
fn descendant_override_changes_the_type_not_the_slot() {
    let registry = fresh_registry();
    let base = ModelType::create_with("Base", registry);
    base.declare_field("code", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();
    base.declare_field("label", TypeHandle::name("string"), FieldOptions::new())
        .unwrap();
    let leaf = base.subtype("Leaf");
    leaf.declare_field("code", TypeHandle::name("string"), FieldOptions::new())
        .unwrap();

    let fields = leaf.all_fields();
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["code", "label"]);

    let mut record = leaf
        .receive_record(Value::Map(sym_map(&[("code", Value::Int(7))])))
        .unwrap();
    assert_eq!(record.read("code"), Value::str("7"));

    // the ancestor keeps its own typing
    let mut base_record = base
        .receive_record(Value::Map(sym_map(&[("code", Value::str("7"))])))
        .unwrap();
    assert_eq!(base_record.read("code"), Value::Int(7));
}

#[test]
fn sibling_hierarchies_stay_independent() {
    let registry = fresh_registry();
    let base = ModelType::create_with("Base", registry);
    let left = base.subtype("Left");
    let right = base.subtype("Right");
    left.declare_field("only_left", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();

    assert!(left.has_field("only_left"));
    assert!(!right.has_field("only_left"));
    assert!(!base.has_field("only_left"));
}

#[test]
fn discriminated_ingestion_picks_the_leaf() {
    let registry = fresh_registry();
    let base = ModelType::create_with("Vehicle", registry);
    base.declare_field("name", TypeHandle::name("symbol"), FieldOptions::new())
        .unwrap();
    let truck = base.subtype("Truck");
    truck
        .declare_field("axles", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();

    let raw = sym_map(&[
        ("_type", Value::str("Truck")),
        ("name", Value::str("hauler")),
        ("axles", Value::str("3")),
    ]);
    let record = base.receive_record(Value::Map(raw)).unwrap();
    assert_eq!(record.model().name(), "Truck");
    assert_eq!(record.peek("axles"), Value::Int(3));
}

#[test]
fn strict_records_surface_schema_misses() {
    let registry = fresh_registry();
    let model = ModelType::create_with("T", registry);
    model
        .declare_field("n", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();

    let mut strict = StrictRecord::new(model.new_record());
    strict.write("n", Value::Int(1)).unwrap();
    let err = strict.write("m", Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "unknown field `m` on T");
}
