//! Container-typed fields: list and map handles

use std::sync::Arc;

use modelkit_core::prelude::*;
use modelkit_core::{MapLike, RawMap};
use modelkit_test_utils::{fresh_registry, sym_map};
use pretty_assertions::assert_eq;

fn listy_model() -> Arc<ModelType> {
    let model = ModelType::create_with("Listy", fresh_registry());
    model
        .declare_field(
            "tags",
            TypeHandle::list(TypeHandle::name("symbol")),
            FieldOptions::new(),
        )
        .unwrap();
    model
        .declare_field(
            "counts",
            TypeHandle::map(TypeHandle::name("symbol"), TypeHandle::name("integer")),
            FieldOptions::new(),
        )
        .unwrap();
    model
}

#[test]
fn list_items_coerce_individually() {
    let model = listy_model();
    let raw = sym_map(&[(
        "tags",
        Value::List(vec![Value::str("a"), Value::str("b"), Value::sym("c")]),
    )]);

    let mut record = model.receive_record(Value::Map(raw)).unwrap();
    assert_eq!(
        record.read("tags"),
        Value::List(vec![Value::sym("a"), Value::sym("b"), Value::sym("c")])
    );
}

#[test]
fn null_container_is_set_to_none() {
    let model = listy_model();
    let raw = sym_map(&[("tags", Value::Null)]);
    let record = model.receive_record(Value::Map(raw)).unwrap();
    assert!(record.is_set("tags"));
    assert_eq!(record.peek("tags"), Value::Null);
}

#[test]
fn map_keys_and_values_both_coerce() {
    let model = listy_model();
    let mut counts = RawMap::new();
    counts.insert(MapKey::str_key("a"), Value::str("3"));
    counts.insert(MapKey::str_key("b"), Value::Int(4));
    let raw = sym_map(&[("counts", Value::Map(counts))]);

    let mut record = model.receive_record(Value::Map(raw)).unwrap();
    let Value::Map(got) = record.read("counts") else {
        panic!("counts should be a map");
    };
    assert_eq!(got.get(&MapKey::sym("a")), Some(&Value::Int(3)));
    assert_eq!(got.get(&MapKey::sym("b")), Some(&Value::Int(4)));
}

#[test]
fn bad_list_item_fails_the_field() {
    let model = listy_model();
    let raw = sym_map(&[("tags", Value::List(vec![Value::str("ok"), Value::Int(3)]))]);
    let err = model.receive(Value::Map(raw)).unwrap_err();
    assert!(matches!(err, ModelError::FieldCoercion { .. }), "{err}");
}

#[test]
fn map_like_surface_covers_both_map_shapes() {
    // RawMap and KeyedCollection expose the same keyed protocol
    let mut raw = RawMap::new();
    raw.set_entry(MapKey::sym("a"), Value::Int(1));

    let mut coll = KeyedCollection::new(TypeHandle::name("integer"));
    coll.merge_entries(&raw);
    assert_eq!(coll.get(&MapKey::sym("a")), Some(&Value::Int(1)));
    assert!(coll.has_key(&MapKey::sym("a")));
    assert_eq!(coll.fetch(&MapKey::sym("z"), Value::Int(9)), Value::Int(9));
}
