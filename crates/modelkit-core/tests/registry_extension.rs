//! Registering a host-defined scalar type end to end

use std::sync::Arc;

use modelkit_core::prelude::*;
use modelkit_test_utils::{fresh_registry, sym_map};
use pretty_assertions::assert_eq;

/// Money as integer cents; dollars parse from `"$4.50"`-style strings.
#[derive(Debug)]
struct MoneyStrategy;

impl CoercionStrategy for MoneyStrategy {
    fn target_name(&self) -> &str {
        "money"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Int(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        let dollars = match &value {
            Value::Str(s) => s
                .trim()
                .trim_start_matches('$')
                .parse::<f64>()
                .map_err(|e| CoerceError::mismatch(&value, "money", e.to_string()))?,
            Value::Float(f) => *f,
            other => {
                return Err(CoerceError::mismatch(other, "money", "no monetary form"));
            }
        };
        #[allow(clippy::cast_possible_truncation)]
        let cents = (dollars * 100.0).round() as i64;
        Ok(Value::Int(cents))
    }
}

fn priced_model(registry: &Arc<TypeRegistry>) -> Arc<ModelType> {
    let model = ModelType::create_with("Listing", registry.clone());
    model
        .declare_field("price", TypeHandle::name("money"), FieldOptions::new())
        .unwrap();
    model
}

#[test]
fn unregistered_type_fails_at_ingestion() {
    let registry = fresh_registry();
    let model = priced_model(&registry);
    let err = model
        .receive(Value::Map(sym_map(&[("price", Value::str("$4.50"))])))
        .unwrap_err();
    assert!(err.to_string().contains("money"), "{err}");
}

#[test]
fn registered_type_participates_like_a_builtin() {
    let registry = fresh_registry();
    registry.register(Arc::new(MoneyStrategy), &[]);
    let model = priced_model(&registry);

    let mut listing = model
        .receive_record(Value::Map(sym_map(&[("price", Value::str("$4.50"))])))
        .unwrap();
    assert_eq!(listing.read("price"), Value::Int(450));

    // native and blankish forms follow the shared flow
    let mut native = model
        .receive_record(Value::Map(sym_map(&[("price", Value::Int(99))])))
        .unwrap();
    assert_eq!(native.read("price"), Value::Int(99));

    let blank = model
        .receive_record(Value::Map(sym_map(&[("price", Value::Null)])))
        .unwrap();
    assert_eq!(blank.peek("price"), Value::Null);
    assert!(blank.is_set("price"));
}

#[test]
fn registration_leaves_existing_schemas_alone() {
    let registry = fresh_registry();
    let plain = ModelType::create_with("Plain", registry.clone());
    plain
        .declare_field("n", TypeHandle::name("integer"), FieldOptions::new())
        .unwrap();

    let mut before = plain
        .receive_record(Value::Map(sym_map(&[("n", Value::str("1"))])))
        .unwrap();
    registry.register(Arc::new(MoneyStrategy), &[]);
    let mut after = plain
        .receive_record(Value::Map(sym_map(&[("n", Value::str("1"))])))
        .unwrap();
    assert_eq!(before.read("n"), after.read("n"));
}

#[test]
fn resolver_fallback_supplies_missing_names() {
    let registry = fresh_registry();
    registry.set_resolver(Arc::new(|name| {
        (name == "money").then(|| Arc::new(MoneyStrategy) as Arc<dyn CoercionStrategy>)
    }));
    let model = priced_model(&registry);

    let mut listing = model
        .receive_record(Value::Map(sym_map(&[("price", Value::Float(1.25))])))
        .unwrap();
    assert_eq!(listing.read("price"), Value::Int(125));
}

#[test]
fn applied_handles_skip_the_table() {
    let registry = fresh_registry();
    let model = ModelType::create_with("Shouty", registry);
    model
        .declare_field(
            "word",
            TypeHandle::applied(|v| match v {
                Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
                other => Err(CoerceError::mismatch(&other, "shout", "not text")),
            }),
            FieldOptions::new(),
        )
        .unwrap();

    let mut record = model
        .receive_record(Value::Map(sym_map(&[("word", Value::str("quiet"))])))
        .unwrap();
    assert_eq!(record.read("word"), Value::str("QUIET"));
}
