//! Property-based tests: the executors never panic on arbitrary JSON
//! documents, and decoding always hands back an instance.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tagvet::{Field, FieldKind, UnionOptions, Validator};

fn arb_json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| serde_json::json!(f)),
        any::<i64>().prop_map(|i| serde_json::json!(i)),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..6)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Target {
    name: String,
    count: i64,
    ratio: f64,
    enabled: bool,
    tags: Vec<String>,
    note: Option<String>,
}

fn targets() -> Validator<Target> {
    Validator::<Target>::builder()
        .field(Field::string("name").tag("required,min=2,max=40,strip_whitespace"))
        .field(Field::int("count").tag("gte=0,lte=1000"))
        .field(Field::float("ratio").tag("gt=0,lt=1"))
        .field(Field::boolean("enabled"))
        .field(Field::seq("tags", FieldKind::String).tag("max=4,dive,min=1"))
        .field(Field::string("note").optional())
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn decode_never_panics(doc in arb_json_value()) {
        let v = targets();
        let (_, _) = v.decode_value(&doc);
    }

    #[test]
    fn decode_from_arbitrary_text_never_panics(text in ".*") {
        let v = targets();
        let (_, _) = v.decode(text.as_str());
    }

    #[test]
    fn decoded_instance_is_always_returned(doc in arb_json_value()) {
        let v = targets();
        let (first, _) = v.decode_value(&doc);
        let (second, _) = v.decode_value(&doc);
        // Fields are always materialized, worst case at their zero
        // values, and identically so across runs.
        prop_assert_eq!(first.count, second.count);
        prop_assert_eq!(&first.name, &second.name);
    }

    #[test]
    fn union_dispatch_never_panics(doc in arb_json_value()) {
        let pets = UnionOptions::new("kind")
            .variant("target", &targets(), |t: Target| t)
            .build()
            .unwrap();
        let _ = pets.decode(&doc);
    }

    #[test]
    fn validation_is_deterministic(doc in arb_json_value()) {
        let v = targets();
        let (first, a) = v.decode_value(&doc);
        let (_, b) = v.decode_value(&doc);
        match (&a, &b) {
            (Ok(()), Ok(())) => {}
            (Err(x), Err(y)) => prop_assert_eq!(x.len(), y.len()),
            _ => prop_assert!(false, "outcome changed between identical runs"),
        }
        // Re-validating the decoded instance never panics either.
        let _ = v.validate(&first.value);
    }
}
