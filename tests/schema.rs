use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tagvet::{schema::annotate, Field, FieldKind, UnknownFields, Validator};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Listing {
    title: String,
    price: f64,
    contact: String,
    state: String,
    tags: Vec<String>,
}

fn listings() -> Validator<Listing> {
    Validator::<Listing>::builder()
        .field(Field::string("title").tag("required,min=3,max=80"))
        .field(Field::float("price").tag("gt=0,lte=1000000"))
        .field(Field::string("contact").tag("email"))
        .field(Field::string("state").tag("oneof=draft live sold"))
        .field(Field::seq("tags", FieldKind::String).tag("max=10,dive,min=1"))
        .build()
        .unwrap()
}

#[test]
fn constraints_become_schema_keywords() {
    let schema = listings().schema();
    let props = &schema["properties"];

    assert_eq!(props["title"]["type"], json!("string"));
    assert_eq!(props["title"]["minLength"], json!(3));
    assert_eq!(props["title"]["maxLength"], json!(80));

    assert_eq!(props["price"]["exclusiveMinimum"], json!(0.0));
    assert_eq!(props["price"]["maximum"], json!(1000000.0));

    assert_eq!(props["contact"]["format"], json!("email"));
    assert_eq!(props["state"]["enum"], json!(["draft", "live", "sold"]));

    assert_eq!(props["tags"]["type"], json!("array"));
    assert_eq!(props["tags"]["maxItems"], json!(10));
    assert_eq!(props["tags"]["items"]["minLength"], json!(1));

    assert_eq!(schema["required"], json!(["title"]));
}

#[test]
fn schema_bytes_match_the_document() {
    let v = listings();
    let bytes = v.schema_bytes();
    let reparsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(&reparsed, v.schema().as_ref());
}

#[test]
fn schema_is_memoized_per_validator() {
    let v = listings();
    let first = v.schema();
    let second = v.schema();
    assert!(Arc::ptr_eq(&first, &second));
    let rb1 = v.schema_with_refs_bytes();
    let rb2 = v.schema_with_refs_bytes();
    assert!(Arc::ptr_eq(&rb1, &rb2));
}

#[test]
fn reject_policy_closes_the_schema() {
    let open = listings().schema();
    assert_eq!(open["additionalProperties"], json!(true));

    let closed = Validator::<Listing>::builder()
        .field(Field::string("title"))
        .field(Field::float("price"))
        .field(Field::string("contact"))
        .field(Field::string("state"))
        .field(Field::seq("tags", FieldKind::String))
        .unknown_fields(UnknownFields::Reject)
        .build()
        .unwrap();
    assert_eq!(closed.schema()["additionalProperties"], json!(false));
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Order {
    id: String,
    shipping: Address,
    billing: Address,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Address {
    city: String,
    zip: String,
}

fn orders() -> Validator<Order> {
    let addresses = Validator::<Address>::builder()
        .field(Field::string("city").tag("required,min=1"))
        .field(Field::string("zip").tag("pattern=^[0-9]{5}$"))
        .build()
        .unwrap();
    Validator::<Order>::builder()
        .field(Field::string("id").tag("required,uuid"))
        .field(Field::record("shipping", &addresses))
        .field(Field::record("billing", &addresses))
        .build()
        .unwrap()
}

#[test]
fn nested_records_inline_in_plain_form() {
    let schema = orders().schema();
    assert_eq!(
        schema["properties"]["shipping"]["properties"]["zip"]["pattern"],
        json!("^[0-9]{5}$")
    );
}

#[test]
fn reference_form_uses_defs() {
    let schema = orders().schema_with_refs();
    assert_eq!(
        schema["properties"]["shipping"]["$ref"],
        json!("#/$defs/Address")
    );
    assert_eq!(
        schema["properties"]["billing"]["$ref"],
        json!("#/$defs/Address")
    );
    // The shared definition is emitted once, fully annotated.
    assert_eq!(
        schema["$defs"]["Address"]["properties"]["zip"]["pattern"],
        json!("^[0-9]{5}$")
    );
}

#[test]
fn annotate_decorates_an_external_schema() {
    // A base document rendered elsewhere: the annotator only writes
    // keywords onto nodes whose names line up with the plan.
    let mut external = json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "description": "given"},
            "price": {"type": "number"}
        }
    });
    annotate(listings().plan(), &mut external);
    assert_eq!(external["properties"]["title"]["minLength"], json!(3));
    // Pre-existing metadata is left alone.
    assert_eq!(external["properties"]["title"]["description"], json!("given"));
    assert_eq!(external["properties"]["price"]["exclusiveMinimum"], json!(0.0));
}

#[test]
fn default_literal_lands_in_the_schema() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Conf {
        port: i64,
    }
    let v = Validator::<Conf>::builder()
        .field(Field::int("port").tag("default=8080"))
        .build()
        .unwrap();
    assert_eq!(v.schema()["properties"]["port"]["default"], json!(8080));
}
