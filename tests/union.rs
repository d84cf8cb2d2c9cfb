use serde::{Deserialize, Serialize};
use tagvet::{ConfigError, Field, UnionOptions, Validator};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Cat {
    name: String,
    lives: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Dog {
    name: String,
    good_boy: bool,
}

#[derive(Debug)]
enum Pet {
    Cat(Cat),
    Dog(Dog),
}

fn cats() -> Validator<Cat> {
    Validator::<Cat>::builder()
        .field(Field::string("name").tag("required,min=1"))
        .field(Field::int("lives").tag("gte=1,lte=9"))
        .build()
        .unwrap()
}

fn dogs() -> Validator<Dog> {
    Validator::<Dog>::builder()
        .field(Field::string("name").tag("required,min=1"))
        .field(Field::boolean("good_boy"))
        .build()
        .unwrap()
}

fn pets() -> tagvet::Union<Pet> {
    UnionOptions::new("pet_type")
        .variant("cat", &cats(), Pet::Cat)
        .variant("dog", &dogs(), Pet::Dog)
        .build()
        .unwrap()
}

#[test]
fn routes_on_discriminator_value() {
    let pet = pets()
        .decode(r#"{"pet_type":"cat","name":"W","lives":7}"#)
        .unwrap();
    match pet {
        Pet::Cat(cat) => {
            assert_eq!(cat.name, "W");
            assert_eq!(cat.lives, 7);
        }
        Pet::Dog(_) => panic!("routed to the wrong variant"),
    }

    let pet = pets()
        .decode(r#"{"pet_type":"dog","name":"Rex","good_boy":true}"#)
        .unwrap();
    assert!(matches!(pet, Pet::Dog(_)));
}

#[test]
fn unknown_discriminator_value_fails() {
    let err = pets()
        .decode(r#"{"pet_type":"fox","name":"W"}"#)
        .unwrap_err();
    assert_eq!(err.errors[0].message, "unknown discriminator value \"fox\"");
    assert_eq!(err.errors[0].path_string(), "pet_type");
}

#[test]
fn missing_discriminator_fails_naming_the_field() {
    let err = pets().decode(r#"{"name":"W"}"#).unwrap_err();
    assert_eq!(
        err.errors[0].message,
        "missing discriminator field \"pet_type\""
    );
}

#[test]
fn null_discriminator_counts_as_missing() {
    let err = pets().decode(r#"{"pet_type":null,"name":"W"}"#).unwrap_err();
    assert!(err.errors[0].message.contains("missing discriminator"));
}

#[test]
fn discriminator_matching_is_case_sensitive() {
    let err = pets()
        .decode(r#"{"pet_type":"Cat","name":"W","lives":7}"#)
        .unwrap_err();
    assert!(err.errors[0].message.contains("unknown discriminator"));
}

#[test]
fn variant_validation_errors_propagate() {
    let err = pets()
        .decode(r#"{"pet_type":"cat","name":"W","lives":20}"#)
        .unwrap_err();
    assert_eq!(err.errors[0].path_string(), "lives");
    assert_eq!(err.errors[0].message, "must be 9 or less");
}

#[test]
fn numeric_discriminators_match_canonically() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct V1 {
        value: i64,
    }
    let v1s = Validator::<V1>::builder()
        .field(Field::int("value"))
        .build()
        .unwrap();
    let versions = UnionOptions::new("version")
        .variant("1", &v1s, |v: V1| v.value)
        .build()
        .unwrap();
    let out = versions.decode(r#"{"version":1,"value":42}"#).unwrap();
    assert_eq!(out, 42);
}

#[test]
fn validate_dispatches_on_runtime_type() {
    let cat = Cat {
        name: "W".into(),
        lives: 7,
    };
    assert!(pets().validate_any(&cat).is_ok());

    let bad_cat = Cat {
        name: "W".into(),
        lives: 20,
    };
    let err = pets().validate_any(&bad_cat).unwrap_err();
    assert_eq!(err.errors[0].path_string(), "lives");
}

#[test]
fn unregistered_type_is_an_error() {
    let err = pets().validate_any(&"just a string").unwrap_err();
    assert!(err.errors[0].message.contains("not a registered union variant"));
}

#[test]
fn duplicate_discriminator_values_abort_construction() {
    let result = UnionOptions::<Pet>::new("pet_type")
        .variant("cat", &cats(), Pet::Cat)
        .variant("cat", &dogs(), |d| Pet::Dog(d))
        .build();
    assert!(matches!(
        result,
        Err(ConfigError::DuplicateDiscriminator { .. })
    ));
}

#[test]
fn empty_discriminator_name_aborts_construction() {
    let result = UnionOptions::<Pet>::new("")
        .variant("cat", &cats(), Pet::Cat)
        .build();
    assert!(matches!(result, Err(ConfigError::EmptyDiscriminator)));
}
