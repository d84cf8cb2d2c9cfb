use serde::{Deserialize, Serialize};
use tagvet::{Field, Validator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Form {
    username: String,
    email: String,
    website: String,
}

fn forms() -> Validator<Form> {
    Validator::<Form>::builder()
        .field(Field::string("username").tag("required,min=3"))
        .field(Field::string("email").tag("required,email"))
        .field(Field::string("website").tag("url"))
        .build()
        .unwrap()
}

#[test]
fn validate_fields_checks_only_the_named_fields() {
    let f = Form {
        username: "ada".into(),
        email: "broken".into(),
        website: "also broken".into(),
    };
    // Only username is inspected; its value is fine.
    assert!(forms().validate_fields(&f, &["username"]).is_ok());

    let err = forms().validate_fields(&f, &["email"]).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.errors[0].path_string(), "email");
}

#[test]
fn validate_fields_enforces_requiredness_on_selection() {
    // Partial validation is an explicit entry point, so a zero-valued
    // required field among the selected ones is a violation — unlike
    // whole-instance validate, which leaves requiredness to decoding.
    let f = Form::default();
    let err = forms().validate_fields(&f, &["username"]).unwrap_err();
    assert_eq!(err.errors[0].code.key(), "required");

    assert!(forms().validate(&Form {
        username: "ada".into(),
        email: "a@b.co".into(),
        website: "https://ok.example".into(),
    }).is_ok());
}

#[test]
fn validate_except_skips_the_named_fields() {
    let f = Form {
        username: "ada".into(),
        email: "broken".into(),
        website: "https://ok.example".into(),
    };
    assert!(forms().validate_except(&f, &["email"]).is_ok());
    let err = forms().validate_except(&f, &["website"]).unwrap_err();
    assert_eq!(err.errors[0].path_string(), "email");
}

#[test]
fn validate_is_idempotent_and_does_not_mutate() {
    let f = Form {
        username: "  Ada  ".into(),
        email: "a@b.co".into(),
        website: String::new(),
    };
    let v = Validator::<Form>::builder()
        .field(Field::string("username").tag("strip_whitespace"))
        .field(Field::string("email"))
        .field(Field::string("website"))
        .build()
        .unwrap();

    let before = f.clone();
    let first = v.validate(&f);
    let second = v.validate(&f);
    // Transforms only check here, never mutate; repeated runs agree.
    assert!(first.is_err());
    assert!(second.is_err());
    assert_eq!(f, before);
    assert_eq!(
        first.unwrap_err().errors[0].message,
        "must not have leading or trailing whitespace"
    );
}

#[test]
fn empty_error_lists_never_escape() {
    let f = Form {
        username: "ada".into(),
        email: "a@b.co".into(),
        website: "https://ok.example".into(),
    };
    match forms().validate(&f) {
        Ok(()) => {}
        Err(errors) => {
            // When validation fails there is always at least one entry.
            assert!(!errors.is_empty());
            panic!("expected success");
        }
    }
}

#[test]
fn violations_echo_the_offending_value() {
    let f = Form {
        username: "ab".into(),
        email: "a@b.co".into(),
        website: String::new(),
    };
    let err = forms().validate(&f).unwrap_err();
    assert_eq!(err.errors[0].value, Some(serde_json::json!("ab")));
    let rendered = err.to_string();
    assert!(rendered.contains("username"));
    assert!(rendered.contains("must be at least 3 characters"));
}
