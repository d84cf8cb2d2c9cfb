use serde::{Deserialize, Serialize};
use serde_json::json;
use tagvet::{Field, FieldKind, MissingFields, UnknownFields, Validator};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    host: String,
    port: i64,
    retries: i64,
    label: Option<String>,
}

fn settings() -> Validator<Settings> {
    Validator::<Settings>::builder()
        .field(Field::string("host").tag("required,min=1"))
        .field(Field::int("port").tag("default=8080,gt=0"))
        .field(Field::int("retries").tag("gte=0"))
        .field(Field::string("label").optional())
        .build()
        .unwrap()
}

#[test]
fn absent_field_takes_static_default() {
    let (s, outcome) = settings().decode(r#"{"host":"db1"}"#);
    assert!(outcome.is_ok());
    assert_eq!(s.port, 8080);
    assert_eq!(s.retries, 0);
    assert_eq!(s.label, None);
}

#[test]
fn explicit_zero_is_not_missing() {
    // port present with an explicit value keeps it; the default only
    // fills true absence. Zero then fails gt=0 — it was really sent.
    let (s, outcome) = settings().decode(r#"{"host":"db1","port":0}"#);
    assert_eq!(s.port, 0);
    let err = outcome.unwrap_err();
    assert_eq!(err.errors[0].path_string(), "port");
    assert_eq!(err.errors[0].message, "must be greater than 0");
}

#[test]
fn absent_required_field_errors_in_strict_mode() {
    let (s, outcome) = settings().decode(r#"{"port":9000}"#);
    assert_eq!(s.host, "");
    let err = outcome.unwrap_err();
    assert_eq!(err.errors[0].path_string(), "host");
    assert_eq!(err.errors[0].code.key(), "required");
    assert_eq!(err.errors[0].message, "is required");
}

#[test]
fn present_null_satisfies_requiredness() {
    // Presence, not non-null-ness, is what required enforces. The
    // zero-value then still runs through ordinary constraints.
    let (s, outcome) = settings().decode(r#"{"host":null,"port":1}"#);
    assert_eq!(s.host, "");
    let err = outcome.unwrap_err();
    assert!(err.errors.iter().all(|e| e.code.key() != "required"));
}

#[test]
fn null_on_optional_field_stays_empty() {
    let (s, outcome) = settings().decode(r#"{"host":"db1","label":null}"#);
    assert!(outcome.is_ok());
    assert_eq!(s.label, None);
}

#[test]
fn present_optional_field_decodes() {
    let (s, outcome) = settings().decode(r#"{"host":"db1","label":"primary"}"#);
    assert!(outcome.is_ok());
    assert_eq!(s.label.as_deref(), Some("primary"));
}

#[test]
fn lenient_mode_tolerates_absent_required_fields() {
    let v = Validator::<Settings>::builder()
        .field(Field::string("host").tag("required,min=1"))
        .field(Field::int("port"))
        .field(Field::int("retries"))
        .field(Field::string("label").optional())
        .missing_fields(MissingFields::Lenient)
        .build()
        .unwrap();
    let (s, outcome) = v.decode("{}");
    assert_eq!(s.host, "");
    // Absence tolerated as zero; the zero host still fails min=1, but
    // no "required" error is raised.
    let err = outcome.unwrap_err();
    assert!(err.errors.iter().all(|e| e.code.key() != "required"));
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Job {
    id: String,
    attempts: i64,
}

#[test]
fn default_provider_fills_absence() {
    let v = Validator::<Job>::builder()
        .field(Field::string("id").default_provider(|| Ok(json!("generated-1"))))
        .field(Field::int("attempts"))
        .build()
        .unwrap();
    let (job, outcome) = v.decode(r#"{"attempts":2}"#);
    assert!(outcome.is_ok());
    assert_eq!(job.id, "generated-1");

    let (job, outcome) = v.decode(r#"{"id":"explicit","attempts":2}"#);
    assert!(outcome.is_ok());
    assert_eq!(job.id, "explicit");
}

#[test]
fn failing_default_provider_is_a_field_error() {
    let v = Validator::<Job>::builder()
        .field(Field::string("id").default_provider(|| Err("sequence exhausted".to_string())))
        .field(Field::int("attempts"))
        .build()
        .unwrap();
    let (job, outcome) = v.decode(r#"{"attempts":2}"#);
    assert_eq!(job.id, "");
    let err = outcome.unwrap_err();
    assert_eq!(err.errors[0].path_string(), "id");
    assert!(err.errors[0].message.contains("sequence exhausted"));
}

#[test]
fn type_mismatch_reports_and_returns_partial_instance() {
    let (s, outcome) = settings().decode(r#"{"host":"db1","port":"eighty","retries":3}"#);
    // The mismatched field falls back to its zero value; the rest of
    // the document is still decoded.
    assert_eq!(s.host, "db1");
    assert_eq!(s.port, 0);
    assert_eq!(s.retries, 3);
    let err = outcome.unwrap_err();
    assert_eq!(err.errors[0].code.key(), "invalid_type");
    assert_eq!(err.errors[0].path_string(), "port");
}

#[test]
fn decode_errors_short_circuit_validation() {
    // host would fail min=1, but the type error on port is reported
    // alone: decoding problems come back before constraint checks run.
    let (_, outcome) = settings().decode(r#"{"host":"","port":[1]}"#);
    let err = outcome.unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.errors[0].code.key(), "invalid_type");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (s, outcome) = settings().decode("{not json");
    assert_eq!(s.host, "");
    let err = outcome.unwrap_err();
    assert_eq!(err.errors[0].code.key(), "parse_error");
}

#[test]
fn accepts_bytes_and_values() {
    let bytes: &[u8] = br#"{"host":"db1"}"#;
    let (s, outcome) = settings().decode(bytes);
    assert!(outcome.is_ok());
    assert_eq!(s.host, "db1");

    let doc = json!({"host": "db2", "port": 9090});
    let (s, outcome) = settings().decode_value(&doc);
    assert!(outcome.is_ok());
    assert_eq!(s.host, "db2");
    assert_eq!(s.port, 9090);
}

#[test]
fn unknown_keys_are_ignored_by_default() {
    let (s, outcome) = settings().decode(r#"{"host":"db1","flavor":"blue"}"#);
    assert!(outcome.is_ok());
    assert_eq!(s.host, "db1");
}

#[test]
fn reject_policy_aborts_with_a_single_error() {
    let v = Validator::<Settings>::builder()
        .field(Field::string("host").tag("required,min=1"))
        .field(Field::int("port"))
        .field(Field::int("retries"))
        .field(Field::string("label").optional())
        .unknown_fields(UnknownFields::Reject)
        .build()
        .unwrap();
    // host is also missing, but the unknown key wins alone.
    let (_, outcome) = v.decode(r#"{"flavor":"blue","mode":"fast"}"#);
    let err = outcome.unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.errors[0].code.key(), "unknown_field");
    assert!(err.errors[0].message.contains("flavor"));
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Outer {
    inner: Inner,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    value: i64,
}

#[test]
fn reject_policy_applies_at_depth() {
    let inners = Validator::<Inner>::builder()
        .field(Field::int("value"))
        .build()
        .unwrap();
    let outers = Validator::<Outer>::builder()
        .field(Field::record("inner", &inners))
        .unknown_fields(UnknownFields::Reject)
        .build()
        .unwrap();
    let (_, outcome) = outers.decode(r#"{"inner":{"value":1,"sneaky":true}}"#);
    let err = outcome.unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.errors[0].path_string(), "inner.sneaky");
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Doc {
    title: String,
    sections: Vec<Section>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Section {
    heading: String,
}

#[test]
fn nested_records_decode_recursively() {
    let sections = Validator::<Section>::builder()
        .field(Field::string("heading").tag("required,min=1"))
        .build()
        .unwrap();
    let docs = Validator::<Doc>::builder()
        .field(Field::string("title").tag("required"))
        .field(Field::seq_of("sections", &sections).tag("dive"))
        .build()
        .unwrap();

    let (doc, outcome) = docs.decode(r#"{"title":"T","sections":[{"heading":"A"},{"heading":"B"}]}"#);
    assert!(outcome.is_ok());
    assert_eq!(doc.sections.len(), 2);
    assert_eq!(doc.sections[1].heading, "B");
}

#[test]
fn transforms_mutate_on_decode() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Handle {
        name: String,
    }
    let v = Validator::<Handle>::builder()
        .field(Field::string("name").tag("strip_whitespace,to_lower,min=3"))
        .build()
        .unwrap();
    let (h, outcome) = v.decode(r#"{"name":"  Ada  "}"#);
    assert!(outcome.is_ok());
    assert_eq!(h.name, "ada");
}
