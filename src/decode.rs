//! The deserialization executor.
//!
//! Field presence is an explicit tri-state: **Absent** (key not in the
//! document), **Null** (key present, value null) and **Present**. The
//! three drive requiredness, defaults and zero-value fallbacks; an
//! explicit zero value is never confused with a missing key.

use std::ops::{Deref, DerefMut};

use serde_json::{Map, Value};

use crate::error::{value_type_name, ErrorCode, FieldError, PathSegment, ValidationErrors};
use crate::field::{CachedField, DefaultSource, FieldKind};
use crate::plan::{MissingFields, Options, Plan, UnknownFields};

/// A decoded instance together with any unknown keys captured under the
/// capture policy. Dereferences to the instance.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    /// Unknown document keys, kept for lossless re-encoding. Empty
    /// unless the plan uses [`UnknownFields::Capture`].
    pub extras: Map<String, Value>,
}

impl<T: Default> Decoded<T> {
    pub(crate) fn empty() -> Self {
        Self {
            value: T::default(),
            extras: Map::new(),
        }
    }
}

impl<T> Decoded<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Decoded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Decoded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

pub(crate) struct DecodeOutput {
    /// The normalized document: every plan field present, defaults and
    /// transforms applied. This is what the instance is built from and
    /// what validation subsequently runs over.
    pub normalized: Value,
    pub extras: Map<String, Value>,
    pub errors: ValidationErrors,
}

pub(crate) fn run(plan: &Plan, doc: &Value) -> DecodeOutput {
    let mut errors = ValidationErrors::new();
    let mut extras = Map::new();
    let mut path = Vec::new();
    let normalized = match decode_object(
        plan,
        doc,
        &plan.options,
        &mut path,
        &mut errors,
        Some(&mut extras),
    ) {
        Ok(v) => v,
        // Unknown-key rejection aborts the whole document with that one
        // error, discarding anything collected on the way.
        Err(abort) => {
            errors = ValidationErrors {
                errors: vec![abort],
            };
            zero_object(plan)
        }
    };
    DecodeOutput {
        normalized,
        extras,
        errors,
    }
}

fn zero_object(plan: &Plan) -> Value {
    let mut out = Map::new();
    for f in &plan.fields {
        out.insert(f.wire.clone(), zero_value(f));
    }
    Value::Object(out)
}

/// The zero value a field materializes as. Record-kinded fields zero to
/// their nested plan's zero object so the instance can always be built.
fn zero_value(field: &CachedField) -> Value {
    if field.kind.is_optional() {
        return Value::Null;
    }
    match (&field.nested, field.kind.base()) {
        (Some(nested), FieldKind::Struct) => zero_object(nested),
        _ => field.kind.zero(),
    }
}

fn decode_object(
    plan: &Plan,
    doc: &Value,
    opts: &Options,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
    extras: Option<&mut Map<String, Value>>,
) -> Result<Value, FieldError> {
    let obj = match doc.as_object() {
        Some(obj) => obj,
        None => {
            errors.push_at(
                path.clone(),
                ErrorCode::InvalidType {
                    expected: "object".to_string(),
                    received: value_type_name(doc).to_string(),
                },
                format!("expected object, got {}", value_type_name(doc)),
                Some(doc),
            );
            return Ok(zero_object(plan));
        }
    };

    let known = |key: &str| plan.fields.iter().any(|f| f.wire == key);
    match opts.unknown {
        UnknownFields::Ignore => {}
        UnknownFields::Reject => {
            for key in obj.keys() {
                if !known(key) {
                    let mut full = path.clone();
                    full.push(PathSegment::Field(key.clone()));
                    return Err(FieldError {
                        path: full,
                        code: ErrorCode::UnknownField,
                        message: format!("unknown field \"{}\"", key),
                        value: None,
                    });
                }
            }
        }
        UnknownFields::Capture => {
            // Captured at the document root only; a nested typed
            // instance has no extras slot to carry them.
            if let Some(extras) = extras {
                for (key, value) in obj {
                    if !known(key) {
                        extras.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    let mut out = Map::new();
    for field in &plan.fields {
        path.push(PathSegment::Field(field.wire.clone()));
        let decoded = match obj.get(&field.wire) {
            // Absent: default, requiredness, or the zero value.
            None => absent_value(field, opts, path, errors),
            // Present but null satisfies requiredness; optional fields
            // stay empty, everything else keeps its zero value.
            Some(Value::Null) => {
                if field.kind.is_optional() {
                    Value::Null
                } else {
                    zero_value(field)
                }
            }
            Some(v) => decode_present(field, v, opts, path, errors)?,
        };
        out.insert(field.wire.clone(), decoded);
        path.pop();
    }

    Ok(Value::Object(out))
}

fn absent_value(
    field: &CachedField,
    opts: &Options,
    path: &[PathSegment],
    errors: &mut ValidationErrors,
) -> Value {
    match &field.default {
        Some(DefaultSource::Literal(lit)) => lit.clone(),
        Some(DefaultSource::Provider(provider)) => match provider() {
            Ok(v) => v,
            Err(msg) => {
                errors.push_at(
                    path.to_vec(),
                    ErrorCode::ValidationFailed,
                    format!("default provider failed: {}", msg),
                    None,
                );
                zero_value(field)
            }
        },
        None => {
            if field.required && opts.missing == MissingFields::Strict {
                errors.push_at(path.to_vec(), ErrorCode::Required, "is required", None);
            }
            zero_value(field)
        }
    }
}

fn decode_present(
    field: &CachedField,
    v: &Value,
    opts: &Options,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
) -> Result<Value, FieldError> {
    if !field.kind.accepts(v) {
        push_type_mismatch(&field.kind, v, path, errors);
        return Ok(zero_value(field));
    }

    match field.kind.base() {
        FieldKind::String => {
            let mut s = match v.as_str() {
                Some(s) => s.to_string(),
                None => return Ok(v.clone()),
            };
            for t in &field.transforms {
                s = t.apply(&s);
            }
            Ok(Value::String(s))
        }
        FieldKind::Struct => match &field.nested {
            Some(nested) => decode_object(nested, v, opts, path, errors, None),
            None => Ok(v.clone()),
        },
        FieldKind::Seq(elem_kind) => {
            let arr = match v.as_array() {
                Some(arr) => arr,
                None => return Ok(v.clone()),
            };
            let mut out = Vec::with_capacity(arr.len());
            for (i, elem) in arr.iter().enumerate() {
                path.push(PathSegment::Index(i));
                let decoded = decode_element(field, elem_kind, elem, opts, path, errors);
                path.pop();
                out.push(decoded?);
            }
            Ok(Value::Array(out))
        }
        FieldKind::Map(_, value_kind) => {
            let entries = match v.as_object() {
                Some(entries) => entries,
                None => return Ok(v.clone()),
            };
            let mut out = Map::new();
            for (key, val) in entries {
                path.push(PathSegment::Key(key.clone()));
                let decoded = decode_element(field, value_kind, val, opts, path, errors);
                path.pop();
                out.insert(key.clone(), decoded?);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(v.clone()),
    }
}

fn decode_element(
    field: &CachedField,
    kind: &FieldKind,
    elem: &Value,
    opts: &Options,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
) -> Result<Value, FieldError> {
    if !kind.accepts(elem) {
        push_type_mismatch(kind, elem, path, errors);
        if let (Some(nested), FieldKind::Struct) = (&field.nested, kind.base()) {
            return Ok(zero_object(nested));
        }
        return Ok(kind.zero());
    }
    if let Some(s) = elem.as_str() {
        let mut s = s.to_string();
        for t in &field.elem_transforms {
            s = t.apply(&s);
        }
        return Ok(Value::String(s));
    }
    if matches!(kind.base(), FieldKind::Struct) {
        if let Some(nested) = &field.nested {
            return decode_object(nested, elem, opts, path, errors, None);
        }
    }
    Ok(elem.clone())
}

fn push_type_mismatch(
    kind: &FieldKind,
    v: &Value,
    path: &[PathSegment],
    errors: &mut ValidationErrors,
) {
    let expected = kind.json_type_name();
    errors.push_at(
        path.to_vec(),
        ErrorCode::InvalidType {
            expected: expected.to_string(),
            received: value_type_name(v).to_string(),
        },
        format!("expected {}, got {}", expected, value_type_name(v)),
        Some(v),
    );
}
