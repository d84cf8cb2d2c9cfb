//! The validation executor: applies a compiled plan to a document-form
//! value, aggregating every violation with its fully qualified path.

use serde_json::{Map, Value};

use crate::constraint::{Check, Constraint};
use crate::context::Context;
use crate::error::{value_type_name, ErrorCode, PathSegment, ValidationErrors};
use crate::field::{CachedField, CollectionKind};
use crate::plan::{MissingFields, Plan};
use crate::registry;

/// Root-level field selection for the partial-validation entry points.
pub(crate) struct Filter<'a> {
    pub include: bool,
    pub names: &'a [&'a str],
}

impl Filter<'_> {
    fn selects(&self, field: &CachedField) -> bool {
        let named = self
            .names
            .iter()
            .any(|n| *n == field.name || *n == field.wire);
        if self.include {
            named
        } else {
            !named
        }
    }
}

pub(crate) fn run(
    plan: &Plan,
    value: &Value,
    ctx: &Context,
    filter: Option<&Filter<'_>>,
    errors: &mut ValidationErrors,
) {
    let mut path = Vec::new();
    walk(plan, value, ctx, filter, 0, &mut path, errors);
}

fn walk(
    plan: &Plan,
    value: &Value,
    ctx: &Context,
    filter: Option<&Filter<'_>>,
    depth: usize,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
) {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            errors.push_at(
                path.clone(),
                ErrorCode::InvalidType {
                    expected: "object".to_string(),
                    received: value_type_name(value).to_string(),
                },
                format!("expected object, got {}", value_type_name(value)),
                Some(value),
            );
            return;
        }
    };

    for field in &plan.fields {
        if depth == 0 {
            if let Some(f) = filter {
                if !f.selects(field) {
                    continue;
                }
            }
        }
        let v = obj.get(&field.wire).unwrap_or(&Value::Null);
        path.push(PathSegment::Field(field.wire.clone()));
        check_field(plan, field, v, obj, ctx, depth, filter.is_some(), path, errors);
        path.pop();
    }

    // Whole-record validators run last, their violations merged into the
    // same aggregated list under the registered type name.
    if let Some(type_id) = plan.type_id {
        if let Some(entry) = registry::lookup_struct_validator(type_id) {
            let mut sub = ValidationErrors::new();
            (entry.run)(obj, &mut sub);
            for mut err in sub.errors {
                err.code = ErrorCode::CustomValidation {
                    name: entry.name.clone(),
                };
                let mut full = path.clone();
                full.extend(err.path);
                err.path = full;
                errors.errors.push(err);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_field(
    plan: &Plan,
    field: &CachedField,
    v: &Value,
    parent: &Map<String, Value>,
    ctx: &Context,
    depth: usize,
    partial: bool,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
) {
    // Requiredness is a decode-time concern at the root: a manually
    // constructed instance has no notion of "was present in the source".
    // Nested records (and explicit partial validation) do check it, via
    // the zero value, under strict missing-field mode.
    let strict = plan.options.missing == MissingFields::Strict;
    if field.required && strict && (depth > 0 || partial) && field.kind.is_zero(v) {
        errors.push_at(path.clone(), ErrorCode::Required, "is required", Some(v));
        return;
    }

    if !v.is_null() {
        // Transform directives are pass/fail checks here; they only
        // mutate during decoding.
        if let Some(s) = v.as_str() {
            for t in &field.transforms {
                if !t.holds(s) {
                    errors.push_at(
                        path.clone(),
                        ErrorCode::ValidationFailed,
                        t.violation_message(),
                        Some(v),
                    );
                }
            }
        }
        run_constraints(&field.constraints, v, ctx, path, errors);
    }

    for cf in &field.cross_fields {
        let other_wire = plan
            .fields
            .iter()
            .find(|f| f.name == cf.other)
            .map(|f| f.wire.as_str())
            .unwrap_or(cf.other.as_str());
        let other = parent.get(other_wire).unwrap_or(&Value::Null);
        if !cf.holds(v, other) {
            errors.push_at(
                path.clone(),
                ErrorCode::CrossField {
                    other: cf.other.clone(),
                },
                cf.message.clone(),
                Some(v),
            );
        }
    }

    match field.collection {
        CollectionKind::Seq if field.dive => {
            if let Some(arr) = v.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    check_element(field, elem, ctx, depth, path, errors);
                    path.pop();
                }
            }
        }
        CollectionKind::Map if field.dive => {
            if let Some(entries) = v.as_object() {
                for (key, val) in entries {
                    path.push(PathSegment::Key(key.clone()));
                    let key_value = Value::String(key.clone());
                    run_constraints(&field.key_constraints, &key_value, ctx, path, errors);
                    check_element(field, val, ctx, depth, path, errors);
                    path.pop();
                }
            }
        }
        CollectionKind::None => {
            if let Some(nested) = &field.nested {
                if v.is_object() {
                    walk(nested, v, ctx, None, depth + 1, path, errors);
                }
            }
        }
        // Non-dived collections are not traversed; only their own
        // constraints (length, uniqueness) apply.
        _ => {}
    }
}

fn check_element(
    field: &CachedField,
    elem: &Value,
    ctx: &Context,
    depth: usize,
    path: &mut Vec<PathSegment>,
    errors: &mut ValidationErrors,
) {
    if let Some(s) = elem.as_str() {
        for t in &field.elem_transforms {
            if !t.holds(s) {
                errors.push_at(
                    path.clone(),
                    ErrorCode::ValidationFailed,
                    t.violation_message(),
                    Some(elem),
                );
            }
        }
    }
    run_constraints(&field.elem_constraints, elem, ctx, path, errors);
    if let Some(nested) = &field.nested {
        if elem.is_object() {
            walk(nested, elem, ctx, None, depth + 1, path, errors);
        }
    }
}

fn run_constraints(
    constraints: &[Constraint],
    v: &Value,
    ctx: &Context,
    path: &[PathSegment],
    errors: &mut ValidationErrors,
) {
    for c in constraints {
        match &c.check {
            // Late binding: custom rules resolve through the registry on
            // every call, so registrations after plan construction are
            // honored and unregistered names are skipped.
            Check::Custom { name, param } => {
                if let Some(f) = registry::lookup_validator(name) {
                    if let Err(msg) = f(v, param.as_deref()) {
                        errors.push_at(
                            path.to_vec(),
                            ErrorCode::CustomValidation { name: name.clone() },
                            format!("{}: {}", name, msg),
                            Some(v),
                        );
                    }
                } else if let Some(f) = registry::lookup_context_validator(name) {
                    if let Err(msg) = f(ctx, v, param.as_deref()) {
                        errors.push_at(
                            path.to_vec(),
                            ErrorCode::CustomValidation { name: name.clone() },
                            format!("{}: {}", name, msg),
                            Some(v),
                        );
                    }
                }
            }
            _ => {
                if let Err(code) = c.validate(v) {
                    errors.push_at(path.to_vec(), code, c.message.clone(), Some(v));
                }
            }
        }
    }
}
