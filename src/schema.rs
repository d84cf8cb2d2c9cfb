//! Schema derivation and annotation.
//!
//! The plan's shape renders to a JSON-Schema-like document; constraint
//! metadata is written on as keywords by [`annotate`], which also works
//! against an externally-rendered base schema as long as its property
//! names line up with the plan's wire names.
//!
//! Derived documents are memoized per validator in four independent
//! slots (plain / plain bytes / reference-style / its bytes) under a
//! read-mostly lock with a double check on the write path. Each slot
//! remembers the registry epoch it was computed at, so registry
//! mutations invalidate it lazily.

use std::sync::{Arc, RwLock};

use serde_json::{json, Map, Value};

use crate::constraint::{Check, Constraint};
use crate::field::{CachedField, CollectionKind, DefaultSource, FieldKind};
use crate::plan::{Plan, UnknownFields};
use crate::registry;

type Slot<V> = RwLock<Option<(u64, Arc<V>)>>;

pub(crate) struct SchemaCache {
    plain: Slot<Value>,
    plain_bytes: Slot<Vec<u8>>,
    refs: Slot<Value>,
    refs_bytes: Slot<Vec<u8>>,
}

impl SchemaCache {
    pub(crate) fn new() -> Self {
        Self {
            plain: RwLock::new(None),
            plain_bytes: RwLock::new(None),
            refs: RwLock::new(None),
            refs_bytes: RwLock::new(None),
        }
    }

    pub(crate) fn plain(&self, plan: &Plan) -> Arc<Value> {
        cached(&self.plain, || document(plan))
    }

    pub(crate) fn plain_bytes(&self, plan: &Plan) -> Arc<Vec<u8>> {
        cached(&self.plain_bytes, || {
            serde_json::to_vec(&document(plan)).unwrap_or_default()
        })
    }

    pub(crate) fn refs(&self, plan: &Plan) -> Arc<Value> {
        cached(&self.refs, || document_with_refs(plan))
    }

    pub(crate) fn refs_bytes(&self, plan: &Plan) -> Arc<Vec<u8>> {
        cached(&self.refs_bytes, || {
            serde_json::to_vec(&document_with_refs(plan)).unwrap_or_default()
        })
    }
}

/// Double-checked read-mostly memoization: readers take the shared lock
/// and return a hit; on a miss the writer lock is taken and the slot
/// re-checked before computing, so a concurrent racer's work is reused.
fn cached<V>(slot: &Slot<V>, build: impl FnOnce() -> V) -> Arc<V> {
    let epoch = registry::epoch();
    {
        let guard = slot.read().expect("schema cache poisoned");
        if let Some((cached_epoch, value)) = &*guard {
            if *cached_epoch == epoch {
                return Arc::clone(value);
            }
        }
    }
    let mut guard = slot.write().expect("schema cache poisoned");
    if let Some((cached_epoch, value)) = &*guard {
        if *cached_epoch == epoch {
            return Arc::clone(value);
        }
    }
    let value = Arc::new(build());
    *guard = Some((epoch, Arc::clone(&value)));
    value
}

/// The annotated plain-form schema document for a plan.
pub(crate) fn document(plan: &Plan) -> Value {
    let mut doc = base_document(plan);
    annotate(plan, &mut doc);
    doc
}

/// The bare shape of a plan, without constraint keywords.
fn base_document(plan: &Plan) -> Value {
    let mut props = Map::new();
    let mut required: Vec<Value> = Vec::new();
    for field in &plan.fields {
        props.insert(field.wire.clone(), shape_node(field));
        if field.required {
            required.push(Value::String(field.wire.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": Value::Object(props),
        "required": required,
        "additionalProperties": plan.options.unknown != UnknownFields::Reject,
    })
}

fn shape_node(field: &CachedField) -> Value {
    kind_node(&field.kind, field.nested.as_deref())
}

fn kind_node(kind: &FieldKind, nested: Option<&Plan>) -> Value {
    match kind.base() {
        FieldKind::Any => json!({}),
        FieldKind::Struct => match nested {
            Some(plan) => base_document(plan),
            None => json!({"type": "object"}),
        },
        FieldKind::Seq(elem) => json!({
            "type": "array",
            "items": kind_node(elem, nested),
        }),
        FieldKind::Map(_, value) => json!({
            "type": "object",
            "additionalProperties": kind_node(value, nested),
        }),
        scalar => json!({"type": scalar.json_type_name()}),
    }
}

/// Write constraint-derived keywords onto a pre-rendered schema tree.
///
/// The tree's `properties` entries are matched by wire name; nodes the
/// schema does not have are skipped rather than invented. Dive
/// constraints land on `items` (sequences) or `additionalProperties`
/// (maps); key constraints land on `propertyNames`.
pub fn annotate(plan: &Plan, schema: &mut Value) {
    let props = match schema
        .as_object_mut()
        .and_then(|obj| obj.get_mut("properties"))
        .and_then(Value::as_object_mut)
    {
        Some(props) => props,
        None => return,
    };
    for field in &plan.fields {
        let node = match props.get_mut(&field.wire) {
            Some(node) => node,
            None => continue,
        };
        apply_keywords(node, &field.constraints, &field.kind);
        if let Some(DefaultSource::Literal(lit)) = &field.default {
            if let Some(obj) = node.as_object_mut() {
                obj.insert("default".to_string(), lit.clone());
            }
        }
        if field.dive {
            let elem_kind = field.kind.elem_kind().cloned().unwrap_or(FieldKind::Any);
            let elem_slot = match field.collection {
                CollectionKind::Seq => "items",
                CollectionKind::Map => "additionalProperties",
                CollectionKind::None => continue,
            };
            if !field.key_constraints.is_empty() {
                if let Some(obj) = node.as_object_mut() {
                    let names = obj
                        .entry("propertyNames".to_string())
                        .or_insert_with(|| json!({"type": "string"}));
                    apply_keywords(names, &field.key_constraints, &FieldKind::String);
                }
            }
            if let Some(elem_node) = node.as_object_mut().and_then(|obj| obj.get_mut(elem_slot)) {
                apply_keywords(elem_node, &field.elem_constraints, &elem_kind);
                if let Some(nested) = &field.nested {
                    annotate(nested, elem_node);
                }
            }
        } else if let Some(nested) = &field.nested {
            match field.collection {
                CollectionKind::None => annotate(nested, node),
                CollectionKind::Seq => {
                    if let Some(elem) = node.as_object_mut().and_then(|o| o.get_mut("items")) {
                        annotate(nested, elem);
                    }
                }
                CollectionKind::Map => {
                    if let Some(elem) = node
                        .as_object_mut()
                        .and_then(|o| o.get_mut("additionalProperties"))
                    {
                        annotate(nested, elem);
                    }
                }
            }
        }
    }
}

fn apply_keywords(node: &mut Value, constraints: &[Constraint], kind: &FieldKind) {
    let obj = match node.as_object_mut() {
        Some(obj) => obj,
        None => return,
    };
    let (min_len_kw, max_len_kw) = match kind.base() {
        FieldKind::Seq(_) => ("minItems", "maxItems"),
        FieldKind::Map(..) => ("minProperties", "maxProperties"),
        _ => ("minLength", "maxLength"),
    };
    for c in constraints {
        match &c.check {
            Check::MinLen(n) => {
                obj.insert(min_len_kw.to_string(), json!(n));
            }
            Check::MaxLen(n) => {
                obj.insert(max_len_kw.to_string(), json!(n));
            }
            Check::ExactLen(n) => {
                obj.insert(min_len_kw.to_string(), json!(n));
                obj.insert(max_len_kw.to_string(), json!(n));
            }
            Check::MinValue(n) | Check::Gte(n) => {
                obj.insert("minimum".to_string(), json!(n));
            }
            Check::MaxValue(n) | Check::Lte(n) => {
                obj.insert("maximum".to_string(), json!(n));
            }
            Check::Gt(n) => {
                obj.insert("exclusiveMinimum".to_string(), json!(n));
            }
            Check::Lt(n) => {
                obj.insert("exclusiveMaximum".to_string(), json!(n));
            }
            Check::Email => {
                obj.insert("format".to_string(), json!("email"));
            }
            Check::Url => {
                obj.insert("format".to_string(), json!("uri"));
            }
            Check::Uuid => {
                obj.insert("format".to_string(), json!("uuid"));
            }
            Check::Ipv4 => {
                obj.insert("format".to_string(), json!("ipv4"));
            }
            Check::Ipv6 => {
                obj.insert("format".to_string(), json!("ipv6"));
            }
            Check::Pattern(re) => {
                obj.insert("pattern".to_string(), json!(re.as_str()));
            }
            Check::OneOf(values) => {
                obj.insert("enum".to_string(), json!(values));
            }
            Check::EqCanon(v) => {
                obj.insert("const".to_string(), json!(v));
            }
            Check::Unique => {
                if matches!(kind.base(), FieldKind::Seq(_)) {
                    obj.insert("uniqueItems".to_string(), json!(true));
                }
            }
            _ => {}
        }
    }
}

/// The reference-style document: nested records become `$defs` entries
/// referenced via `$ref`.
pub(crate) fn document_with_refs(plan: &Plan) -> Value {
    let mut defs = Map::new();
    let mut root = object_with_refs(plan, &mut defs);
    if !defs.is_empty() {
        if let Some(obj) = root.as_object_mut() {
            obj.insert("$defs".to_string(), Value::Object(defs));
        }
    }
    root
}

fn object_with_refs(plan: &Plan, defs: &mut Map<String, Value>) -> Value {
    let mut props = Map::new();
    let mut required: Vec<Value> = Vec::new();
    for field in &plan.fields {
        let mut node = match (&field.nested, field.collection) {
            (Some(nested), CollectionKind::None) => ref_node(nested, defs),
            (Some(nested), CollectionKind::Seq) => {
                json!({"type": "array", "items": ref_node(nested, defs)})
            }
            (Some(nested), CollectionKind::Map) => {
                json!({"type": "object", "additionalProperties": ref_node(nested, defs)})
            }
            (None, _) => {
                let mut node = shape_node(field);
                apply_field_keywords(field, &mut node);
                node
            }
        };
        if field.nested.is_some() {
            apply_field_keywords(field, &mut node);
        }
        props.insert(field.wire.clone(), node);
        if field.required {
            required.push(Value::String(field.wire.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": Value::Object(props),
        "required": required,
        "additionalProperties": plan.options.unknown != UnknownFields::Reject,
    })
}

fn ref_node(plan: &Plan, defs: &mut Map<String, Value>) -> Value {
    if !defs.contains_key(&plan.name) {
        // Reserve the key first so sibling fields of the same record
        // type do not rebuild it.
        defs.insert(plan.name.clone(), Value::Null);
        let built = object_with_refs(plan, defs);
        defs.insert(plan.name.clone(), built);
    }
    json!({"$ref": format!("#/$defs/{}", plan.name)})
}

/// Field-level keywords for the reference-style walk, where a nested
/// node is a `$ref` wrapper and only container keywords apply.
fn apply_field_keywords(field: &CachedField, node: &mut Value) {
    apply_keywords(node, &field.constraints, &field.kind);
    if field.dive {
        let elem_kind = field.kind.elem_kind().cloned().unwrap_or(FieldKind::Any);
        let elem_slot = match field.collection {
            CollectionKind::Seq => "items",
            CollectionKind::Map => "additionalProperties",
            CollectionKind::None => return,
        };
        if !field.key_constraints.is_empty() {
            if let Some(obj) = node.as_object_mut() {
                let names = obj
                    .entry("propertyNames".to_string())
                    .or_insert_with(|| json!({"type": "string"}));
                apply_keywords(names, &field.key_constraints, &FieldKind::String);
            }
        }
        if let Some(elem_node) = node.as_object_mut().and_then(|obj| obj.get_mut(elem_slot)) {
            apply_keywords(elem_node, &field.elem_constraints, &elem_kind);
        }
    }
    if let Some(DefaultSource::Literal(lit)) = &field.default {
        if let Some(obj) = node.as_object_mut() {
            obj.insert("default".to_string(), lit.clone());
        }
    }
}
