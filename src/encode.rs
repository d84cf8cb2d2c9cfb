//! Serialization with output contexts and extras re-merge.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorCode, ValidationErrors};
use crate::field::CollectionKind;
use crate::plan::Plan;

/// Options for [`Validator::encode`](crate::Validator::encode).
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub(crate) context: Option<String>,
    pub(crate) pretty: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the output context: fields tagged `exclude:<context>` are
    /// omitted from the encoded document.
    pub fn context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Pretty-print the output.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

pub(crate) fn run<T: Serialize>(
    plan: &Plan,
    value: &T,
    extras: Option<&Map<String, Value>>,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, ValidationErrors> {
    let mut doc = serde_json::to_value(value).map_err(|e| {
        ValidationErrors::single(ErrorCode::ParseError, format!("serialization error: {}", e))
    })?;

    if let Some(ctx) = &opts.context {
        strip_excluded(plan, &mut doc, ctx);
    }

    // Captured unknown keys are re-merged so round-tripping preserves
    // unrecognized data; known fields always win a collision.
    if let Some(extras) = extras {
        if let Some(obj) = doc.as_object_mut() {
            for (key, value) in extras {
                if !obj.contains_key(key) {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let bytes = if opts.pretty {
        serde_json::to_vec_pretty(&doc)
    } else {
        serde_json::to_vec(&doc)
    };
    bytes.map_err(|e| {
        ValidationErrors::single(ErrorCode::ParseError, format!("serialization error: {}", e))
    })
}

fn strip_excluded(plan: &Plan, doc: &mut Value, ctx: &str) {
    let obj = match doc.as_object_mut() {
        Some(obj) => obj,
        None => return,
    };
    for field in &plan.fields {
        if field.excluded.iter().any(|c| c == ctx) {
            obj.remove(&field.wire);
            continue;
        }
        let nested = match &field.nested {
            Some(nested) => nested,
            None => continue,
        };
        if let Some(v) = obj.get_mut(&field.wire) {
            match field.collection {
                CollectionKind::None => strip_excluded(nested, v, ctx),
                CollectionKind::Seq => {
                    if let Some(arr) = v.as_array_mut() {
                        for elem in arr {
                            strip_excluded(nested, elem, ctx);
                        }
                    }
                }
                CollectionKind::Map => {
                    if let Some(entries) = v.as_object_mut() {
                        for (_, elem) in entries.iter_mut() {
                            strip_excluded(nested, elem, ctx);
                        }
                    }
                }
            }
        }
    }
}
