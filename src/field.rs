use std::sync::Arc;

use serde_json::Value;

use crate::constraint::{Constraint, CrossField, Transform};
use crate::plan::{Plan, Validator};

/// The underlying kind of a field, as seen by the tag compiler.
///
/// `min`/`max` resolve against this: length bounds for strings and
/// collections, value bounds otherwise. `Optional` marks a field whose
/// null/absent form is legitimate; constraints look through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    /// Accepts any JSON value; no type check is applied.
    Any,
    /// A nested record; the field carries a nested plan.
    Struct,
    Seq(Box<FieldKind>),
    Map(Box<FieldKind>, Box<FieldKind>),
    Optional(Box<FieldKind>),
}

/// Collection shape of a field, cached on the compiled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    None,
    Seq,
    Map,
}

impl FieldKind {
    /// The kind with optionality stripped.
    pub(crate) fn base(&self) -> &FieldKind {
        match self {
            FieldKind::Optional(inner) => inner.base(),
            other => other,
        }
    }

    pub(crate) fn is_optional(&self) -> bool {
        matches!(self, FieldKind::Optional(_))
    }

    /// Whether `min`/`max`/`len` constrain length rather than value.
    pub(crate) fn is_length_based(&self) -> bool {
        matches!(
            self.base(),
            FieldKind::String | FieldKind::Seq(_) | FieldKind::Map(..)
        )
    }

    pub(crate) fn collection(&self) -> CollectionKind {
        match self.base() {
            FieldKind::Seq(_) => CollectionKind::Seq,
            FieldKind::Map(..) => CollectionKind::Map,
            _ => CollectionKind::None,
        }
    }

    /// Element kind for sequences, value kind for maps.
    pub(crate) fn elem_kind(&self) -> Option<&FieldKind> {
        match self.base() {
            FieldKind::Seq(elem) => Some(elem),
            FieldKind::Map(_, value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn key_kind(&self) -> Option<&FieldKind> {
        match self.base() {
            FieldKind::Map(key, _) => Some(key),
            _ => None,
        }
    }

    /// The zero value a missing field materializes as.
    pub(crate) fn zero(&self) -> Value {
        if self.is_optional() {
            return Value::Null;
        }
        match self.base() {
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Int | FieldKind::Uint => Value::from(0),
            FieldKind::Float => Value::from(0.0),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Any => Value::Null,
            FieldKind::Struct | FieldKind::Map(..) => Value::Object(Default::default()),
            FieldKind::Seq(_) => Value::Array(vec![]),
            FieldKind::Optional(_) => Value::Null,
        }
    }

    /// Whether `value` is the zero value for this kind.
    pub(crate) fn is_zero(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self.base() {
            FieldKind::Bool => value == &Value::Bool(false),
            FieldKind::Int | FieldKind::Uint | FieldKind::Float => {
                value.as_f64() == Some(0.0)
            }
            FieldKind::String => value.as_str() == Some(""),
            FieldKind::Seq(_) => value.as_array().map(|a| a.is_empty()).unwrap_or(false),
            FieldKind::Map(..) | FieldKind::Struct => {
                value.as_object().map(|o| o.is_empty()).unwrap_or(false)
            }
            FieldKind::Any | FieldKind::Optional(_) => false,
        }
    }

    /// Whether a decoded JSON value matches this kind.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Optional(inner) => value.is_null() || inner.accepts(value),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Uint => value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::String => value.is_string(),
            FieldKind::Any => true,
            FieldKind::Struct | FieldKind::Map(..) => value.is_object(),
            FieldKind::Seq(_) => value.is_array(),
        }
    }

    /// The JSON type name used in mismatch messages and schemas.
    pub(crate) fn json_type_name(&self) -> &'static str {
        match self.base() {
            FieldKind::Bool => "boolean",
            FieldKind::Int | FieldKind::Uint => "integer",
            FieldKind::Float => "number",
            FieldKind::String => "string",
            FieldKind::Any => "any",
            FieldKind::Struct | FieldKind::Map(..) => "object",
            FieldKind::Seq(_) => "array",
            FieldKind::Optional(_) => "any",
        }
    }
}

/// A fallible, no-argument default source bound at plan construction.
pub type DefaultProvider = Arc<dyn Fn() -> Result<Value, String> + Send + Sync>;

/// Field descriptor fed to [`Builder::field`](crate::Builder::field).
///
/// # Example
/// ```
/// use tagvet::{Field, FieldKind};
///
/// let name = Field::string("name").tag("required,min=2,max=50");
/// let tags = Field::seq("tags", FieldKind::String).tag("max=5,dive,min=1");
/// let score = Field::float("score").tag("gte=0,lte=10").rename("matchScore");
/// ```
pub struct Field {
    pub(crate) name: String,
    pub(crate) wire: Option<String>,
    pub(crate) kind: FieldKind,
    pub(crate) tag: String,
    pub(crate) nested: Option<Arc<Plan>>,
    pub(crate) default_provider: Option<DefaultProvider>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            wire: None,
            kind,
            tag: String::new(),
            nested: None,
            default_provider: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn uint(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Uint)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    pub fn seq(name: impl Into<String>, elem: FieldKind) -> Self {
        Self::new(name, FieldKind::Seq(Box::new(elem)))
    }

    pub fn map(name: impl Into<String>, key: FieldKind, value: FieldKind) -> Self {
        Self::new(name, FieldKind::Map(Box::new(key), Box::new(value)))
    }

    /// A field holding a nested record, validated by `validator`'s plan.
    pub fn record<U: 'static>(name: impl Into<String>, validator: &Validator<U>) -> Self {
        let mut f = Self::new(name, FieldKind::Struct);
        f.nested = Some(validator.plan_arc());
        f
    }

    /// A sequence of nested records.
    pub fn seq_of<U: 'static>(name: impl Into<String>, validator: &Validator<U>) -> Self {
        let mut f = Self::new(name, FieldKind::Seq(Box::new(FieldKind::Struct)));
        f.nested = Some(validator.plan_arc());
        f
    }

    /// A map whose values are nested records.
    pub fn map_of<U: 'static>(
        name: impl Into<String>,
        key: FieldKind,
        validator: &Validator<U>,
    ) -> Self {
        let mut f = Self::new(
            name,
            FieldKind::Map(Box::new(key), Box::new(FieldKind::Struct)),
        );
        f.nested = Some(validator.plan_arc());
        f
    }

    /// Attach the constraint tag string.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Override the wire (document) name.
    pub fn rename(mut self, wire: impl Into<String>) -> Self {
        self.wire = Some(wire.into());
        self
    }

    /// Mark the field optional: null and absent are legitimate and skip
    /// constraint checks.
    pub fn optional(mut self) -> Self {
        if !self.kind.is_optional() {
            self.kind = FieldKind::Optional(Box::new(self.kind));
        }
        self
    }

    /// Bind a default provider: a no-argument, fallible source consulted
    /// when the field is absent from a decoded document.
    pub fn default_provider<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.default_provider = Some(Arc::new(f));
        self
    }
}

/// Where a missing field's value comes from during decoding.
#[derive(Clone)]
pub(crate) enum DefaultSource {
    Literal(Value),
    Provider(DefaultProvider),
}

/// One compiled entry of a validation plan. Immutable after
/// construction.
pub(crate) struct CachedField {
    pub name: String,
    pub wire: String,
    #[allow(dead_code)]
    pub index: usize,
    pub kind: FieldKind,
    pub collection: CollectionKind,
    pub constraints: Vec<Constraint>,
    pub elem_constraints: Vec<Constraint>,
    pub key_constraints: Vec<Constraint>,
    pub cross_fields: Vec<CrossField>,
    pub required: bool,
    pub dive: bool,
    pub transforms: Vec<Transform>,
    pub elem_transforms: Vec<Transform>,
    pub excluded: Vec<String>,
    pub default: Option<DefaultSource>,
    pub nested: Option<Arc<Plan>>,
}
