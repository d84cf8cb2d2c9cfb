use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::constraint::{self, Check, Constraint, CrossField, Transform};
use crate::context::Context;
use crate::decode::{self, Decoded};
use crate::encode::{self, EncodeOptions};
use crate::error::{ConfigError, ErrorCode, ValidationErrors};
use crate::field::{CachedField, CollectionKind, DefaultSource, Field, FieldKind};
use crate::input::Input;
use crate::registry;
use crate::schema::SchemaCache;
use crate::tag;
use crate::validate::{self, Filter};

/// How unknown document keys are treated during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Drop them silently.
    #[default]
    Ignore,
    /// Abort decoding of the whole document with a single error.
    Reject,
    /// Collect them onto the decoded instance for lossless re-encoding.
    Capture,
}

/// How absent fields are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFields {
    /// An absent required field is an error; defaults may fill gaps.
    #[default]
    Strict,
    /// Absence is tolerated as the zero value. Defaults are rejected at
    /// construction under this mode, since they would silently override
    /// the tolerated absence.
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Options {
    pub unknown: UnknownFields,
    pub missing: MissingFields,
}

/// The compiled, immutable per-type plan: one [`CachedField`] per
/// declared field, in declaration order, plus the decode policy knobs.
///
/// Built once by [`Builder::build`]; shared across all concurrent users
/// of a validator without synchronization.
pub struct Plan {
    pub(crate) name: String,
    pub(crate) type_id: Option<TypeId>,
    pub(crate) fields: Vec<CachedField>,
    pub(crate) options: Options,
}

impl Plan {
    /// The record name used for `$defs` keys in reference-style schemas.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A compiled validator for records of type `T`.
///
/// Construction walks the field descriptors once, parses every tag and
/// pre-builds all constraints; `validate`, `decode` and `schema` calls
/// reuse that plan without re-parsing anything. The validator is cheap
/// to clone and safe to share across threads.
///
/// # Example
/// ```
/// use serde::{Deserialize, Serialize};
/// use tagvet::{Field, Validator};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct User {
///     name: String,
///     email: String,
/// }
///
/// let users = Validator::<User>::builder()
///     .field(Field::string("name").tag("required,min=2,max=50"))
///     .field(Field::string("email").tag("required,email"))
///     .build()
///     .unwrap();
///
/// let (user, outcome) = users.decode(r#"{"name":"Ada","email":"ada@example.com"}"#);
/// assert!(outcome.is_ok());
/// assert_eq!(user.name, "Ada");
/// ```
pub struct Validator<T> {
    plan: Arc<Plan>,
    cache: Arc<SchemaCache>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
            cache: Arc::clone(&self.cache),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Validator<T> {
    /// Start describing the fields of `T`.
    pub fn builder() -> Builder<T> {
        Builder {
            name: None,
            fields: vec![],
            options: Options::default(),
            _marker: PhantomData,
        }
    }
}

impl<T> Validator<T> {
    pub(crate) fn plan_arc(&self) -> Arc<Plan> {
        Arc::clone(&self.plan)
    }

    /// The compiled plan, e.g. for annotating an externally-rendered
    /// schema document via [`schema::annotate`](crate::schema::annotate).
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// The annotated schema document for `T`.
    pub fn schema(&self) -> Arc<Value> {
        self.cache.plain(&self.plan)
    }

    /// The annotated schema document, serialized.
    pub fn schema_bytes(&self) -> Arc<Vec<u8>> {
        self.cache.plain_bytes(&self.plan)
    }

    /// The annotated schema in reference style: nested records become
    /// `$defs` entries referenced by `$ref`.
    pub fn schema_with_refs(&self) -> Arc<Value> {
        self.cache.refs(&self.plan)
    }

    /// The reference-style schema, serialized.
    pub fn schema_with_refs_bytes(&self) -> Arc<Vec<u8>> {
        self.cache.refs_bytes(&self.plan)
    }
}

impl<T: Serialize> Validator<T> {
    /// Validate an existing instance, aggregating every violation.
    ///
    /// The instance is bridged through serde to its document form and
    /// never mutated; transform directives degrade to pass/fail checks
    /// here. Requiredness of root fields is not checked — an in-memory
    /// instance has no notion of "was present in the source document".
    pub fn validate(&self, value: &T) -> Result<(), ValidationErrors> {
        self.validate_filtered(&Context::background(), value, None)
    }

    /// Like [`validate`](Self::validate), with the caller's context made
    /// visible to context-aware validators.
    pub fn validate_with_context(&self, ctx: &Context, value: &T) -> Result<(), ValidationErrors> {
        self.validate_filtered(ctx, value, None)
    }

    /// Validate only the named fields. Required fields among them must
    /// be non-zero.
    pub fn validate_fields(&self, value: &T, include: &[&str]) -> Result<(), ValidationErrors> {
        self.validate_filtered(
            &Context::background(),
            value,
            Some(&Filter {
                include: true,
                names: include,
            }),
        )
    }

    /// Validate all but the named fields.
    pub fn validate_except(&self, value: &T, exclude: &[&str]) -> Result<(), ValidationErrors> {
        self.validate_filtered(
            &Context::background(),
            value,
            Some(&Filter {
                include: false,
                names: exclude,
            }),
        )
    }

    fn validate_filtered(
        &self,
        ctx: &Context,
        value: &T,
        filter: Option<&Filter<'_>>,
    ) -> Result<(), ValidationErrors> {
        let doc = serde_json::to_value(value).map_err(|e| {
            ValidationErrors::single(ErrorCode::ParseError, format!("serialization error: {}", e))
        })?;
        let mut errors = ValidationErrors::new();
        validate::run(&self.plan, &doc, ctx, filter, &mut errors);
        errors.into_result()
    }

    /// Serialize an instance, honoring `exclude:` output contexts.
    pub fn encode(&self, value: &T, opts: &EncodeOptions) -> Result<Vec<u8>, ValidationErrors> {
        encode::run(&self.plan, value, None, opts)
    }

    /// Serialize an instance, re-merging unknown keys captured during
    /// decoding so round-tripping preserves unrecognized data.
    pub fn encode_with_extras(
        &self,
        value: &T,
        extras: &serde_json::Map<String, Value>,
        opts: &EncodeOptions,
    ) -> Result<Vec<u8>, ValidationErrors> {
        encode::run(&self.plan, value, Some(extras), opts)
    }
}

impl<T: DeserializeOwned + Default> Validator<T> {
    /// Decode an untyped document into a `T`, applying presence rules,
    /// defaults and transforms, then validate the result.
    ///
    /// The instance is always returned, even on failure, so callers can
    /// inspect what was recovered: fields that failed to decode fall
    /// back to their zero values. Decode errors short-circuit before
    /// validation; otherwise the aggregated validation outcome is
    /// returned.
    pub fn decode<I: Input + ?Sized>(&self, input: &I) -> (Decoded<T>, Result<(), ValidationErrors>) {
        self.decode_inner(&Context::background(), input)
    }

    /// Like [`decode`](Self::decode), with the caller's context made
    /// visible to context-aware validators.
    pub fn decode_with_context<I: Input + ?Sized>(
        &self,
        ctx: &Context,
        input: &I,
    ) -> (Decoded<T>, Result<(), ValidationErrors>) {
        self.decode_inner(ctx, input)
    }

    /// Decode directly from a `serde_json::Value`.
    pub fn decode_value(&self, doc: &Value) -> (Decoded<T>, Result<(), ValidationErrors>) {
        self.decode_doc(&Context::background(), doc)
    }

    fn decode_inner<I: Input + ?Sized>(
        &self,
        ctx: &Context,
        input: &I,
    ) -> (Decoded<T>, Result<(), ValidationErrors>) {
        let doc = match input.to_value() {
            Ok(doc) => doc,
            Err(e) => return (Decoded::empty(), Err(e)),
        };
        self.decode_doc(ctx, &doc)
    }

    fn decode_doc(&self, ctx: &Context, doc: &Value) -> (Decoded<T>, Result<(), ValidationErrors>) {
        let out = decode::run(&self.plan, doc);
        let mut errors = out.errors;
        let value: T = match serde_json::from_value(out.normalized.clone()) {
            Ok(v) => v,
            Err(e) => {
                errors.push(
                    ErrorCode::ParseError,
                    format!("decoded document does not fit the target type: {}", e),
                );
                T::default()
            }
        };
        let decoded = Decoded {
            value,
            extras: out.extras,
        };
        if !errors.is_empty() {
            return (decoded, Err(errors));
        }
        let mut violations = ValidationErrors::new();
        validate::run(&self.plan, &out.normalized, ctx, None, &mut violations);
        (decoded, violations.into_result())
    }
}

/// Fluent construction of a [`Validator`]. Misconfigured tags surface
/// here as [`ConfigError`]s, never as runtime validation errors.
pub struct Builder<T> {
    name: Option<String>,
    fields: Vec<Field>,
    options: Options,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Builder<T> {
    /// Override the record name used in reference-style schemas.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Describe one field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the unknown-key policy (default: ignore).
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.options.unknown = policy;
        self
    }

    /// Set the missing-field policy (default: strict).
    pub fn missing_fields(mut self, policy: MissingFields) -> Self {
        self.options.missing = policy;
        self
    }

    /// Compile the plan. All tags are parsed and all constraints built
    /// here, exactly once; the resulting validator never re-parses.
    pub fn build(self) -> Result<Validator<T>, ConfigError> {
        let name = self
            .name
            .unwrap_or_else(|| registry::short_type_name::<T>().to_string());
        let mut fields: Vec<CachedField> = Vec::with_capacity(self.fields.len());

        for (index, fd) in self.fields.into_iter().enumerate() {
            let cached = compile_field(fd, index, &self.options)?;
            if fields
                .iter()
                .any(|f| f.name == cached.name || f.wire == cached.wire)
            {
                return Err(ConfigError::DuplicateField { name: cached.name });
            }
            fields.push(cached);
        }

        let plan = Plan {
            name,
            type_id: Some(TypeId::of::<T>()),
            fields,
            options: self.options,
        };
        Ok(Validator {
            plan: Arc::new(plan),
            cache: Arc::new(SchemaCache::new()),
            _marker: PhantomData,
        })
    }
}

fn compile_field(fd: Field, index: usize, options: &Options) -> Result<CachedField, ConfigError> {
    let parsed = tag::parse(&fd.tag);
    let collection = fd.kind.collection();

    if parsed.dive && collection == CollectionKind::None {
        return Err(ConfigError::DiveOnNonCollection { field: fd.name });
    }
    if !parsed.keys.is_empty() && collection != CollectionKind::Map {
        return Err(ConfigError::KeysOnNonMap { field: fd.name });
    }

    let mut constraints = Vec::new();
    let mut transforms = Vec::new();
    let mut cross_fields: Vec<CrossField> = Vec::new();
    let mut default_literal: Option<Value> = None;

    for d in &parsed.pre {
        if d.name == "default" {
            let raw = d.param.as_deref().ok_or_else(|| ConfigError::BadParam {
                field: fd.name.clone(),
                directive: "default".to_string(),
                param: String::new(),
            })?;
            let literal = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_string()));
            if default_literal.is_some() {
                return Err(ConfigError::ConflictingDefaults { field: fd.name });
            }
            default_literal = Some(literal);
            continue;
        }
        if let Some(t) = Transform::from_name(&d.name) {
            transforms.push(t);
            continue;
        }
        if matches!(d.name.as_str(), "eqfield" | "nefield" | "gtfield" | "ltfield") {
            let other = match d.param.as_deref() {
                Some(p) if !p.is_empty() => p,
                _ => {
                    return Err(ConfigError::BadParam {
                        field: fd.name,
                        directive: d.name.clone(),
                        param: String::new(),
                    })
                }
            };
            if let Some(cf) = CrossField::from_directive(&d.name, other) {
                cross_fields.push(cf);
            }
            continue;
        }
        match constraint::build(&fd.name, &d.name, d.param.as_deref(), &fd.kind)? {
            Some(c) => {
                if matches!(c.check, Check::Unique) && collection == CollectionKind::None {
                    return Err(ConfigError::UniqueOnNonCollection { field: fd.name });
                }
                constraints.push(c);
            }
            // Not a built-in: resolved through the registry per call.
            None => constraints.push(Constraint {
                check: Check::Custom {
                    name: d.name.clone(),
                    param: d.param.clone(),
                },
                message: String::new(),
            }),
        }
    }

    let elem_kind = fd.kind.elem_kind().cloned().unwrap_or(FieldKind::Any);
    let mut elem_constraints = Vec::new();
    let mut elem_transforms = Vec::new();
    for d in &parsed.post {
        if let Some(t) = Transform::from_name(&d.name) {
            elem_transforms.push(t);
            continue;
        }
        match constraint::build(&fd.name, &d.name, d.param.as_deref(), &elem_kind)? {
            Some(c) => elem_constraints.push(c),
            None => elem_constraints.push(Constraint {
                check: Check::Custom {
                    name: d.name.clone(),
                    param: d.param.clone(),
                },
                message: String::new(),
            }),
        }
    }

    let key_kind = fd.kind.key_kind().cloned().unwrap_or(FieldKind::String);
    let mut key_constraints = Vec::new();
    for d in &parsed.keys {
        match constraint::build(&fd.name, &d.name, d.param.as_deref(), &key_kind)? {
            Some(c) => key_constraints.push(c),
            None => key_constraints.push(Constraint {
                check: Check::Custom {
                    name: d.name.clone(),
                    param: d.param.clone(),
                },
                message: String::new(),
            }),
        }
    }

    // Default policy matrix: leniency already tolerates absence, so a
    // default under it is rejected outright; under strict mode a default
    // contradicts required.
    let default = match (default_literal, fd.default_provider) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingDefaults { field: fd.name }),
        (Some(lit), None) => Some(DefaultSource::Literal(lit)),
        (None, Some(p)) => Some(DefaultSource::Provider(p)),
        (None, None) => None,
    };
    if default.is_some() {
        match options.missing {
            MissingFields::Lenient => {
                return Err(ConfigError::DefaultWithLenient { field: fd.name })
            }
            MissingFields::Strict if parsed.required => {
                return Err(ConfigError::RequiredWithDefault { field: fd.name })
            }
            MissingFields::Strict => {}
        }
    }

    // Nested plan iff the field (or its elements) are record-kinded.
    let record_kinded = matches!(fd.kind.base(), FieldKind::Struct)
        || matches!(fd.kind.elem_kind().map(FieldKind::base), Some(FieldKind::Struct));
    if record_kinded != fd.nested.is_some() {
        return Err(ConfigError::NestedPlanMismatch { field: fd.name });
    }

    let wire = match fd.wire {
        Some(w) => w,
        None => registry::apply_name_fn(&fd.name).unwrap_or_else(|| fd.name.clone()),
    };

    Ok(CachedField {
        name: fd.name,
        wire,
        index,
        collection,
        constraints,
        elem_constraints,
        key_constraints,
        cross_fields,
        required: parsed.required,
        dive: parsed.dive,
        transforms,
        elem_transforms,
        excluded: parsed.excluded,
        default,
        nested: fd.nested,
        kind: fd.kind,
    })
}
