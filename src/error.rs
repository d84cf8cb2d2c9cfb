use std::fmt;

use serde_json::Value;

/// A segment in a violation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Record field, addressed by its wire name.
    Field(String),
    /// Sequence element index.
    Index(usize),
    /// Map entry key.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{}", name),
            PathSegment::Index(idx) => write!(f, "[{}]", idx),
            PathSegment::Key(key) => write!(f, "[{}]", key),
        }
    }
}

/// Category of a runtime violation. [`key()`](ErrorCode::key) gives the
/// stable string form.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCode {
    /// A required field was absent, or zero-valued on a nested record.
    Required,
    /// The value's JSON type does not match the declared field kind.
    InvalidType { expected: String, received: String },
    TooSmall { limit: f64, inclusive: bool },
    TooBig { limit: f64, inclusive: bool },
    /// A format check (email, url, uuid, ipv4, ipv6) failed.
    InvalidFormat { format: String },
    PatternMismatch,
    NotInEnum,
    /// A cross-field comparison against a sibling failed.
    CrossField { other: String },
    UnknownField,
    /// A registered custom or struct-level validator rejected the value.
    CustomValidation { name: String },
    /// Input could not be parsed or bridged through serde at all.
    ParseError,
    /// Generic constraint failure without a more specific category.
    ValidationFailed,
}

impl ErrorCode {
    /// Stable string key for this code.
    pub fn key(&self) -> &str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::InvalidType { .. } => "invalid_type",
            ErrorCode::TooSmall { .. } => "too_small",
            ErrorCode::TooBig { .. } => "too_big",
            ErrorCode::InvalidFormat { .. } => "invalid_format",
            ErrorCode::PatternMismatch => "pattern_mismatch",
            ErrorCode::NotInEnum => "not_in_enum",
            ErrorCode::CrossField { .. } => "cross_field",
            ErrorCode::UnknownField => "unknown_field",
            ErrorCode::CustomValidation { .. } => "custom_validation",
            ErrorCode::ParseError => "parse_error",
            ErrorCode::ValidationFailed => "validation_failed",
        }
    }

    /// Key-value parameters embedded in this code, for message templating.
    pub fn params(&self) -> Vec<(&str, String)> {
        match self {
            ErrorCode::InvalidType { expected, received } => vec![
                ("expected", expected.clone()),
                ("received", received.clone()),
            ],
            ErrorCode::TooSmall { limit, inclusive } => vec![
                ("limit", limit.to_string()),
                ("inclusive", inclusive.to_string()),
            ],
            ErrorCode::TooBig { limit, inclusive } => vec![
                ("limit", limit.to_string()),
                ("inclusive", inclusive.to_string()),
            ],
            ErrorCode::InvalidFormat { format } => vec![("format", format.clone())],
            ErrorCode::CrossField { other } => vec![("other", other.clone())],
            ErrorCode::CustomValidation { name } => vec![("name", name.clone())],
            _ => vec![],
        }
    }
}

/// A single violation with its path, code, message and the offending value.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub path: Vec<PathSegment>,
    pub code: ErrorCode,
    pub message: String,
    /// The value that was rejected, truncated for display (if available).
    pub value: Option<Value>,
}

impl FieldError {
    /// Render the path as a single string: `pets[2].name`, `labels[env]`.
    ///
    /// The leading segment is printed without its dot so the result reads
    /// as a field reference rather than a suffix.
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.path.iter().enumerate() {
            match seg {
                PathSegment::Field(name) if i == 0 => out.push_str(name),
                seg => out.push_str(&seg.to_string()),
            }
        }
        out
    }
}

/// Aggregated validation outcome.
///
/// Violations are accumulated, never short-circuited: one failed call
/// reports every broken constraint at once. When returned as an `Err`,
/// the list is guaranteed non-empty; a clean run is `Ok(())`, never an
/// empty instance.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Single-violation constructor, no offending value.
    pub fn single(code: ErrorCode, message: impl Into<String>) -> Self {
        let mut e = Self::new();
        e.push(code, message);
        e
    }

    /// Push a violation at the root path.
    pub fn push(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: vec![],
            code,
            message: message.into(),
            value: None,
        });
    }

    /// Push a violation carrying the rejected value.
    pub fn push_with_value(&mut self, code: ErrorCode, message: impl Into<String>, value: &Value) {
        self.errors.push(FieldError {
            path: vec![],
            code,
            message: message.into(),
            value: Some(truncate_value(value)),
        });
    }

    /// Push a violation at an explicit path.
    pub fn push_at(
        &mut self,
        path: Vec<PathSegment>,
        code: ErrorCode,
        message: impl Into<String>,
        value: Option<&Value>,
    ) {
        self.errors.push(FieldError {
            path,
            code,
            message: message.into(),
            value: value.map(truncate_value),
        });
    }

    /// Prepend a path segment to every violation collected so far.
    pub fn with_prefix(mut self, segment: PathSegment) -> Self {
        for err in &mut self.errors {
            err.path.insert(0, segment.clone());
        }
        self
    }

    /// Absorb another collector's violations.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert the collector into a result, upholding the non-empty
    /// invariant: an empty collector is a success.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if !err.path.is_empty() {
                write!(f, "{}: ", err.path_string())?;
            }
            write!(f, "{}", err.message)?;
            if let Some(val) = &err.value {
                write!(f, ", got {}", format_value_short(val))?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Construction-time configuration failure.
///
/// These abort plan or union construction and never surface from a
/// `validate` or `decode` call. Callers who want "fail the program if
/// misconfigured" propagate or unwrap explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `dive` on a field that is neither a sequence nor a map.
    DiveOnNonCollection { field: String },
    /// Map-key constraints on a field that is not a map.
    KeysOnNonMap { field: String },
    /// `unique` on a non-collection field.
    UniqueOnNonCollection { field: String },
    /// A directive parameter that could not be interpreted.
    BadParam {
        field: String,
        directive: String,
        param: String,
    },
    /// A default (literal or provider) combined with `required`.
    RequiredWithDefault { field: String },
    /// A default declared while missing-field leniency is enabled.
    DefaultWithLenient { field: String },
    /// Both a static default and a default provider on one field.
    ConflictingDefaults { field: String },
    /// A record-kinded field without a nested plan, or a nested plan on a
    /// field whose kind has no record inside.
    NestedPlanMismatch { field: String },
    /// Two fields resolving to the same declared or wire name.
    DuplicateField { name: String },
    /// Registration under a name reserved for a built-in directive.
    ReservedName { name: String },
    /// Registration under an empty name.
    EmptyName,
    /// Union built with an empty discriminator field name.
    EmptyDiscriminator,
    /// Two union variants sharing one discriminator value.
    DuplicateDiscriminator { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DiveOnNonCollection { field } => {
                write!(f, "field \"{}\": dive requires a sequence or map", field)
            }
            ConfigError::KeysOnNonMap { field } => {
                write!(f, "field \"{}\": key constraints require a map", field)
            }
            ConfigError::UniqueOnNonCollection { field } => {
                write!(f, "field \"{}\": unique requires a collection", field)
            }
            ConfigError::BadParam {
                field,
                directive,
                param,
            } => write!(
                f,
                "field \"{}\": invalid parameter \"{}\" for directive \"{}\"",
                field, param, directive
            ),
            ConfigError::RequiredWithDefault { field } => write!(
                f,
                "field \"{}\": required and default are mutually exclusive",
                field
            ),
            ConfigError::DefaultWithLenient { field } => write!(
                f,
                "field \"{}\": defaults are not allowed when missing fields are lenient",
                field
            ),
            ConfigError::ConflictingDefaults { field } => write!(
                f,
                "field \"{}\": a static default and a default provider cannot both be set",
                field
            ),
            ConfigError::NestedPlanMismatch { field } => write!(
                f,
                "field \"{}\": nested plans require a record-kinded field and vice versa",
                field
            ),
            ConfigError::DuplicateField { name } => write!(f, "duplicate field name \"{}\"", name),
            ConfigError::ReservedName { name } => {
                write!(f, "\"{}\" is a reserved built-in directive name", name)
            }
            ConfigError::EmptyName => write!(f, "registration name must not be empty"),
            ConfigError::EmptyDiscriminator => {
                write!(f, "discriminator field name must not be empty")
            }
            ConfigError::DuplicateDiscriminator { value } => {
                write!(f, "duplicate discriminator value \"{}\"", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The JSON type name of a value, for mismatch messages.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Short display form of a value for error output.
pub(crate) fn format_value_short(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("array(len={})", arr.len()),
        Value::Object(obj) => format!("object(keys={})", obj.len()),
    }
}

/// Bound the size of values echoed into errors.
pub(crate) fn truncate_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 100 => {
            let head: String = s.chars().take(97).collect();
            Value::String(format!("{}...", head))
        }
        Value::Array(arr) if arr.len() > 5 => {
            let mut out: Vec<Value> = arr[..5].to_vec();
            out.push(Value::String(format!("... ({} more)", arr.len() - 5)));
            Value::Array(out)
        }
        _ => value.clone(),
    }
}
