//! Built-in constraint kinds and their evaluation.
//!
//! Each constraint is a pure check over a decoded `serde_json::Value`.
//! Shape mismatches (a length check against a number, a format check
//! against an array) are not failures here: the declared field kind is
//! enforced by the deserialization executor, so a check that does not
//! apply to the value's shape passes silently rather than panicking on
//! hostile input.

use regex_lite::Regex;
use serde_json::Value;

use crate::error::{ConfigError, ErrorCode};
use crate::field::FieldKind;

/// Directive names claimed by the engine. Custom validators must not be
/// registered under any of these.
pub(crate) const RESERVED: &[&str] = &[
    // core
    "required",
    "dive",
    "keys",
    "endkeys",
    "default",
    "exclude",
    "omitempty",
    "structonly",
    "nostructlevel",
    // numeric / length
    "min",
    "max",
    "len",
    "eq",
    "ne",
    "gt",
    "gte",
    "lt",
    "lte",
    // string classes
    "alpha",
    "alphanum",
    "numeric",
    "lowercase",
    "uppercase",
    "contains",
    "excludes",
    "startswith",
    "endswith",
    "ascii",
    "boolean",
    // network / format
    "email",
    "url",
    "uri",
    "uuid",
    "uuid3",
    "uuid4",
    "uuid5",
    "ipv4",
    "ipv6",
    "ip",
    "cidr",
    "mac",
    "hostname",
    "fqdn",
    "datetime",
    "base64",
    "json",
    // collection
    "unique",
    "isdefault",
    // cross-field
    "eqfield",
    "nefield",
    "gtfield",
    "ltfield",
    // transforms
    "strip_whitespace",
    "to_lower",
    "to_upper",
];

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// String transform directive. Applied to the value during decoding;
/// during pure validation it degrades to a pass/fail check that the
/// value is already in transformed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transform {
    StripWhitespace,
    ToLower,
    ToUpper,
}

impl Transform {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "strip_whitespace" => Some(Transform::StripWhitespace),
            "to_lower" => Some(Transform::ToLower),
            "to_upper" => Some(Transform::ToUpper),
            _ => None,
        }
    }

    pub(crate) fn apply(&self, s: &str) -> String {
        match self {
            Transform::StripWhitespace => s.trim().to_string(),
            Transform::ToLower => s.to_lowercase(),
            Transform::ToUpper => s.to_uppercase(),
        }
    }

    /// Whether `s` is already in transformed form.
    pub(crate) fn holds(&self, s: &str) -> bool {
        self.apply(s) == s
    }

    pub(crate) fn violation_message(&self) -> &'static str {
        match self {
            Transform::StripWhitespace => "must not have leading or trailing whitespace",
            Transform::ToLower => "must be in lower case",
            Transform::ToUpper => "must be in upper case",
        }
    }
}

/// Cross-field relation against a named sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Eq,
    Ne,
    Gt,
    Lt,
}

#[derive(Debug, Clone)]
pub(crate) struct CrossField {
    pub relation: Relation,
    pub other: String,
    pub message: String,
}

impl CrossField {
    pub(crate) fn from_directive(name: &str, other: &str) -> Option<Self> {
        let relation = match name {
            "eqfield" => Relation::Eq,
            "nefield" => Relation::Ne,
            "gtfield" => Relation::Gt,
            "ltfield" => Relation::Lt,
            _ => return None,
        };
        let message = match relation {
            Relation::Eq => format!("must equal the {} field", other),
            Relation::Ne => format!("must not equal the {} field", other),
            Relation::Gt => format!("must be greater than the {} field", other),
            Relation::Lt => format!("must be less than the {} field", other),
        };
        Some(Self {
            relation,
            other: other.to_string(),
            message,
        })
    }

    /// Compare this field's value against the resolved sibling.
    pub(crate) fn holds(&self, value: &Value, other: &Value) -> bool {
        match self.relation {
            Relation::Eq => value == other,
            Relation::Ne => value != other,
            Relation::Gt => match ordering(value, other) {
                Some(ord) => ord == std::cmp::Ordering::Greater,
                None => false,
            },
            Relation::Lt => match ordering(value, other) {
                Some(ord) => ord == std::cmp::Ordering::Less,
                None => false,
            },
        }
    }
}

fn ordering(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().and_then(|x| y.as_f64().and_then(|y| x.partial_cmp(&y)))
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// The check half of a compiled constraint.
#[derive(Debug, Clone)]
pub(crate) enum Check {
    MinLen(usize),
    MaxLen(usize),
    ExactLen(usize),
    MinValue(f64),
    MaxValue(f64),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    /// Canonical-string equality against the tag parameter.
    EqCanon(String),
    NeCanon(String),
    Email,
    Url,
    Uuid,
    Ipv4,
    Ipv6,
    Pattern(Regex),
    /// Membership in a canonical-string enumeration.
    OneOf(Vec<String>),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Alpha,
    Alphanum,
    Numeric,
    Lowercase,
    Uppercase,
    /// No duplicate elements (sequences) or values (maps).
    Unique,
    /// Late-bound rule resolved through the registry at validation time.
    Custom { name: String, param: Option<String> },
}

/// A compiled constraint: a check plus the message reported on failure.
#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub check: Check,
    pub message: String,
}

impl Constraint {
    /// Evaluate against a value. `Err` carries the error code; the
    /// message lives on the constraint itself.
    ///
    /// `Check::Custom` is not evaluated here — the executor resolves it
    /// through the registry so that late registrations are honored.
    pub(crate) fn validate(&self, value: &Value) -> Result<(), ErrorCode> {
        match &self.check {
            Check::MinLen(min) => {
                if let Some(len) = length_of(value) {
                    if len < *min {
                        return Err(ErrorCode::TooSmall {
                            limit: *min as f64,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::MaxLen(max) => {
                if let Some(len) = length_of(value) {
                    if len > *max {
                        return Err(ErrorCode::TooBig {
                            limit: *max as f64,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::ExactLen(want) => {
                if let Some(len) = length_of(value) {
                    if len != *want {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::MinValue(min) => {
                if let Some(n) = value.as_f64() {
                    if n < *min {
                        return Err(ErrorCode::TooSmall {
                            limit: *min,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::MaxValue(max) => {
                if let Some(n) = value.as_f64() {
                    if n > *max {
                        return Err(ErrorCode::TooBig {
                            limit: *max,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::Gt(limit) => {
                if let Some(n) = value.as_f64() {
                    if n <= *limit {
                        return Err(ErrorCode::TooSmall {
                            limit: *limit,
                            inclusive: false,
                        });
                    }
                }
            }
            Check::Gte(limit) => {
                if let Some(n) = value.as_f64() {
                    if n < *limit {
                        return Err(ErrorCode::TooSmall {
                            limit: *limit,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::Lt(limit) => {
                if let Some(n) = value.as_f64() {
                    if n >= *limit {
                        return Err(ErrorCode::TooBig {
                            limit: *limit,
                            inclusive: false,
                        });
                    }
                }
            }
            Check::Lte(limit) => {
                if let Some(n) = value.as_f64() {
                    if n > *limit {
                        return Err(ErrorCode::TooBig {
                            limit: *limit,
                            inclusive: true,
                        });
                    }
                }
            }
            Check::EqCanon(want) => {
                if let Some(got) = canonical(value) {
                    if got != *want {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::NeCanon(avoid) => {
                if let Some(got) = canonical(value) {
                    if got == *avoid {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Email => return format_check(value, crate::formats::is_email, "email"),
            Check::Url => return format_check(value, crate::formats::is_url, "url"),
            Check::Uuid => return format_check(value, crate::formats::is_uuid, "uuid"),
            Check::Ipv4 => return format_check(value, crate::formats::is_ipv4, "ipv4"),
            Check::Ipv6 => return format_check(value, crate::formats::is_ipv6, "ipv6"),
            Check::Pattern(re) => {
                if let Some(s) = value.as_str() {
                    if !re.is_match(s) {
                        return Err(ErrorCode::PatternMismatch);
                    }
                }
            }
            Check::OneOf(allowed) => {
                if let Some(got) = canonical(value) {
                    if !allowed.iter().any(|a| *a == got) {
                        return Err(ErrorCode::NotInEnum);
                    }
                }
            }
            Check::Contains(sub) => {
                if let Some(s) = value.as_str() {
                    if !s.contains(sub.as_str()) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::StartsWith(prefix) => {
                if let Some(s) = value.as_str() {
                    if !s.starts_with(prefix.as_str()) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::EndsWith(suffix) => {
                if let Some(s) = value.as_str() {
                    if !s.ends_with(suffix.as_str()) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Alpha => {
                if let Some(s) = value.as_str() {
                    if s.is_empty() || !s.chars().all(|c| c.is_alphabetic()) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Alphanum => {
                if let Some(s) = value.as_str() {
                    if s.is_empty() || !s.chars().all(|c| c.is_alphanumeric()) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Numeric => {
                if let Some(s) = value.as_str() {
                    if s.parse::<f64>().is_err() {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Lowercase => {
                if let Some(s) = value.as_str() {
                    if s != s.to_lowercase() {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Uppercase => {
                if let Some(s) = value.as_str() {
                    if s != s.to_uppercase() {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Unique => {
                let items: Vec<&Value> = match value {
                    Value::Array(arr) => arr.iter().collect(),
                    Value::Object(obj) => obj.values().collect(),
                    _ => return Ok(()),
                };
                for (i, a) in items.iter().enumerate() {
                    if items[i + 1..].iter().any(|b| a == b) {
                        return Err(ErrorCode::ValidationFailed);
                    }
                }
            }
            Check::Custom { .. } => {}
        }
        Ok(())
    }
}

fn format_check(value: &Value, check: fn(&str) -> bool, format: &str) -> Result<(), ErrorCode> {
    if let Some(s) = value.as_str() {
        if !check(s) {
            return Err(ErrorCode::InvalidFormat {
                format: format.to_string(),
            });
        }
    }
    Ok(())
}

/// Character count for strings, entry count for collections.
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(arr) => Some(arr.len()),
        Value::Object(obj) => Some(obj.len()),
        _ => None,
    }
}

/// Canonical string form of a scalar, used for enumeration membership,
/// `eq`/`ne` comparison and discriminator coercion.
///
/// Integers render as minimal decimals; whole floats drop the fraction
/// (`5.0` and `5` coincide); booleans are `true`/`false`. Non-scalars
/// have no canonical form.
pub(crate) fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// The unit word used in length messages for a given kind.
fn length_unit(kind: &FieldKind) -> &'static str {
    match kind.base() {
        FieldKind::String => "characters",
        FieldKind::Map(..) => "entries",
        _ => "items",
    }
}

fn numeric_param(field: &str, name: &str, param: Option<&str>) -> Result<f64, ConfigError> {
    let raw = param.unwrap_or("");
    raw.trim().parse::<f64>().map_err(|_| ConfigError::BadParam {
        field: field.to_string(),
        directive: name.to_string(),
        param: raw.to_string(),
    })
}

fn length_param(field: &str, name: &str, param: Option<&str>) -> Result<usize, ConfigError> {
    let raw = param.unwrap_or("");
    raw.trim().parse::<usize>().map_err(|_| ConfigError::BadParam {
        field: field.to_string(),
        directive: name.to_string(),
        param: raw.to_string(),
    })
}

fn string_param(field: &str, name: &str, param: Option<&str>) -> Result<String, ConfigError> {
    match param {
        Some(p) if !p.is_empty() => Ok(p.to_string()),
        _ => Err(ConfigError::BadParam {
            field: field.to_string(),
            directive: name.to_string(),
            param: String::new(),
        }),
    }
}

/// Build a compiled constraint from a directive, resolving the
/// context-sensitive directives (`min`, `max`, `len`) against the field
/// kind once, at compile time.
///
/// Returns `Ok(None)` when the name is not a built-in check — the caller
/// routes those to the late-bound custom rule path. Malformed parameters
/// abort construction.
pub(crate) fn build(
    field: &str,
    name: &str,
    param: Option<&str>,
    kind: &FieldKind,
) -> Result<Option<Constraint>, ConfigError> {
    let length_based = kind.is_length_based();
    let unit = length_unit(kind);

    let constraint = match name {
        "min" => {
            if length_based {
                let n = length_param(field, name, param)?;
                Constraint {
                    check: Check::MinLen(n),
                    message: format!("must be at least {} {}", n, unit),
                }
            } else {
                let n = numeric_param(field, name, param)?;
                Constraint {
                    check: Check::MinValue(n),
                    message: format!("must be at least {}", n),
                }
            }
        }
        "max" => {
            if length_based {
                let n = length_param(field, name, param)?;
                Constraint {
                    check: Check::MaxLen(n),
                    message: format!("must be at most {} {}", n, unit),
                }
            } else {
                let n = numeric_param(field, name, param)?;
                Constraint {
                    check: Check::MaxValue(n),
                    message: format!("must be at most {}", n),
                }
            }
        }
        "len" => {
            let n = length_param(field, name, param)?;
            Constraint {
                check: Check::ExactLen(n),
                message: format!("must be exactly {} {}", n, unit),
            }
        }
        "gt" => {
            let n = numeric_param(field, name, param)?;
            Constraint {
                check: Check::Gt(n),
                message: format!("must be greater than {}", n),
            }
        }
        "gte" => {
            let n = numeric_param(field, name, param)?;
            Constraint {
                check: Check::Gte(n),
                message: format!("must be {} or greater", n),
            }
        }
        "lt" => {
            let n = numeric_param(field, name, param)?;
            Constraint {
                check: Check::Lt(n),
                message: format!("must be less than {}", n),
            }
        }
        "lte" => {
            let n = numeric_param(field, name, param)?;
            Constraint {
                check: Check::Lte(n),
                message: format!("must be {} or less", n),
            }
        }
        "eq" => {
            let p = string_param(field, name, param)?;
            Constraint {
                message: format!("must equal {}", p),
                check: Check::EqCanon(p),
            }
        }
        "ne" => {
            let p = string_param(field, name, param)?;
            Constraint {
                message: format!("must not equal {}", p),
                check: Check::NeCanon(p),
            }
        }
        "email" => Constraint {
            check: Check::Email,
            message: "must be a valid email address".to_string(),
        },
        "url" => Constraint {
            check: Check::Url,
            message: "must be a valid http or https URL".to_string(),
        },
        "uuid" => Constraint {
            check: Check::Uuid,
            message: "must be a valid UUID".to_string(),
        },
        "ipv4" => Constraint {
            check: Check::Ipv4,
            message: "must be a valid IPv4 address".to_string(),
        },
        "ipv6" => Constraint {
            check: Check::Ipv6,
            message: "must be a valid IPv6 address".to_string(),
        },
        "pattern" => {
            let p = string_param(field, name, param)?;
            let re = Regex::new(&p).map_err(|_| ConfigError::BadParam {
                field: field.to_string(),
                directive: name.to_string(),
                param: p.clone(),
            })?;
            Constraint {
                check: Check::Pattern(re),
                message: "must match the required pattern".to_string(),
            }
        }
        "oneof" => {
            let p = string_param(field, name, param)?;
            let allowed: Vec<String> = p.split_whitespace().map(str::to_string).collect();
            if allowed.is_empty() {
                return Err(ConfigError::BadParam {
                    field: field.to_string(),
                    directive: name.to_string(),
                    param: p,
                });
            }
            Constraint {
                message: format!("must be one of: {}", allowed.join(", ")),
                check: Check::OneOf(allowed),
            }
        }
        "contains" => {
            let p = string_param(field, name, param)?;
            Constraint {
                message: format!("must contain \"{}\"", p),
                check: Check::Contains(p),
            }
        }
        "startswith" => {
            let p = string_param(field, name, param)?;
            Constraint {
                message: format!("must start with \"{}\"", p),
                check: Check::StartsWith(p),
            }
        }
        "endswith" => {
            let p = string_param(field, name, param)?;
            Constraint {
                message: format!("must end with \"{}\"", p),
                check: Check::EndsWith(p),
            }
        }
        "alpha" => Constraint {
            check: Check::Alpha,
            message: "must contain only letters".to_string(),
        },
        "alphanum" => Constraint {
            check: Check::Alphanum,
            message: "must contain only letters and digits".to_string(),
        },
        "numeric" => Constraint {
            check: Check::Numeric,
            message: "must be a numeric string".to_string(),
        },
        "lowercase" => Constraint {
            check: Check::Lowercase,
            message: "must be lower case".to_string(),
        },
        "uppercase" => Constraint {
            check: Check::Uppercase,
            message: "must be upper case".to_string(),
        },
        "unique" => Constraint {
            check: Check::Unique,
            message: "must not contain duplicate values".to_string(),
        },
        _ => return Ok(None),
    };
    Ok(Some(constraint))
}
