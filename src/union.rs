//! Discriminated unions: route a document to one of several variant
//! plans based on a discriminator field's value.

use std::any::{Any, TypeId};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::constraint::canonical;
use crate::context::Context;
use crate::error::{ConfigError, ErrorCode, PathSegment, ValidationErrors};
use crate::input::Input;
use crate::plan::Validator;

type DecodeFn<U> = Box<dyn Fn(&Context, &Value) -> Result<U, ValidationErrors> + Send + Sync>;
type ValidateFn = Box<dyn Fn(&Context, &dyn Any) -> Option<Result<(), ValidationErrors>> + Send + Sync>;

struct UnionVariant<U> {
    value: String,
    type_id: TypeId,
    decode: DecodeFn<U>,
    validate: ValidateFn,
}

/// Builder for a [`Union`]: the discriminator field name plus one
/// registered variant per discriminator value.
///
/// # Example
/// ```
/// use serde::{Deserialize, Serialize};
/// use tagvet::{Field, UnionOptions, Validator};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Cat { name: String, lives: i64 }
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Dog { name: String, good_boy: bool }
///
/// #[derive(Debug)]
/// enum Pet { Cat(Cat), Dog(Dog) }
///
/// let cats = Validator::<Cat>::builder()
///     .field(Field::string("name").tag("required"))
///     .field(Field::int("lives").tag("gte=1,lte=9"))
///     .build().unwrap();
/// let dogs = Validator::<Dog>::builder()
///     .field(Field::string("name").tag("required"))
///     .field(Field::boolean("good_boy"))
///     .build().unwrap();
///
/// let pets = UnionOptions::new("pet_type")
///     .variant("cat", &cats, Pet::Cat)
///     .variant("dog", &dogs, Pet::Dog)
///     .build().unwrap();
///
/// let pet = pets.decode(r#"{"pet_type":"cat","name":"Whiskers","lives":7}"#).unwrap();
/// assert!(matches!(pet, Pet::Cat(_)));
/// ```
pub struct UnionOptions<U> {
    discriminator: String,
    variants: Vec<UnionVariant<U>>,
}

impl<U> UnionOptions<U> {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            variants: vec![],
        }
    }

    /// Register a variant: when the discriminator equals `value`, the
    /// document decodes through `validator` and is wrapped into `U` by
    /// `wrap`. Matching is case-sensitive.
    pub fn variant<T, F>(mut self, value: impl Into<String>, validator: &Validator<T>, wrap: F) -> Self
    where
        T: Serialize + DeserializeOwned + Default + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let decode_validator = validator.clone();
        let validate_validator = validator.clone();
        self.variants.push(UnionVariant {
            value: value.into(),
            type_id: TypeId::of::<T>(),
            decode: Box::new(move |ctx, doc| {
                let (decoded, outcome) = decode_validator.decode_with_context(ctx, doc);
                outcome.map(|_| wrap(decoded.into_inner()))
            }),
            validate: Box::new(move |ctx, any| {
                any.downcast_ref::<T>()
                    .map(|t| validate_validator.validate_with_context(ctx, t))
            }),
        });
        self
    }

    /// Finish construction, checking the union invariants: a non-empty
    /// discriminator field name and unique discriminator values.
    pub fn build(self) -> Result<Union<U>, ConfigError> {
        if self.discriminator.is_empty() {
            return Err(ConfigError::EmptyDiscriminator);
        }
        for (i, v) in self.variants.iter().enumerate() {
            if self.variants[i + 1..].iter().any(|w| w.value == v.value) {
                return Err(ConfigError::DuplicateDiscriminator {
                    value: v.value.clone(),
                });
            }
        }
        Ok(Union {
            discriminator: self.discriminator,
            variants: self.variants,
        })
    }
}

/// A compiled discriminated union over output type `U`.
pub struct Union<U> {
    discriminator: String,
    variants: Vec<UnionVariant<U>>,
}

impl<U> Union<U> {
    /// Decode a document by its discriminator value.
    pub fn decode<I: Input + ?Sized>(&self, input: &I) -> Result<U, ValidationErrors> {
        self.decode_with_context(&Context::background(), input)
    }

    /// Like [`decode`](Self::decode), with the caller's context made
    /// visible to context-aware validators.
    pub fn decode_with_context<I: Input + ?Sized>(
        &self,
        ctx: &Context,
        input: &I,
    ) -> Result<U, ValidationErrors> {
        let doc = input.to_value()?;
        let disc = doc
            .as_object()
            .and_then(|obj| obj.get(&self.discriminator))
            .filter(|v| !v.is_null());
        let disc = match disc {
            Some(v) => v,
            None => {
                let mut errors = ValidationErrors::new();
                errors.push_at(
                    vec![PathSegment::Field(self.discriminator.clone())],
                    ErrorCode::Required,
                    format!("missing discriminator field \"{}\"", self.discriminator),
                    None,
                );
                return Err(errors);
            }
        };
        let canon = match canonical(disc) {
            Some(c) => c,
            None => {
                let mut errors = ValidationErrors::new();
                errors.push_at(
                    vec![PathSegment::Field(self.discriminator.clone())],
                    ErrorCode::InvalidType {
                        expected: "scalar".to_string(),
                        received: crate::error::value_type_name(disc).to_string(),
                    },
                    "discriminator value must be a scalar",
                    Some(disc),
                );
                return Err(errors);
            }
        };
        match self.variants.iter().find(|v| v.value == canon) {
            Some(variant) => (variant.decode)(ctx, &doc),
            None => {
                let mut errors = ValidationErrors::new();
                errors.push_at(
                    vec![PathSegment::Field(self.discriminator.clone())],
                    ErrorCode::NotInEnum,
                    format!("unknown discriminator value \"{}\"", canon),
                    Some(disc),
                );
                Err(errors)
            }
        }
    }

    /// Validate an existing instance by its runtime type against the
    /// registered variant types. An unregistered type is an error.
    pub fn validate_any(&self, value: &dyn Any) -> Result<(), ValidationErrors> {
        self.validate_any_with_context(&Context::background(), value)
    }

    pub fn validate_any_with_context(
        &self,
        ctx: &Context,
        value: &dyn Any,
    ) -> Result<(), ValidationErrors> {
        for variant in &self.variants {
            if variant.type_id == value.type_id() {
                if let Some(result) = (variant.validate)(ctx, value) {
                    return result;
                }
            }
        }
        Err(ValidationErrors::single(
            ErrorCode::ValidationFailed,
            "type is not a registered union variant",
        ))
    }
}
