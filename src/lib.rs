//! # tagvet — tag-driven validation for typed records
//!
//! `tagvet` compiles a small per-field constraint grammar into a
//! reusable validation/deserialization plan, once per type. The plan
//! then drives three operations: validating existing instances
//! (aggregating every violation instead of stopping at the first),
//! decoding untyped JSON documents into instances with presence rules
//! and defaults, and deriving an annotated JSON-Schema-like description
//! of the type.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use tagvet::{Field, FieldKind, Validator};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//!     age: i64,
//!     tags: Vec<String>,
//! }
//!
//! let users = Validator::<User>::builder()
//!     .field(Field::string("name").tag("required,min=2,max=50"))
//!     .field(Field::string("email").tag("required,email"))
//!     .field(Field::int("age").tag("gte=0,lte=130"))
//!     .field(Field::seq("tags", FieldKind::String).tag("max=5,dive,min=1"))
//!     .build()
//!     .unwrap();
//!
//! let (user, outcome) = users.decode(
//!     r#"{"name":"Ada","email":"ada@example.com","age":36,"tags":["math"]}"#,
//! );
//! assert!(outcome.is_ok());
//! assert_eq!(user.name, "Ada");
//!
//! // Validation aggregates every violation with its path.
//! let bad = User { name: "A".into(), email: "nope".into(), age: -3, tags: vec![] };
//! let errors = users.validate(&bad).unwrap_err();
//! assert_eq!(errors.len(), 3);
//! ```
//!
//! ## Tag grammar
//!
//! Tags are comma-separated `name` or `name=param` directives. `min` and
//! `max` resolve against the field kind at construction time: length
//! bounds for strings and collections, value bounds for numbers. `dive`
//! shifts the following directives onto a collection's elements, and
//! `keys`/`endkeys` bracket map-key directives. Misconfigured tags fail
//! `build()` with a [`ConfigError`]; they never surface as runtime
//! validation errors.
//!
//! ## Custom validators
//!
//! Unknown directive names are resolved through the process-wide
//! registry at validation time, so a registration made after a validator
//! was built is picked up on its next run:
//!
//! ```rust
//! tagvet::register_validator("even", |v, _param| {
//!     match v.as_i64() {
//!         Some(n) if n % 2 == 0 => Ok(()),
//!         _ => Err("must be even".to_string()),
//!     }
//! }).unwrap();
//! ```

mod constraint;
pub mod context;
pub mod decode;
pub mod encode;
pub mod error;
pub mod field;
mod formats;
pub mod input;
pub mod plan;
pub mod registry;
pub mod schema;
mod tag;
pub mod union;
mod validate;

pub use context::Context;
pub use decode::Decoded;
pub use encode::EncodeOptions;
pub use error::{ConfigError, ErrorCode, FieldError, PathSegment, ValidationErrors};
pub use field::{Field, FieldKind};
pub use input::Input;
pub use plan::{Builder, MissingFields, Plan, UnknownFields, Validator};
pub use registry::{
    register_alias, register_context_validator, register_struct_validator, register_validator,
    set_field_name_fn,
};
pub use union::{Union, UnionOptions};

/// Common imports for working with `tagvet`.
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::decode::Decoded;
    pub use crate::encode::EncodeOptions;
    pub use crate::error::{
        ConfigError, ErrorCode, FieldError, PathSegment, ValidationErrors,
    };
    pub use crate::field::{Field, FieldKind};
    pub use crate::input::Input;
    pub use crate::plan::{Builder, MissingFields, Plan, UnknownFields, Validator};
    pub use crate::registry::{
        register_alias, register_context_validator, register_struct_validator,
        register_validator, set_field_name_fn,
    };
    pub use crate::union::{Union, UnionOptions};
}
