//! JSON Data Definition Format (JDDF).
//!
//! A small, closed schema language for JSON: every schema takes exactly one of
//! eight forms (`ref`, `type`, `enum`, `elements`, `properties`, `values`,
//! `discriminator`, or empty). Validation yields every problem as a pair of
//! portable token paths rather than a yes/no answer.
//!
//! ```
//! use jddf::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::from_json(&json!({
//!     "properties": {
//!         "name": { "type": "string" },
//!         "age": { "type": "uint32" },
//!         "phones": { "elements": { "type": "string" } }
//!     }
//! })).unwrap();
//! schema.verify().unwrap();
//!
//! let errors = jddf::validate(&schema, &json!({
//!     "age": "43",
//!     "phones": ["+44 1234567", 442345678]
//! })).unwrap();
//!
//! assert_eq!(errors.len(), 3);
//! assert_eq!(errors[0].schema_pointer(), "/properties/name");
//! assert_eq!(errors[2].instance_pointer(), "/phones/1");
//! ```
pub mod errors;
pub mod form;
pub mod path_de;
pub mod schema;
pub mod validator;

pub use errors::{DeserializationError, InvalidSchemaError, MaxDepthExceededError};
pub use form::{Form, Shape, Type};
pub use schema::{Discriminator, Schema};
pub use validator::{validate, ValidateOptions, ValidationError, Validator};
