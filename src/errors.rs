//! Error kinds for the three phases: deserialize, verify, validate.
//!
//! Validation *findings* are not errors; they are the successful result of
//! `validate` (see [`crate::validator::ValidationError`]).
use thiserror::Error;

/// A recognized schema keyword had the wrong JSON shape.
///
/// `path` is the dotted JSON path to the offending key, as reported by
/// `serde_path_to_error` (e.g. `properties.age.type`, or `.` for the root).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at JSON path {path} → {message}")]
pub struct DeserializationError {
    pub path: String,
    pub message: String,
}

/// A schema that deserialized fine but breaks one of the semantic rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSchemaError {
    #[error("definitions may only appear on the root schema")]
    NonRootDefinitions,

    #[error("schema mixes more than one form: {}", .forms.join(", "))]
    MultipleForms { forms: Vec<&'static str> },

    #[error("ref `{name}` does not name a root definition")]
    UnresolvedRef { name: String },

    #[error("enum must contain at least one value")]
    EmptyEnum,

    #[error("`{name}` is declared in both properties and optionalProperties")]
    AmbiguousProperty { name: String },

    #[error("discriminator mapping `{tag_value}` must be of the properties form")]
    MappingNotProperties { tag_value: String },

    #[error("discriminator mapping `{tag_value}` redeclares the tag `{tag}`")]
    MappingRedefinesTag { tag_value: String, tag: String },
}

/// The chain of pending `ref` resolutions grew past the configured bound.
///
/// Fatal to the validate call: no partial error list is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("max depth of {max_depth} exceeded while resolving refs")]
pub struct MaxDepthExceededError {
    pub max_depth: usize,
}
