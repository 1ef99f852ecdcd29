//! Forms: the eight mutually-exclusive shapes a schema can take.
//!
//! [`Form`] is the bare tag; [`Shape`] is the same union carrying borrowed
//! data, so callers can match once instead of re-probing optional fields.
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Discriminator, Schema};

// -------------------------------- Tags ------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Ref,
    Type,
    Enum,
    Elements,
    Properties,
    Values,
    Discriminator,
    Empty,
}

impl Form {
    pub fn as_str(&self) -> &'static str {
        match self {
            Form::Ref => "ref",
            Form::Type => "type",
            Form::Enum => "enum",
            Form::Elements => "elements",
            Form::Properties => "properties",
            Form::Values => "values",
            Form::Discriminator => "discriminator",
            Form::Empty => "empty",
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------ Type keyword ------------------------------ //

/// The eleven primitive type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Boolean,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    String,
    Timestamp,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Boolean => "boolean",
            Type::Int8 => "int8",
            Type::Uint8 => "uint8",
            Type::Int16 => "int16",
            Type::Uint16 => "uint16",
            Type::Int32 => "int32",
            Type::Uint32 => "uint32",
            Type::Float32 => "float32",
            Type::Float64 => "float64",
            Type::String => "string",
            Type::Timestamp => "timestamp",
        }
    }

    /// Inclusive bounds for the integer keywords, `None` for everything else.
    pub fn int_range(&self) -> Option<(f64, f64)> {
        match self {
            Type::Int8 => Some((i8::MIN as f64, i8::MAX as f64)),
            Type::Uint8 => Some((0.0, u8::MAX as f64)),
            Type::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            Type::Uint16 => Some((0.0, u16::MAX as f64)),
            Type::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            Type::Uint32 => Some((0.0, u32::MAX as f64)),
            _ => None,
        }
    }

    /// Does `instance` satisfy this keyword?
    ///
    /// Integers must be integral-valued (`3.0` is fine, `3.5` is not) and in
    /// range. Floats take any number. Timestamps must parse as RFC 3339.
    pub fn accepts(&self, instance: &Value) -> bool {
        match self {
            Type::Boolean => instance.is_boolean(),
            Type::Float32 | Type::Float64 => instance.is_number(),
            Type::String => instance.is_string(),
            Type::Timestamp => instance
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            int => {
                let Some((min, max)) = int.int_range() else { return false };
                instance
                    .as_f64()
                    .is_some_and(|n| n.fract() == 0.0 && min <= n && n <= max)
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------ Borrowed view ----------------------------- //

/// Tagged-union view of a schema. Built by [`Schema::shape`].
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Ref(&'a str),
    Type(Type),
    Enum(&'a IndexSet<String>),
    Elements(&'a Schema),
    Properties {
        required: Option<&'a IndexMap<String, Schema>>,
        optional: Option<&'a IndexMap<String, Schema>>,
        additional: bool,
    },
    Values(&'a Schema),
    Discriminator(&'a Discriminator),
    Empty,
}

impl Shape<'_> {
    pub fn form(&self) -> Form {
        match self {
            Shape::Ref(_) => Form::Ref,
            Shape::Type(_) => Form::Type,
            Shape::Enum(_) => Form::Enum,
            Shape::Elements(_) => Form::Elements,
            Shape::Properties { .. } => Form::Properties,
            Shape::Values(_) => Form::Values,
            Shape::Discriminator(_) => Form::Discriminator,
            Shape::Empty => Form::Empty,
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
