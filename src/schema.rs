//! Schema model: wire deserialization, form classification, semantic checks.
//!
//! A [`Schema`] is deliberately loose: every keyword is an optional field, the
//! way it appears on the wire. Deserialization only checks the shape of each
//! keyword in isolation. Cross-keyword rules (one form per schema, refs that
//! resolve, disjoint property sets, well-formed discriminator mappings) are
//! the job of [`Schema::verify`]. Once verified, treat the schema as frozen.
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DeserializationError, InvalidSchemaError};
use crate::form::{Form, Shape, Type};

// ------------------------------- Model ------------------------------------ //

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Only meaningful on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, Schema>>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<Type>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<IndexSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
}

/// Tagged union: `tag` names the instance key, `mapping` picks the branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Discriminator {
    pub tag: String,
    pub mapping: IndexMap<String, Schema>,
}

// ------------------------------ Front API --------------------------------- //

impl Schema {
    /// Build a schema from an already-parsed JSON object.
    pub fn from_json(value: &Value) -> Result<Self, DeserializationError> {
        crate::path_de::from_value_with_path(value)
    }

    /// Wire JSON, unset keywords omitted.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn form(&self) -> Form {
        self.shape().form()
    }

    /// Classify by precedence: ref > type > enum > elements > properties >
    /// values > discriminator > empty. Only trustworthy after [`Self::verify`].
    pub fn shape(&self) -> Shape<'_> {
        if let Some(name) = &self.ref_ {
            return Shape::Ref(name);
        }
        if let Some(type_) = self.type_ {
            return Shape::Type(type_);
        }
        if let Some(values) = &self.enum_ {
            return Shape::Enum(values);
        }
        if let Some(elements) = &self.elements {
            return Shape::Elements(elements);
        }
        if self.properties.is_some() || self.optional_properties.is_some() {
            return Shape::Properties {
                required: self.properties.as_ref(),
                optional: self.optional_properties.as_ref(),
                additional: self.additional_properties.unwrap_or(false),
            };
        }
        if let Some(values) = &self.values {
            return Shape::Values(values);
        }
        if let Some(discriminator) = &self.discriminator {
            return Shape::Discriminator(discriminator);
        }
        Shape::Empty
    }

    pub fn definition(&self, name: &str) -> Option<&Schema> {
        self.definitions.as_ref()?.get(name)
    }

    /// Check the semantic rules, treating `self` as the root. Fails fast on the
    /// first violation; returns `self` so it chains after construction.
    pub fn verify(&self) -> Result<&Self, InvalidSchemaError> {
        self.verify_with_root(self, true)
            .inspect_err(|err| tracing::debug!(%err, "schema verification failed"))?;
        Ok(self)
    }

    fn verify_with_root(&self, root: &Schema, is_root: bool) -> Result<(), InvalidSchemaError> {
        if let Some(definitions) = &self.definitions {
            if !is_root && !definitions.is_empty() {
                return Err(InvalidSchemaError::NonRootDefinitions);
            }
            for definition in definitions.values() {
                definition.verify_with_root(root, false)?;
            }
        }

        if let Some(name) = &self.ref_ {
            if root.definition(name).is_none() {
                return Err(InvalidSchemaError::UnresolvedRef { name: name.clone() });
            }
        }

        let forms = self.populated_forms();
        if forms.len() > 1 {
            return Err(InvalidSchemaError::MultipleForms { forms });
        }

        if self.enum_.as_ref().is_some_and(IndexSet::is_empty) {
            return Err(InvalidSchemaError::EmptyEnum);
        }

        if let Some(elements) = &self.elements {
            elements.verify_with_root(root, false)?;
        }
        for sub in self.properties.iter().chain(&self.optional_properties).flat_map(IndexMap::values) {
            sub.verify_with_root(root, false)?;
        }
        if let Some(values) = &self.values {
            values.verify_with_root(root, false)?;
        }
        if let Some(discriminator) = &self.discriminator {
            for sub in discriminator.mapping.values() {
                sub.verify_with_root(root, false)?;
            }
        }

        if let (Some(required), Some(optional)) = (&self.properties, &self.optional_properties) {
            if let Some(name) = required.keys().find(|k| optional.contains_key(*k)) {
                return Err(InvalidSchemaError::AmbiguousProperty { name: name.clone() });
            }
        }

        if let Some(discriminator) = &self.discriminator {
            discriminator.verify_mapping()?;
        }

        Ok(())
    }

    /// Wire names of every form group that has a keyword set.
    fn populated_forms(&self) -> Vec<&'static str> {
        let mut forms = Vec::new();
        if self.ref_.is_some() { forms.push("ref"); }
        if self.type_.is_some() { forms.push("type"); }
        if self.enum_.is_some() { forms.push("enum"); }
        if self.elements.is_some() { forms.push("elements"); }
        if self.properties.is_some() || self.optional_properties.is_some() {
            forms.push("properties");
        }
        if self.values.is_some() { forms.push("values"); }
        if self.discriminator.is_some() { forms.push("discriminator"); }
        forms
    }

    fn declares_property(&self, name: &str) -> bool {
        self.properties.as_ref().is_some_and(|m| m.contains_key(name))
            || self.optional_properties.as_ref().is_some_and(|m| m.contains_key(name))
    }
}

impl Discriminator {
    fn verify_mapping(&self) -> Result<(), InvalidSchemaError> {
        for (tag_value, sub) in &self.mapping {
            if sub.form() != Form::Properties {
                return Err(InvalidSchemaError::MappingNotProperties { tag_value: tag_value.clone() });
            }
            if sub.declares_property(&self.tag) {
                return Err(InvalidSchemaError::MappingRedefinesTag {
                    tag_value: tag_value.clone(),
                    tag: self.tag.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------- Deserialization ----------------------------- //

// Hand-written so that only JSON objects are accepted as schemas (a derived
// impl would also take arrays) and unknown keywords are skipped.

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaVisitor)
    }
}

struct SchemaVisitor;

impl<'de> Visitor<'de> for SchemaVisitor {
    type Value = Schema;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a schema object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Schema, A::Error> {
        let mut s = Schema::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "definitions" => fill::<_, A::Error>(&mut s.definitions, "definitions", map.next_value()?)?,
                "ref" => fill::<_, A::Error>(&mut s.ref_, "ref", map.next_value()?)?,
                "type" => fill::<_, A::Error>(&mut s.type_, "type", map.next_value()?)?,
                "enum" => fill::<_, A::Error>(&mut s.enum_, "enum", map.next_value::<EnumValues>()?.0)?,
                "elements" => fill::<_, A::Error>(&mut s.elements, "elements", map.next_value()?)?,
                "properties" => fill::<_, A::Error>(&mut s.properties, "properties", map.next_value()?)?,
                "optionalProperties" => {
                    fill::<_, A::Error>(&mut s.optional_properties, "optionalProperties", map.next_value()?)?
                }
                "additionalProperties" => {
                    fill::<_, A::Error>(&mut s.additional_properties, "additionalProperties", map.next_value()?)?
                }
                "values" => fill::<_, A::Error>(&mut s.values, "values", map.next_value()?)?,
                "discriminator" => fill::<_, A::Error>(&mut s.discriminator, "discriminator", map.next_value()?)?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(s)
    }
}

impl<'de> Deserialize<'de> for Discriminator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DiscriminatorVisitor)
    }
}

struct DiscriminatorVisitor;

impl<'de> Visitor<'de> for DiscriminatorVisitor {
    type Value = Discriminator;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a discriminator object with `tag` and `mapping`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Discriminator, A::Error> {
        let mut tag = None;
        let mut mapping = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "tag" => fill::<_, A::Error>(&mut tag, "tag", map.next_value()?)?,
                "mapping" => fill::<_, A::Error>(&mut mapping, "mapping", map.next_value()?)?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(Discriminator {
            tag: tag.ok_or_else(|| de::Error::missing_field("tag"))?,
            mapping: mapping.ok_or_else(|| de::Error::missing_field("mapping"))?,
        })
    }
}

/// Non-empty, duplicate-free list of strings.
struct EnumValues(IndexSet<String>);

impl<'de> Deserialize<'de> for EnumValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(de::Error::invalid_length(0, &"a non-empty array of strings"));
        }
        let mut values = IndexSet::with_capacity(raw.len());
        for value in raw {
            if values.contains(&value) {
                return Err(de::Error::custom(format!("duplicate enum value `{value}`")));
            }
            values.insert(value);
        }
        Ok(EnumValues(values))
    }
}

fn fill<T, E: de::Error>(slot: &mut Option<T>, key: &'static str, value: T) -> Result<(), E> {
    if slot.is_some() {
        return Err(E::duplicate_field(key));
    }
    *slot = Some(value);
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //
