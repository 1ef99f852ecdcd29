//! Validation VM.
//!
//! Walks a schema and an instance in lock-step and records every place the
//! instance is rejected. Paths are kept as token stacks:
//! - `instance_tokens`: one flat stack into the instance.
//! - `schema_tokens`: a stack of frames, one per `ref` hop. A hop starts a
//!   fresh frame at `["definitions", name]`, and errors only report the
//!   current frame, so referenced schemas always report relative to their
//!   own definition.
//!
//! The walk stops early on the error limit (not an error) or on the ref
//! depth limit (fatal). Both travel up the recursion as [`Halt`].
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MaxDepthExceededError;
use crate::form::Shape;
use crate::schema::{Discriminator, Schema};

// ------------------------------ Options ----------------------------------- //

/// Termination controls. `None` (or `0`) means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Bound on the ref chain, counting the root schema as one level, so
    /// `max_depth` D allows at most D - 1 nested `ref` hops.
    pub max_depth: Option<usize>,
    /// Stop after collecting this many errors.
    pub max_errors: Option<usize>,
}

impl ValidateOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = Some(max_errors);
        self
    }
}

// ------------------------------- Errors ----------------------------------- //

/// One rejection. Both paths are JSON Pointer tokens without the leading
/// empty segment; their wire shape is portable across implementations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub instance_path: Vec<String>,
    pub schema_path: Vec<String>,
}

impl ValidationError {
    pub fn instance_pointer(&self) -> String {
        to_pointer(&self.instance_path)
    }

    pub fn schema_pointer(&self) -> String {
        to_pointer(&self.schema_path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance `{}` rejected by schema `{}`", self.instance_pointer(), self.schema_pointer())
    }
}

/// RFC 6901 rendering: `~` → `~0`, `/` → `~1`.
fn to_pointer(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect()
}

// ------------------------------ Front API --------------------------------- //

/// Reusable and stateless between calls; each call gets its own scratch VM,
/// so one validator (and one frozen schema) can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    pub options: ValidateOptions,
}

impl Validator {
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }

    /// Errors in discovery order. `schema` is treated as the root for `ref`
    /// lookups and should already have passed [`Schema::verify`].
    pub fn validate(&self, schema: &Schema, instance: &Value) -> Result<Vec<ValidationError>, MaxDepthExceededError> {
        let _span = tracing::debug_span!(
            "validate",
            max_depth = ?self.options.max_depth,
            max_errors = ?self.options.max_errors,
        )
        .entered();
        tracing::debug!(form = %schema.form(), "validation started");
        let mut vm = Vm::new(schema, self.options);
        let outcome = vm.eval(schema, instance, None);
        match outcome {
            Ok(()) => {
                tracing::debug!(errors = vm.errors.len(), "validation finished");
                Ok(vm.errors)
            }
            Err(Halt::MaxErrors) => {
                tracing::debug!(errors = vm.errors.len(), "validation stopped at error limit");
                Ok(vm.errors)
            }
            Err(Halt::MaxDepth(max_depth)) => {
                tracing::debug!(max_depth, "validation aborted: ref chain too deep");
                Err(MaxDepthExceededError { max_depth })
            }
        }
    }
}

/// Validate with no limits.
pub fn validate(schema: &Schema, instance: &Value) -> Result<Vec<ValidationError>, MaxDepthExceededError> {
    Validator::default().validate(schema, instance)
}

// --------------------------------- VM ------------------------------------- //

/// Why the walk stopped before finishing.
#[derive(Debug)]
enum Halt {
    MaxErrors,
    MaxDepth(usize),
}

type Step = Result<(), Halt>;

struct Vm<'a> {
    root: &'a Schema,
    max_depth: Option<usize>,
    max_errors: Option<usize>,
    instance_tokens: Vec<String>,
    schema_tokens: Vec<Vec<String>>,
    errors: Vec<ValidationError>,
}

impl<'a> Vm<'a> {
    fn new(root: &'a Schema, options: ValidateOptions) -> Self {
        Self {
            root,
            max_depth: options.max_depth.filter(|&n| n > 0),
            max_errors: options.max_errors.filter(|&n| n > 0),
            instance_tokens: Vec::new(),
            schema_tokens: vec![Vec::new()],
            errors: Vec::new(),
        }
    }

    fn eval(&mut self, schema: &'a Schema, instance: &Value, parent_tag: Option<&str>) -> Step {
        match schema.shape() {
            Shape::Empty => Ok(()),
            Shape::Ref(name) => {
                if let Some(max_depth) = self.max_depth {
                    if self.schema_tokens.len() >= max_depth {
                        return Err(Halt::MaxDepth(max_depth));
                    }
                }
                // verify() guarantees the definition exists; an unverified
                // dangling ref is treated as the empty schema.
                let Some(target) = self.root.definition(name) else { return Ok(()) };
                tracing::trace!(definition = name, depth = self.schema_tokens.len(), "following ref");
                self.schema_tokens.push(vec!["definitions".to_owned(), name.to_owned()]);
                let step = self.eval(target, instance, None);
                self.schema_tokens.pop();
                step
            }
            Shape::Type(type_) => {
                self.push_schema_token("type");
                let step = if type_.accepts(instance) { Ok(()) } else { self.push_error() };
                self.pop_schema_token();
                step
            }
            Shape::Enum(values) => {
                self.push_schema_token("enum");
                let known = instance.as_str().is_some_and(|s| values.contains(s));
                let step = if known { Ok(()) } else { self.push_error() };
                self.pop_schema_token();
                step
            }
            Shape::Elements(sub) => {
                self.push_schema_token("elements");
                let step = self.eval_elements(sub, instance);
                self.pop_schema_token();
                step
            }
            Shape::Properties { required, optional, additional } => {
                let Value::Object(members) = instance else {
                    let keyword = if required.is_some() { "properties" } else { "optionalProperties" };
                    self.push_schema_token(keyword);
                    let step = self.push_error();
                    self.pop_schema_token();
                    return step;
                };

                if let Some(required) = required {
                    self.push_schema_token("properties");
                    for (key, sub) in required {
                        self.push_schema_token(key);
                        let step = match members.get(key) {
                            Some(value) => self.eval_member(key, sub, value),
                            None => self.push_error(),
                        };
                        self.pop_schema_token();
                        step?;
                    }
                    self.pop_schema_token();
                }

                if let Some(optional) = optional {
                    self.push_schema_token("optionalProperties");
                    for (key, sub) in optional {
                        if let Some(value) = members.get(key) {
                            self.push_schema_token(key);
                            let step = self.eval_member(key, sub, value);
                            self.pop_schema_token();
                            step?;
                        }
                    }
                    self.pop_schema_token();
                }

                if !additional {
                    for key in members.keys() {
                        let declared = required.is_some_and(|m| m.contains_key(key))
                            || optional.is_some_and(|m| m.contains_key(key))
                            || parent_tag == Some(key.as_str());
                        if !declared {
                            self.push_instance_token(key);
                            let step = self.push_error();
                            self.pop_instance_token();
                            step?;
                        }
                    }
                }
                Ok(())
            }
            Shape::Values(sub) => {
                self.push_schema_token("values");
                let step = match instance {
                    Value::Object(members) => members
                        .iter()
                        .try_for_each(|(key, value)| self.eval_member(key, sub, value)),
                    _ => self.push_error(),
                };
                self.pop_schema_token();
                step
            }
            Shape::Discriminator(discriminator) => {
                self.push_schema_token("discriminator");
                let step = self.eval_discriminator(discriminator, instance);
                self.pop_schema_token();
                step
            }
        }
    }

    fn eval_elements(&mut self, sub: &'a Schema, instance: &Value) -> Step {
        let Value::Array(items) = instance else { return self.push_error() };
        for (index, item) in items.iter().enumerate() {
            self.push_instance_token(&index.to_string());
            let step = self.eval(sub, item, None);
            self.pop_instance_token();
            step?;
        }
        Ok(())
    }

    fn eval_discriminator(&mut self, discriminator: &'a Discriminator, instance: &Value) -> Step {
        let Value::Object(members) = instance else { return self.push_error() };
        let tag = discriminator.tag.as_str();

        let Some(tag_value) = members.get(tag) else {
            self.push_schema_token("tag");
            let step = self.push_error();
            self.pop_schema_token();
            return step;
        };

        let Value::String(tag_value) = tag_value else {
            self.push_schema_token("tag");
            self.push_instance_token(tag);
            let step = self.push_error();
            self.pop_instance_token();
            self.pop_schema_token();
            return step;
        };

        self.push_schema_token("mapping");
        let step = match discriminator.mapping.get(tag_value) {
            Some(sub) => {
                self.push_schema_token(tag_value);
                let step = self.eval(sub, instance, Some(tag));
                self.pop_schema_token();
                step
            }
            None => {
                self.push_instance_token(tag);
                let step = self.push_error();
                self.pop_instance_token();
                step
            }
        };
        self.pop_schema_token();
        step
    }

    /// Descend into an object member, keyed on the instance stack.
    fn eval_member(&mut self, key: &str, sub: &'a Schema, value: &Value) -> Step {
        self.push_instance_token(key);
        let step = self.eval(sub, value, None);
        self.pop_instance_token();
        step
    }

    // ---- token stacks ----

    fn push_instance_token(&mut self, token: &str) {
        self.instance_tokens.push(token.to_owned());
    }

    fn pop_instance_token(&mut self) {
        self.instance_tokens.pop();
    }

    fn push_schema_token(&mut self, token: &str) {
        if let Some(frame) = self.schema_tokens.last_mut() {
            frame.push(token.to_owned());
        }
    }

    fn pop_schema_token(&mut self) {
        if let Some(frame) = self.schema_tokens.last_mut() {
            frame.pop();
        }
    }

    fn push_error(&mut self) -> Step {
        self.errors.push(ValidationError {
            instance_path: self.instance_tokens.clone(),
            schema_path: self.schema_tokens.last().cloned().unwrap_or_default(),
        });
        match self.max_errors {
            Some(max) if self.errors.len() >= max => Err(Halt::MaxErrors),
            _ => Ok(()),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
