//! Runs the portable JSON suite in `suite/` against the public API.
//!
//! The same files drive `dev-test-runner`; expected paths are the exact
//! token arrays any conforming implementation must produce.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use jddf::{Schema, ValidationError};

#[derive(Deserialize)]
struct Case {
    schema: Value,
    instance: Value,
    errors: Vec<ValidationError>,
}

fn validation_cases() -> IndexMap<String, Case> {
    serde_json::from_str(include_str!("../suite/validation.json")).unwrap()
}

fn invalid_schemas() -> IndexMap<String, Value> {
    serde_json::from_str(include_str!("../suite/invalid_schemas.json")).unwrap()
}

#[test]
fn validation_suite() {
    let mut failures = Vec::new();
    for (name, case) in validation_cases() {
        let schema = Schema::from_json(&case.schema)
            .unwrap_or_else(|e| panic!("{name}: schema did not deserialize: {e}"));
        schema
            .verify()
            .unwrap_or_else(|e| panic!("{name}: schema did not verify: {e}"));
        let actual = jddf::validate(&schema, &case.instance).unwrap();
        if actual != case.errors {
            failures.push(format!("{name}\n  expected: {:?}\n  actual:   {actual:?}", case.errors));
        }
    }
    assert!(failures.is_empty(), "{} case(s) failed:\n{}", failures.len(), failures.join("\n"));
}

#[test]
fn invalid_schema_suite() {
    for (name, raw) in invalid_schemas() {
        let rejected = match Schema::from_json(&raw) {
            Err(_) => true,
            Ok(schema) => schema.verify().is_err(),
        };
        assert!(rejected, "{name}: schema was accepted");
    }
}

#[test]
fn suite_schemas_survive_a_wire_round_trip() {
    for (name, case) in validation_cases() {
        let schema = Schema::from_json(&case.schema).unwrap();
        let again = Schema::from_json(&schema.to_json().unwrap()).unwrap();
        assert_eq!(schema, again, "{name}");
    }
}
