//! Whole-call behaviour: limits, determinism, sharing one schema.
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};

use jddf::{Form, MaxDepthExceededError, Schema, ValidateOptions, Validator};

fn verified(value: Value) -> Schema {
    let schema = Schema::from_json(&value).unwrap();
    schema.verify().unwrap();
    schema
}

fn tree_schema() -> Schema {
    verified(json!({
        "definitions": {
            "node": {
                "properties": {"label": {"type": "string"}, "weight": {"type": "uint8"}},
                "optionalProperties": {"children": {"elements": {"ref": "node"}}}
            }
        },
        "ref": "node"
    }))
}

fn messy_tree() -> Value {
    json!({
        "label": 1,
        "weight": 300,
        "extra": true,
        "children": [
            {"label": "a", "weight": -1},
            {"weight": 2, "children": [{"label": null, "weight": 0.5}]}
        ]
    })
}

#[test]
fn repeated_calls_are_deterministic() {
    let schema = tree_schema();
    let first = jddf::validate(&schema, &messy_tree()).unwrap();
    let second = jddf::validate(&schema, &messy_tree()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 7);
}

#[test]
fn max_errors_yields_a_prefix_of_the_full_result() {
    let schema = tree_schema();
    let all = jddf::validate(&schema, &messy_tree()).unwrap();
    for n in 1..all.len() {
        let limited = Validator::new(ValidateOptions::default().with_max_errors(n))
            .validate(&schema, &messy_tree())
            .unwrap();
        assert_eq!(limited.len(), n);
        assert!(limited.iter().all(|e| all.contains(e)));
        assert_eq!(&limited[..], &all[..n]);
    }
    // a limit above the total changes nothing
    let roomy = Validator::new(ValidateOptions::default().with_max_errors(all.len() + 10))
        .validate(&schema, &messy_tree())
        .unwrap();
    assert_eq!(roomy, all);
}

#[test]
fn cyclic_definitions_hit_the_depth_bound() {
    let schema = verified(json!({
        "definitions": {
            "ping": {"ref": "pong"},
            "pong": {"ref": "ping"}
        },
        "ref": "ping"
    }));
    for depth in [1, 2, 10, 100] {
        let result = Validator::new(ValidateOptions::default().with_max_depth(depth)).validate(&schema, &json!({}));
        assert_eq!(result, Err(MaxDepthExceededError { max_depth: depth }));
    }
}

#[test]
fn depth_bound_aborts_even_with_errors_collected() {
    let schema = verified(json!({
        "definitions": {"loop": {"ref": "loop"}},
        "properties": {"a": {"type": "string"}, "b": {"ref": "loop"}}
    }));
    let result = Validator::new(ValidateOptions::default().with_max_depth(8))
        .validate(&schema, &json!({"a": 1, "b": null}));
    assert!(result.is_err());
}

#[test]
fn one_schema_many_threads() {
    let schema = Arc::new(tree_schema());
    let expected = jddf::validate(&schema, &messy_tree()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || jddf::validate(&schema, &messy_tree()).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn verified_schemas_classify_to_one_form() {
    let schema = tree_schema();
    assert_eq!(schema.form(), Form::Ref);
    let node = schema.definition("node").unwrap();
    assert_eq!(node.form(), Form::Properties);
    assert!(schema.verify().is_ok());
}
