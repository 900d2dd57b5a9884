//! Scope trees driven through `SchemaScope`.

use crate::common::{default_factory, fragment};
use schema_context_compiler::SchemaScope;
use schema_context_compiler::engine::Schema;
use serde_json::json;
use std::sync::Arc;

fn refs(keys: &[&str]) -> Schema {
    keys.iter().fold(Schema::object(), |schema, id| {
        let key = format!("to{}", id.to_uppercase());
        schema.key(key, Schema::reference(&format!("${}", id)))
    })
}

#[test]
fn test_sibling_scopes_are_isolated() {
    let mut root = SchemaScope::root(Arc::new(default_factory()));
    root.add_schema(fragment("x", json!(42))).unwrap();

    let mut plugin_a = root.child("a");
    plugin_a.add_schema(fragment("y", json!(50))).unwrap();
    let invalid_y = plugin_a.route(refs(&["x", "y", "z"]));
    let valid_y = plugin_a.route(refs(&["x", "y"]));

    let mut plugin_b = root.child("b");
    plugin_b.add_schema(fragment("z", json!(60))).unwrap();
    let invalid_z = plugin_b.route(refs(&["x", "y", "z"]));
    let valid_z = plugin_b.route(refs(&["x", "z"]));

    let error = invalid_y
        .validate(json!({ "toX": 42, "toY": 50, "toZ": 60 }))
        .error
        .expect("z is not visible from scope a");
    assert_eq!(error.message(), "\"toZ\" must be [ref:global:z]");

    assert!(valid_y.validate(json!({ "toX": 42, "toY": 50 })).is_valid());

    let error = invalid_z
        .validate(json!({ "toX": 42, "toY": 50, "toZ": 60 }))
        .error
        .expect("y is not visible from scope b");
    assert_eq!(error.message(), "\"toY\" must be [ref:global:y]");

    assert!(valid_z.validate(json!({ "toX": 42, "toZ": 60 })).is_valid());
}

#[test]
fn test_scope_introspection() {
    let mut root = SchemaScope::root(Arc::new(default_factory()));
    root.add_schema(fragment("x", json!(42))).unwrap();
    assert_eq!(root.get_schema("x"), Some(&json!(42)));

    let error = root.add_schema(fragment("x", json!(1))).unwrap_err();
    assert_eq!(error.to_string(), "Schema with id \"x\" already declared");

    let mut child = root.child("child");
    child.add_schema(fragment("y", json!(50))).unwrap();
    assert_eq!(child.name(), "child");
    assert_eq!(child.get_schemas().len(), 2);
    assert_eq!(root.get_schemas().len(), 1);
}

#[test]
fn test_child_opened_before_parent_registration() {
    let mut root = SchemaScope::root(Arc::new(default_factory()));
    let mut early = root.child("early");
    root.add_schema(fragment("x", json!(42))).unwrap();

    let validate = early.route(refs(&["x"]));
    assert!(!validate.validate(json!({ "toX": 42 })).is_valid());
}

#[test]
fn test_nested_scopes_inherit_transitively() {
    let mut root = SchemaScope::root(Arc::new(default_factory()));
    root.add_schema(fragment("x", json!(1))).unwrap();
    let mut middle = root.child("middle");
    middle.add_schema(fragment("y", json!(2))).unwrap();
    let mut leaf = middle.child("leaf");
    leaf.add_schema(fragment("z", json!(3))).unwrap();

    let validate = leaf.route(refs(&["x", "y", "z"]));
    assert!(validate.validate(json!({ "toX": 1, "toY": 2, "toZ": 3 })).is_valid());
    assert!(middle.get_schema("z").is_none());
}

#[test]
fn test_compiler_reused_until_bucket_changes() {
    let mut root = SchemaScope::root(Arc::new(default_factory()));
    root.add_schema(fragment("x", json!(1))).unwrap();

    let first = root.validator_compiler();
    let second = root.validator_compiler();
    assert!(first.schemas().snapshot().same_as(second.schemas().snapshot()));

    root.add_schema(fragment("y", json!(2))).unwrap();
    let third = root.validator_compiler();
    assert!(!first.schemas().snapshot().same_as(third.schemas().snapshot()));
    assert_eq!(third.schemas().snapshot().get("y"), Some(&json!(2)));
    assert!(third.schemas().is_bucket());
}
