//! Bucket registration and fork isolation.

use crate::common::{default_factory, fragment};
use proptest::prelude::*;
use schema_context_compiler::{BucketError, ContextBucket, SchemaFragment};
use serde_json::json;
use std::collections::{HashMap, HashSet};

#[test]
fn test_get_all_returns_registered_fragments() {
    let factory = default_factory();
    let mut bucket = factory.create_bucket(None);

    bucket.add(fragment("x", json!(42))).unwrap();
    bucket.add(fragment("y", json!({ "nested": true }))).unwrap();

    let all = bucket.get_all();
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("x"), Some(&json!(42)));
    assert_eq!(all.get("y"), Some(&json!({ "nested": true })));
}

#[test]
fn test_duplicate_registration_error() {
    let factory = default_factory();
    let mut bucket = factory.create_bucket(None);
    bucket.add(fragment("x", json!(42))).unwrap();

    let error = bucket.add(fragment("x", json!(1))).unwrap_err();
    assert_eq!(error.to_string(), "Schema with id \"x\" already declared");
    assert_eq!(bucket.get("x"), Some(&json!(42)));
}

#[test]
fn test_missing_id_is_not_an_error() {
    let bucket = default_factory().create_bucket(None);
    assert_eq!(bucket.get("nope"), None);
}

#[test]
fn test_fork_does_not_propagate_either_way() {
    let factory = default_factory();
    let mut parent = factory.create_bucket(None);
    parent.add(fragment("x", json!(1))).unwrap();

    let mut child = factory.create_bucket(Some(&parent.get_all()));
    child.add(fragment("y", json!(2))).unwrap();
    parent.add(fragment("z", json!(3))).unwrap();

    let parent_ids: HashSet<_> = parent.get_all().keys().cloned().collect();
    let child_ids: HashSet<_> = child.get_all().keys().cloned().collect();
    assert_eq!(parent_ids, HashSet::from(["x".to_string(), "z".to_string()]));
    assert_eq!(child_ids, HashSet::from(["x".to_string(), "y".to_string()]));
}

#[test]
fn test_siblings_are_independent() {
    let factory = default_factory();
    let mut root = factory.create_bucket(None);
    root.add(fragment("x", json!(42))).unwrap();

    let mut a = factory.create_bucket(Some(&root.get_all()));
    let mut b = factory.create_bucket(Some(&root.get_all()));
    a.add(fragment("shared", json!("a"))).unwrap();
    // Same id in a sibling is not a duplicate.
    b.add(fragment("shared", json!("b"))).unwrap();

    assert_eq!(a.get("shared"), Some(&json!("a")));
    assert_eq!(b.get("shared"), Some(&json!("b")));
    assert!(root.get("shared").is_none());
}

#[test]
fn test_child_cannot_redeclare_inherited_id() {
    let factory = default_factory();
    let mut root = factory.create_bucket(None);
    root.add(fragment("x", json!(42))).unwrap();

    let mut child = factory.create_bucket(Some(&root.get_all()));
    assert_eq!(
        child.add(fragment("x", json!(0))),
        Err(BucketError::DuplicateSchema {
            id: "x".to_string()
        })
    );
}

fn fragment_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 0..20)
}

proptest! {
    #[test]
    fn test_adds_keep_exactly_the_distinct_ids(ids in fragment_ids()) {
        let mut bucket = ContextBucket::new();
        let mut expected = HashMap::new();

        for (position, id) in ids.iter().enumerate() {
            let result = bucket.add(SchemaFragment::new(id.clone(), json!(position)));
            if expected.contains_key(id) {
                prop_assert_eq!(result, Err(BucketError::DuplicateSchema { id: id.clone() }));
            } else {
                prop_assert!(result.is_ok());
                expected.insert(id.clone(), json!(position));
            }
        }

        prop_assert_eq!(bucket.get_all().to_map(), expected);
    }

    #[test]
    fn test_fork_invariant_holds(
        parent_ids in fragment_ids(),
        child_extra in "[A-Z]{1,6}",
        parent_extra in "[0-9]{1,6}",
    ) {
        let mut parent = ContextBucket::new();
        for id in &parent_ids {
            let _ = parent.add(SchemaFragment::new(id.clone(), json!(id)));
        }

        let mut child = ContextBucket::create(Some(&parent.get_all()));
        prop_assert!(child.add(SchemaFragment::new(child_extra.clone(), json!(1))).is_ok());
        prop_assert!(parent.add(SchemaFragment::new(parent_extra.clone(), json!(2))).is_ok());

        prop_assert!(parent.get(&child_extra).is_none());
        prop_assert!(child.get(&parent_extra).is_none());
        for id in &parent_ids {
            prop_assert_eq!(child.get(id), parent.get(id));
        }
    }
}
