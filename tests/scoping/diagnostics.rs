//! The external-schema-without-bucket diagnostic.

use crate::common::{fragment, recording_factory};
use schema_context_compiler::engine::Schema;
use schema_context_compiler::{
    CompilerOptions, Diagnostics, EXTERNAL_SCHEMA_WITHOUT_BUCKET, EmitPolicy, HostOptions,
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

fn raw_schemas() -> HashMap<String, Value> {
    HashMap::from([(
        "test".to_string(),
        json!({ "type": "object", "properties": {} }),
    )])
}

#[test]
fn test_plain_map_emits_once() {
    let (factory, sink) = recording_factory(CompilerOptions::default());

    factory.build_validator(raw_schemas(), &HostOptions::default());
    factory.build_validator(raw_schemas(), &HostOptions::default());

    assert_eq!(sink.codes(), vec![EXTERNAL_SCHEMA_WITHOUT_BUCKET]);
    assert!(factory.diagnostics().has_emitted(EXTERNAL_SCHEMA_WITHOUT_BUCKET));
}

#[test]
fn test_bucket_never_emits() {
    let (factory, sink) = recording_factory(CompilerOptions::default());
    let mut bucket = factory.create_bucket(None);
    bucket.add(fragment("x", json!(42))).unwrap();

    factory.build_validator(&bucket, &HostOptions::default());
    factory.build_validator(bucket.get_all(), &HostOptions::default());

    assert_eq!(sink.count(), 0);
}

#[test]
fn test_empty_plain_map_never_emits() {
    let (factory, sink) = recording_factory(CompilerOptions::default());
    factory.build_validator(Map::new(), &HostOptions::default());
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_reset_allows_another_signal() {
    let (factory, sink) = recording_factory(CompilerOptions::default());

    factory.build_validator(raw_schemas(), &HostOptions::default());
    factory.diagnostics().reset();
    factory.build_validator(raw_schemas(), &HostOptions::default());

    assert_eq!(sink.count(), 2);
}

#[test]
fn test_always_policy_reports_every_time() {
    let sink = Arc::new(crate::common::RecordingSink::default());
    let diagnostics = Diagnostics::new(sink.clone()).with_policy(EmitPolicy::Always);
    let factory = schema_context_compiler::CompilerFactory::configure(
        CompilerOptions::new().with_diagnostics(diagnostics),
    )
    .unwrap();

    factory.build_validator(raw_schemas(), &HostOptions::default());
    factory.build_validator(raw_schemas(), &HostOptions::default());

    assert_eq!(sink.count(), 2);
}

#[test]
fn test_factories_do_not_share_signal_state() {
    let (first, first_sink) = recording_factory(CompilerOptions::default());
    let (second, second_sink) = recording_factory(CompilerOptions::default());

    first.build_validator(raw_schemas(), &HostOptions::default());
    second.build_validator(raw_schemas(), &HostOptions::default());

    assert_eq!(first_sink.count(), 1);
    assert_eq!(second_sink.count(), 1);
}

#[test]
fn test_signal_does_not_change_validation() {
    let (factory, _sink) = recording_factory(CompilerOptions::default());
    let raw = HashMap::from([("x".to_string(), json!(42))]);

    let validate = factory
        .build_validator(raw, &HostOptions::default())
        .compile(Schema::object().key("c", Schema::reference("$x")));

    assert!(validate.validate(json!({ "c": 42 })).is_valid());
    assert!(!validate.validate(json!({ "c": 41 })).is_valid());
}

#[test]
fn test_map_copied_from_bucket_still_signals() {
    let (factory, sink) = recording_factory(CompilerOptions::default());
    let mut bucket = factory.create_bucket(None);
    bucket.add(fragment("test", json!(1))).unwrap();

    let compiler = factory.build_validator(bucket.get_all().to_map(), &HostOptions::default());

    assert!(!compiler.schemas().is_bucket());
    assert_eq!(sink.codes(), vec![EXTERNAL_SCHEMA_WITHOUT_BUCKET]);
    assert_eq!(compiler.schemas().snapshot().get("test"), Some(&json!(1)));
}
