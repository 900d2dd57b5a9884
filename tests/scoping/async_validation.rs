//! Asynchronous validation mode.

use crate::common::{fragment, init_logging, recording_factory};
use futures::future::join_all;
use schema_context_compiler::engine::{ExternalContext, ExternalRule, Schema, external_fn};
use schema_context_compiler::error::{BoxError, ErrorKind};
use schema_context_compiler::{
    CompilerFactory, CompilerOptions, HostOptions, Validation, ValidationMode,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

fn async_factory() -> CompilerFactory {
    init_logging();
    CompilerFactory::configure(CompilerOptions::new().with_async_validation(true)).unwrap()
}

fn rejects_invalid() -> Schema {
    Schema::string().external(external_fn(|value| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        if value == "invalid" {
            return Err::<Option<Value>, BoxError>("Invalid value".into());
        }
        Ok(None)
    }))
}

/// Rule that checks the value against a fragment in the schema context.
struct MatchesFragment(&'static str);

#[async_trait::async_trait]
impl ExternalRule for MatchesFragment {
    async fn check(
        &self,
        value: &Value,
        context: &ExternalContext<'_>,
    ) -> Result<Option<Value>, BoxError> {
        match context.schemas.get(self.0) {
            Some(expected) if expected == value => Ok(None),
            _ => Err(format!("does not match {}", self.0).into()),
        }
    }
}

#[tokio::test]
async fn test_external_rule_rejection_and_success() {
    let factory = async_factory();
    let validate = factory
        .build_validator(&factory.create_bucket(None), &HostOptions::default())
        .compile(rejects_invalid());
    assert_eq!(validate.mode(), ValidationMode::Async);

    let pending = validate.execute(json!("invalid"));
    assert!(pending.is_pending());
    let error = pending.settle().await.unwrap_err();
    assert_eq!(error.message(), "Invalid value (value)");
    assert!(error.has_kind(ErrorKind::External));
    assert_eq!(
        std::error::Error::source(&error).map(|cause| cause.to_string()),
        Some("Invalid value".to_string())
    );

    let value = validate.execute(json!("lightMyRequest")).settle().await.unwrap();
    assert_eq!(value, json!("lightMyRequest"));
}

#[tokio::test]
async fn test_rule_failures_reject_before_externals() {
    let factory = async_factory();
    let validate = factory
        .build_validator(&factory.create_bucket(None), &HostOptions::default())
        .compile(Schema::object().key("name", rejects_invalid().required()));

    let error = validate.execute(json!({})).settle().await.unwrap_err();
    assert_eq!(error.message(), "\"name\" is required");
    assert!(error.cause().is_none());
}

#[tokio::test]
async fn test_async_mode_resolves_bucket_references() {
    let factory = async_factory();
    let mut bucket = factory.create_bucket(None);
    bucket.add(fragment("x", json!(42))).unwrap();

    let validate = factory
        .build_validator(&bucket, &HostOptions::default())
        .compile(Schema::object().key("c", Schema::reference("$x")));

    assert!(validate.execute(json!({ "c": 42 })).settle().await.is_ok());
    let error = validate.execute(json!({ "c": 1 })).settle().await.unwrap_err();
    assert_eq!(error.message(), "\"c\" must be [ref:global:x]");
}

#[tokio::test]
async fn test_async_mode_with_plain_map_injects_context() {
    let (factory, sink) =
        recording_factory(CompilerOptions::new().with_async_validation(true));
    let raw = HashMap::from([("token".to_string(), json!("abc"))]);

    let validate = factory
        .build_validator(raw, &HostOptions::default())
        .compile(
            Schema::object()
                .key("ref", Schema::reference("$token"))
                .key("checked", Schema::string().external(MatchesFragment("token"))),
        );

    let value = validate
        .execute(json!({ "ref": "abc", "checked": "abc" }))
        .settle()
        .await
        .unwrap();
    assert_eq!(value, json!({ "ref": "abc", "checked": "abc" }));

    let error = validate
        .execute(json!({ "ref": "abc", "checked": "xyz" }))
        .settle()
        .await
        .unwrap_err();
    assert_eq!(error.message(), "does not match token (checked)");
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_sync_mode_returns_ready_outcome() {
    let (factory, _sink) = recording_factory(CompilerOptions::default());
    let validate = factory
        .build_validator(&factory.create_bucket(None), &HostOptions::default())
        .compile(Schema::number());

    match validate.execute(json!("7")) {
        Validation::Ready(outcome) => assert_eq!(outcome.into_result().unwrap(), json!(7)),
        Validation::Pending(_) => panic!("sync mode must not suspend"),
    }

    // The async path stays available on a sync-mode function.
    assert_eq!(validate.validate_async(json!(3)).await.unwrap(), json!(3));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_function() {
    let factory = async_factory();
    let mut bucket = factory.create_bucket(None);
    bucket.add(fragment("x", json!(42))).unwrap();

    let validate = factory
        .build_validator(&bucket, &HostOptions::default())
        .compile(
            Schema::object()
                .key("c", Schema::reference("$x"))
                .key("name", rejects_invalid()),
        );

    let handles = (0..32).map(|i| {
        let validate = validate.clone();
        tokio::spawn(async move {
            let name = if i % 2 == 0 { "ok" } else { "invalid" };
            validate
                .execute(json!({ "c": 42, "name": name }))
                .settle()
                .await
                .is_ok()
        })
    });

    let results: Vec<bool> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task completed"))
        .collect();

    assert_eq!(results.iter().filter(|ok| **ok).count(), 16);
    for (i, ok) in results.iter().enumerate() {
        assert_eq!(*ok, i % 2 == 0);
    }
}

#[test]
fn test_blocking_on_validation_future() {
    let factory = async_factory();
    let validate = factory
        .build_validator(&factory.create_bucket(None), &HostOptions::default())
        .compile(Schema::string().external(external_fn(|_| async {
            Ok::<_, BoxError>(Some(json!("replaced")))
        })));

    let value = tokio_test::block_on(validate.execute(json!("original")).settle()).unwrap();
    assert_eq!(value, json!("replaced"));
}
