//! Asynchronous external rules.
//!
//! External rules run after every synchronous rule has passed, in the order
//! they were declared, and only when validating asynchronously. A rule may
//! replace the value it was attached to. Its error is wrapped into a
//! [`ValidationError`](crate::error::ValidationError) with the original error
//! kept as the source.

use crate::bucket::Snapshot;
use crate::error::{BoxError, PathSegment};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// What an external rule can see besides its own value.
#[derive(Debug)]
pub struct ExternalContext<'a> {
    /// Path of the value the rule is attached to
    pub path: &'a [PathSegment],
    /// Schema context the validator was built with
    pub schemas: &'a Snapshot,
    /// The whole validated payload as it stands before this rule runs
    pub root: &'a Value,
}

/// An asynchronous rule, e.g. a lookup against another service.
///
/// Returning `Ok(Some(value))` replaces the validated value, `Ok(None)` keeps
/// it. Rules are not cancelled if the caller stops awaiting the validation.
#[async_trait]
pub trait ExternalRule: Send + Sync {
    async fn check(
        &self,
        value: &Value,
        context: &ExternalContext<'_>,
    ) -> Result<Option<Value>, BoxError>;
}

/// External rule backed by an async closure.
pub struct FnExternal<F> {
    f: F,
}

/// Wrap an async closure as an [`ExternalRule`].
///
/// ```rust
/// use schema_context_compiler::engine::{external_fn, Schema};
/// use schema_context_compiler::error::BoxError;
///
/// let schema = Schema::string().external(external_fn(|value| async move {
///     if value == "invalid" {
///         return Err::<Option<serde_json::Value>, BoxError>("rejected".into());
///     }
///     Ok(None)
/// }));
/// assert!(schema.has_externals());
/// ```
pub fn external_fn<F, Fut>(f: F) -> FnExternal<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, BoxError>> + Send,
{
    FnExternal { f }
}

#[async_trait]
impl<F, Fut> ExternalRule for FnExternal<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, BoxError>> + Send,
{
    async fn check(
        &self,
        value: &Value,
        _context: &ExternalContext<'_>,
    ) -> Result<Option<Value>, BoxError> {
        (self.f)(value.clone()).await
    }
}
