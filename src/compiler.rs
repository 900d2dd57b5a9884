//! Validator compiler factory.
//!
//! [`CompilerFactory::configure`] runs once at startup and checks preferences
//! eagerly. For each host scope, [`CompilerFactory::build_validator`] binds a
//! frozen copy of the scope's external schemas into a [`ValidatorCompiler`].
//! The compiler turns route schemas into [`ValidationFunction`]s, which the
//! host calls once per request.
//!
//! # Examples
//!
//! ```rust
//! use schema_context_compiler::{CompilerFactory, CompilerOptions, HostOptions, SchemaFragment};
//! use schema_context_compiler::engine::Schema;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = CompilerFactory::configure(CompilerOptions::default())?;
//!
//! let mut bucket = factory.create_bucket(None);
//! bucket.add(SchemaFragment::new("x", json!(42)))?;
//!
//! let compiler = factory.build_validator(&bucket, &HostOptions::default());
//! let validate = compiler.compile(Schema::object().key("c", Schema::reference("$x")));
//!
//! assert!(validate.validate(json!({ "c": 42 })).is_valid());
//! assert_eq!(
//!     validate.validate(json!({ "c": 999 })).into_result().unwrap_err().to_string(),
//!     "\"c\" must be [ref:global:x]"
//! );
//! # Ok(())
//! # }
//! ```

use crate::bucket::{ContextBucket, ExternalSchemas, Snapshot};
use crate::diagnostics::{Diagnostics, EXTERNAL_SCHEMA_WITHOUT_BUCKET};
use crate::engine::{Engine, Extension, Schema, ValidationOptions, ValidationOutcome};
use crate::error::{ConfigResult, ConfigurationError, ValidationResult};
use crate::preferences::Preferences;
use log::{debug, info, trace};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by asynchronous validation.
pub type ValidationFuture = Pin<Box<dyn Future<Output = ValidationResult<Value>> + Send + 'static>>;

/// Options accepted by [`CompilerFactory::configure`].
#[derive(Clone, Default)]
pub struct CompilerOptions {
    /// Raw preferences; `None` selects [`Preferences::adapter_defaults`]
    pub preferences: Option<Value>,
    /// Produce functions that validate asynchronously
    pub async_validation: bool,
    /// Extension types, applied in order
    pub extensions: Vec<Arc<dyn Extension>>,
    /// Diagnostics to report through; a fresh log-backed one by default
    pub diagnostics: Option<Diagnostics>,
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("preferences", &self.preferences)
            .field("async_validation", &self.async_validation)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OptionsDocument {
    #[serde(default)]
    preferences: Option<Value>,
    #[serde(default)]
    async_validation: bool,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "preferences": {...}, "asyncValidation": bool }`.
    ///
    /// Unknown top-level keys are rejected here; preferences are only checked
    /// later, by [`CompilerFactory::configure`].
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let parsed: OptionsDocument = serde_json::from_str(document)
            .map_err(|source| ConfigurationError::InvalidOptions { source })?;
        Ok(Self {
            preferences: parsed.preferences,
            async_validation: parsed.async_validation,
            ..Self::default()
        })
    }

    pub fn with_preferences(mut self, preferences: Value) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_async_validation(mut self, enabled: bool) -> Self {
        self.async_validation = enabled;
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

/// Options the host passes along when building a validator for a scope.
///
/// They describe the host's own validator configuration and do not change
/// how this compiler validates.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    /// Scope name used in log output
    pub scope: Option<String>,
}

impl HostOptions {
    pub fn for_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
        }
    }
}

/// Which engine call produced functions perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Sync,
    Async,
}

/// Part of the request a route schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpPart {
    Body,
    Querystring,
    Params,
    Headers,
}

/// A route schema descriptor as handed over by the host.
#[derive(Debug, Clone)]
pub struct RouteSchema {
    pub schema: Schema,
    pub method: Option<String>,
    pub url: Option<String>,
    pub http_part: Option<HttpPart>,
}

impl RouteSchema {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            method: None,
            url: None,
            http_part: None,
        }
    }

    pub fn for_route(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self
    }

    pub fn with_part(mut self, http_part: HttpPart) -> Self {
        self.http_part = Some(http_part);
        self
    }
}

impl From<Schema> for RouteSchema {
    fn from(schema: Schema) -> Self {
        RouteSchema::new(schema)
    }
}

/// Configured factory for validator compilers.
#[derive(Debug, Clone)]
pub struct CompilerFactory {
    preferences: Arc<Preferences>,
    mode: ValidationMode,
    engine: Engine,
    diagnostics: Diagnostics,
}

impl CompilerFactory {
    /// Check the options and build the factory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for unknown or malformed preferences
    /// and for clashing extension type names.
    pub fn configure(options: CompilerOptions) -> ConfigResult<Self> {
        let preferences = match &options.preferences {
            Some(raw) => Preferences::from_value(raw)?,
            None => Preferences::adapter_defaults(),
        };
        let engine = Engine::new().extend(&options.extensions)?;
        let mode = if options.async_validation {
            ValidationMode::Async
        } else {
            ValidationMode::Sync
        };

        info!(
            "Configured validator compiler factory (mode: {:?}, extensions: {})",
            mode,
            options.extensions.len()
        );

        Ok(Self {
            preferences: Arc::new(preferences),
            mode,
            engine,
            diagnostics: options.diagnostics.unwrap_or_default(),
        })
    }

    /// Create a schema context bucket for a new scope.
    pub fn create_bucket(&self, parent: Option<&Snapshot>) -> ContextBucket {
        ContextBucket::create(parent)
    }

    /// Bind external schemas into a compiler.
    ///
    /// A non-empty [`ExternalSchemas::Raw`] map raises the
    /// [`EXTERNAL_SCHEMA_WITHOUT_BUCKET`] diagnostic; the returned compiler
    /// behaves the same either way.
    pub fn build_validator(
        &self,
        schemas: impl Into<ExternalSchemas>,
        host: &HostOptions,
    ) -> ValidatorCompiler {
        let schemas = schemas.into();
        if let ExternalSchemas::Raw(raw) = &schemas {
            if !raw.is_empty() {
                self.diagnostics.emit(EXTERNAL_SCHEMA_WITHOUT_BUCKET);
            }
        }

        debug!(
            "Building validator for scope '{}' with {} external schemas",
            host.scope.as_deref().unwrap_or("root"),
            schemas.snapshot().len()
        );

        ValidatorCompiler {
            binding: Arc::new(CompilerBinding {
                preferences: Arc::clone(&self.preferences),
                schemas,
                mode: self.mode,
                engine: self.engine.clone(),
            }),
        }
    }

    /// The engine handle including configured extensions.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }
}

/// Everything a compiler is bound to.
#[derive(Debug)]
struct CompilerBinding {
    preferences: Arc<Preferences>,
    schemas: ExternalSchemas,
    mode: ValidationMode,
    engine: Engine,
}

impl CompilerBinding {
    fn options(&self) -> ValidationOptions<'_> {
        ValidationOptions {
            preferences: &self.preferences,
            context: self.schemas.snapshot(),
        }
    }
}

/// Compiler bound to one scope's external schemas.
#[derive(Debug, Clone)]
pub struct ValidatorCompiler {
    binding: Arc<CompilerBinding>,
}

impl ValidatorCompiler {
    /// Produce the validation function for a route schema.
    pub fn compile(&self, route: impl Into<RouteSchema>) -> ValidationFunction {
        let route = route.into();
        trace!(
            "Compiling {:?} validator for {} {}",
            route.http_part,
            route.method.as_deref().unwrap_or("*"),
            route.url.as_deref().unwrap_or("*")
        );
        ValidationFunction {
            schema: Arc::new(route.schema),
            binding: Arc::clone(&self.binding),
        }
    }

    /// The external schemas this compiler resolves references against.
    pub fn schemas(&self) -> &ExternalSchemas {
        &self.binding.schemas
    }

    pub fn engine(&self) -> &Engine {
        &self.binding.engine
    }

    pub fn mode(&self) -> ValidationMode {
        self.binding.mode
    }
}

/// Per-route validation function.
///
/// Cheap to clone and safe to share between concurrent requests.
#[derive(Debug, Clone)]
pub struct ValidationFunction {
    schema: Arc<Schema>,
    binding: Arc<CompilerBinding>,
}

impl ValidationFunction {
    /// Validate according to the configured mode.
    pub fn execute(&self, data: Value) -> Validation {
        match self.binding.mode {
            ValidationMode::Sync => Validation::Ready(self.validate(data)),
            ValidationMode::Async => {
                let schema = Arc::clone(&self.schema);
                let binding = Arc::clone(&self.binding);
                Validation::Pending(Box::pin(async move {
                    let options = binding.options();
                    schema.validate_async(data, &options).await
                }))
            }
        }
    }

    /// Validate synchronously regardless of mode.
    pub fn validate(&self, data: Value) -> ValidationOutcome {
        self.schema.validate(data, &self.binding.options())
    }

    /// Validate asynchronously regardless of mode.
    pub async fn validate_async(&self, data: Value) -> ValidationResult<Value> {
        self.schema.validate_async(data, &self.binding.options()).await
    }

    pub fn mode(&self) -> ValidationMode {
        self.binding.mode
    }
}

/// Result of [`ValidationFunction::execute`].
pub enum Validation {
    /// Synchronous mode: the outcome is already known
    Ready(ValidationOutcome),
    /// Asynchronous mode: must be awaited
    Pending(ValidationFuture),
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Validation::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl Validation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Validation::Pending(_))
    }

    /// Wait for the outcome.
    pub async fn settle(self) -> ValidationResult<Value> {
        match self {
            Validation::Ready(outcome) => outcome.into_result(),
            Validation::Pending(future) => future.await,
        }
    }
}
