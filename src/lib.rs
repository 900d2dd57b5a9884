//! Scoped schema contexts and validator compilers for request validation.
//!
//! A host framework registers named schema fragments per scope and asks this
//! crate for validation functions. Schemas reference fragments as `$id`; the
//! reference resolves against the fragments visible in the scope the
//! validator was built for.
//!
//! # Core Components
//!
//! - [`ContextBucket`] - Per-scope registry of schema fragments, forked into child scopes
//! - [`CompilerFactory`] - Configured once; builds a [`ValidatorCompiler`] per scope
//! - [`ValidationFunction`] - Per-route validator, synchronous or asynchronous
//! - [`SchemaScope`] - Host-side scope tree tying buckets and compilers together
//!
//! # Quick Start
//!
//! ```rust
//! use schema_context_compiler::{CompilerFactory, CompilerOptions, HostOptions, SchemaFragment};
//! use schema_context_compiler::engine::Schema;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = CompilerFactory::configure(
//!     CompilerOptions::new().with_preferences(json!({ "allowUnknown": true })),
//! )?;
//!
//! let mut bucket = factory.create_bucket(None);
//! bucket.add(SchemaFragment::new("x", json!(42)))?;
//!
//! let validate = factory
//!     .build_validator(&bucket, &HostOptions::default())
//!     .compile(Schema::object().key("c", Schema::reference("$x")));
//!
//! assert!(validate.validate(json!({ "c": 42, "extra": true })).is_valid());
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod compiler;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod preferences;
pub mod scope;

// Re-export commonly used types for convenience
pub use bucket::{ContextBucket, ExternalSchemas, SchemaFragment, Snapshot};
pub use compiler::{
    CompilerFactory, CompilerOptions, HostOptions, HttpPart, RouteSchema, Validation,
    ValidationFunction, ValidationMode, ValidatorCompiler,
};
pub use diagnostics::{
    Diagnostic, DiagnosticSink, Diagnostics, EXTERNAL_SCHEMA_WITHOUT_BUCKET, EmitPolicy, LogSink,
};
pub use error::{BucketError, CompilerError, ConfigurationError, ValidationError};
pub use preferences::{Preferences, Presence};
pub use scope::SchemaScope;
