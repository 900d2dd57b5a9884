//! Host-side schema scopes.
//!
//! A [`SchemaScope`] is what a host framework keeps per encapsulated plugin
//! context: the scope's bucket plus the compiler built from it. Child scopes
//! fork the parent's bucket at the moment they are opened. The compiler is
//! built lazily and rebuilt only when the bucket changed since the last build.
//!
//! ```rust
//! use schema_context_compiler::{CompilerFactory, CompilerOptions, SchemaFragment, SchemaScope};
//! use schema_context_compiler::engine::Schema;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = Arc::new(CompilerFactory::configure(CompilerOptions::default())?);
//! let mut root = SchemaScope::root(factory);
//! root.add_schema(SchemaFragment::new("x", json!(42)))?;
//!
//! let mut plugin = root.child("plugin");
//! plugin.add_schema(SchemaFragment::new("y", json!(50)))?;
//!
//! let validate = plugin.route(
//!     Schema::object()
//!         .key("toX", Schema::reference("$x"))
//!         .key("toY", Schema::reference("$y")),
//! );
//! assert!(validate.validate(json!({ "toX": 42, "toY": 50 })).is_valid());
//! assert!(root.get_schema("y").is_none());
//! # Ok(())
//! # }
//! ```

use crate::bucket::{ContextBucket, SchemaFragment, Snapshot};
use crate::compiler::{
    CompilerFactory, HostOptions, RouteSchema, ValidationFunction, ValidatorCompiler,
};
use crate::error::BucketResult;
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// One node of the host's scope tree.
#[derive(Debug)]
pub struct SchemaScope {
    name: String,
    factory: Arc<CompilerFactory>,
    bucket: ContextBucket,
    compiled: Option<(Snapshot, ValidatorCompiler)>,
}

impl SchemaScope {
    /// The root scope, with an empty bucket.
    pub fn root(factory: Arc<CompilerFactory>) -> Self {
        let bucket = factory.create_bucket(None);
        Self {
            name: "root".to_string(),
            factory,
            bucket,
            compiled: None,
        }
    }

    /// Open a nested scope inheriting everything registered here so far.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Opening scope '{}' under '{}'", name, self.name);
        Self {
            bucket: self.factory.create_bucket(Some(&self.bucket.get_all())),
            factory: Arc::clone(&self.factory),
            name,
            compiled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a fragment in this scope.
    pub fn add_schema(&mut self, fragment: SchemaFragment) -> BucketResult<()> {
        self.bucket.add(fragment)
    }

    pub fn get_schema(&self, id: &str) -> Option<&Value> {
        self.bucket.get(id)
    }

    /// Everything visible in this scope.
    pub fn get_schemas(&self) -> Snapshot {
        self.bucket.get_all()
    }

    /// The compiler for the scope's current schemas.
    pub fn validator_compiler(&mut self) -> ValidatorCompiler {
        let current = self.bucket.get_all();
        if let Some((snapshot, compiler)) = &self.compiled {
            if snapshot.same_as(&current) {
                return compiler.clone();
            }
        }

        let compiler = self
            .factory
            .build_validator(current.clone(), &HostOptions::for_scope(self.name.clone()));
        self.compiled = Some((current, compiler.clone()));
        compiler
    }

    /// Compile a route schema with this scope's compiler.
    pub fn route(&mut self, route: impl Into<RouteSchema>) -> ValidationFunction {
        self.validator_compiler().compile(route)
    }
}
