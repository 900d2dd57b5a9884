//! The validation engine behind the compiler.
//!
//! The compiler only needs "validate this payload against this schema with
//! these preferences and this reference context", synchronously or
//! asynchronously. This module provides that capability with a compact
//! schema model.
//!
//! # Key Types
//!
//! - [`Schema`] - Schema definition built with chained constructors
//! - [`Reference`] - `$name` context references and sibling paths
//! - [`Engine`] - Handle carrying the configured extension types
//! - [`ExternalRule`] - Asynchronous rule run after synchronous validation
//!
//! # Examples
//!
//! ```rust
//! use schema_context_compiler::engine::{Schema, ValidationOptions};
//! use schema_context_compiler::{Preferences, Snapshot};
//! use serde_json::json;
//!
//! let schema = Schema::object().key("name", Schema::string().required());
//! let preferences = Preferences::default();
//! let context = Snapshot::default();
//! let options = ValidationOptions { preferences: &preferences, context: &context };
//!
//! let outcome = schema.validate(json!({ "name": "fastify" }), &options);
//! assert!(outcome.is_valid());
//! ```

pub mod extension;
pub mod external;
pub mod reference;
pub mod types;
pub mod validation;


pub use extension::Extension;
pub use external::{ExternalContext, ExternalRule, FnExternal, external_fn};
pub use reference::{RefScope, Reference};
pub use types::{Allowed, Schema, SchemaKind};
pub use validation::{ValidationOptions, ValidationOutcome};

use crate::error::{ConfigResult, ConfigurationError};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Engine handle with its extension types.
///
/// Handles are cheap to clone. [`Engine::extend`] never modifies the handle it
/// is called on.
#[derive(Clone, Default)]
pub struct Engine {
    types: Arc<HashMap<String, Arc<dyn Extension>>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.type_names())
            .finish()
    }
}

impl Engine {
    /// Engine with the built-in types only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a handle that also knows the given extension types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateExtension`] when an extension
    /// reuses a type name that is already defined.
    pub fn extend(&self, extensions: &[Arc<dyn Extension>]) -> ConfigResult<Engine> {
        let mut types = self.types.as_ref().clone();
        for extension in extensions {
            let type_name = extension.type_name().to_string();
            if types.contains_key(&type_name) {
                return Err(ConfigurationError::DuplicateExtension { type_name });
            }
            debug!("Registering engine extension type '{}'", type_name);
            types.insert(type_name, Arc::clone(extension));
        }
        Ok(Engine {
            types: Arc::new(types),
        })
    }

    /// Start a schema of an extension type.
    pub fn schema(&self, type_name: &str) -> Option<Schema> {
        self.types
            .get(type_name)
            .map(|extension| Schema::custom(Arc::clone(extension)))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Extension type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
