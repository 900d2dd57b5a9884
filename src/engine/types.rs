//! Schema definitions understood by the engine.
//!
//! A [`Schema`] is built with chained constructors in the usual builder
//! style:
//!
//! ```rust
//! use schema_context_compiler::engine::Schema;
//!
//! let body = Schema::object()
//!     .key("a", Schema::reference("b.c"))
//!     .key("b", Schema::object().key("c", Schema::any()))
//!     .key("c", Schema::reference("$x"));
//! ```

use super::extension::Extension;
use super::external::ExternalRule;
use super::reference::Reference;
use crate::preferences::Presence;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Data type of a schema together with its type-specific constraints.
#[derive(Clone)]
pub enum SchemaKind {
    Any,
    Boolean,
    Number {
        integer: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        allow_empty: bool,
    },
    /// `keys: None` accepts any object
    Object {
        keys: Option<Vec<(String, Schema)>>,
        unknown: Option<bool>,
    },
    Array {
        items: Option<Box<Schema>>,
    },
    /// RFC 3339 timestamp
    Date,
    /// Base64 encoded bytes
    Binary,
    Custom(Arc<dyn Extension>),
}

impl SchemaKind {
    /// Type name used in debug output.
    pub fn name(&self) -> &str {
        match self {
            SchemaKind::Any => "any",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Number { .. } => "number",
            SchemaKind::String { .. } => "string",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Date => "date",
            SchemaKind::Binary => "binary",
            SchemaKind::Custom(extension) => extension.type_name(),
        }
    }
}

impl fmt::Debug for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Object {
                keys: Some(keys), ..
            } => f
                .debug_map()
                .entries(keys.iter().map(|(name, schema)| (name, schema)))
                .finish(),
            SchemaKind::Array { items: Some(items) } => f.debug_list().entry(items).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// A value accepted by [`Schema::valid`].
#[derive(Debug, Clone, PartialEq)]
pub enum Allowed {
    Literal(Value),
    Ref(Reference),
}

impl fmt::Display for Allowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allowed::Literal(Value::String(s)) => f.write_str(s),
            Allowed::Literal(value) => write!(f, "{}", value),
            Allowed::Ref(reference) => write!(f, "{}", reference),
        }
    }
}

impl From<Value> for Allowed {
    fn from(value: Value) -> Self {
        Allowed::Literal(value)
    }
}

impl From<Reference> for Allowed {
    fn from(reference: Reference) -> Self {
        Allowed::Ref(reference)
    }
}

/// A compiled schema.
#[derive(Clone)]
pub struct Schema {
    pub(crate) kind: SchemaKind,
    pub(crate) presence: Option<Presence>,
    pub(crate) allowed: Vec<Allowed>,
    pub(crate) default: Option<Value>,
    pub(crate) externals: Vec<Arc<dyn ExternalRule>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("presence", &self.presence)
            .field("allowed", &self.allowed)
            .field("default", &self.default)
            .field("externals", &self.externals.len())
            .finish()
    }
}

impl Schema {
    pub(crate) fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            presence: None,
            allowed: Vec::new(),
            default: None,
            externals: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number {
            integer: false,
            min: None,
            max: None,
        })
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String {
            min_length: None,
            max_length: None,
            allow_empty: false,
        })
    }

    /// Object schema; add keys with [`Schema::key`].
    pub fn object() -> Self {
        Self::of(SchemaKind::Object {
            keys: None,
            unknown: None,
        })
    }

    pub fn array() -> Self {
        Self::of(SchemaKind::Array { items: None })
    }

    pub fn date() -> Self {
        Self::of(SchemaKind::Date)
    }

    pub fn binary() -> Self {
        Self::of(SchemaKind::Binary)
    }

    /// A schema only satisfied by the referenced value.
    ///
    /// `$x` refers to the fragment registered as `x` in the schema context;
    /// any other string is a path to a sibling key.
    pub fn reference(raw: &str) -> Self {
        Self::any().valid(Reference::parse(raw))
    }

    pub(crate) fn custom(extension: Arc<dyn Extension>) -> Self {
        Self::of(SchemaKind::Custom(extension))
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn required(mut self) -> Self {
        self.presence = Some(Presence::Required);
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Some(Presence::Forbidden);
        self
    }

    /// Value used when the input is missing.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restrict the schema to the given values. May be called repeatedly.
    pub fn valid(mut self, allowed: impl Into<Allowed>) -> Self {
        self.allowed.push(allowed.into());
        self
    }

    /// Attach an asynchronous rule.
    pub fn external<R>(mut self, rule: R) -> Self
    where
        R: ExternalRule + 'static,
    {
        self.externals.push(Arc::new(rule));
        self
    }

    /// True when this schema or any nested schema carries external rules.
    pub fn has_externals(&self) -> bool {
        if !self.externals.is_empty() {
            return true;
        }
        match &self.kind {
            SchemaKind::Object {
                keys: Some(keys), ..
            } => keys.iter().any(|(_, schema)| schema.has_externals()),
            SchemaKind::Array { items: Some(items) } => items.has_externals(),
            _ => false,
        }
    }

    /// Require whole numbers. Ignored for non-number schemas.
    pub fn integer(mut self) -> Self {
        if let SchemaKind::Number { integer, .. } = &mut self.kind {
            *integer = true;
        }
        self
    }

    /// Lower bound for numbers. Ignored for non-number schemas.
    pub fn min(mut self, limit: f64) -> Self {
        if let SchemaKind::Number { min, .. } = &mut self.kind {
            *min = Some(limit);
        }
        self
    }

    /// Upper bound for numbers. Ignored for non-number schemas.
    pub fn max(mut self, limit: f64) -> Self {
        if let SchemaKind::Number { max, .. } = &mut self.kind {
            *max = Some(limit);
        }
        self
    }

    pub fn min_length(mut self, limit: usize) -> Self {
        if let SchemaKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(limit);
        }
        self
    }

    pub fn max_length(mut self, limit: usize) -> Self {
        if let SchemaKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(limit);
        }
        self
    }

    /// Accept the empty string.
    pub fn allow_empty(mut self) -> Self {
        if let SchemaKind::String { allow_empty, .. } = &mut self.kind {
            *allow_empty = true;
        }
        self
    }

    /// Declare an object key. Keys are validated in declaration order.
    pub fn key(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object { keys, .. } = &mut self.kind {
            keys.get_or_insert_with(Vec::new).push((name.into(), schema));
        }
        self
    }

    /// Override the `allowUnknown` preference for this object.
    pub fn unknown(mut self, allow: bool) -> Self {
        if let SchemaKind::Object { unknown, .. } = &mut self.kind {
            *unknown = Some(allow);
        }
        self
    }

    /// Schema applied to every array item.
    pub fn items(mut self, schema: Schema) -> Self {
        if let SchemaKind::Array { items } = &mut self.kind {
            *items = Some(Box::new(schema));
        }
        self
    }
}
