//! Custom type extensions.
//!
//! An [`Extension`] adds a named type to the engine. Extensions are applied
//! once when the compiler factory is configured; schemas for the new type are
//! authored through the derived [`Engine`](super::Engine) handle.

use serde_json::Value;

/// A custom engine type.
///
/// # Example Implementation
///
/// ```rust
/// use schema_context_compiler::engine::Extension;
/// use serde_json::Value;
///
/// struct Lowercase;
///
/// impl Extension for Lowercase {
///     fn type_name(&self) -> &str {
///         "lowercase"
///     }
///
///     fn coerce(&self, value: Value) -> Value {
///         match value {
///             Value::String(s) => Value::String(s.to_lowercase()),
///             other => other,
///         }
///     }
///
///     fn validate(&self, value: &Value) -> Result<(), String> {
///         match value.as_str() {
///             Some(s) if s.chars().all(|c| !c.is_uppercase()) => Ok(()),
///             _ => Err("must be a lowercase string".to_string()),
///         }
///     }
/// }
/// ```
pub trait Extension: Send + Sync {
    /// Name used to author schemas of this type.
    fn type_name(&self) -> &str;

    /// Convert the raw input before validation. Only called when the
    /// `convert` preference is enabled.
    fn coerce(&self, value: Value) -> Value {
        value
    }

    /// Check a (possibly coerced) value.
    ///
    /// The error is a message fragment appended to the value label,
    /// e.g. `must be a hex color`.
    fn validate(&self, value: &Value) -> Result<(), String>;
}
