//! Validation preferences.
//!
//! Preferences tune how the engine walks a payload: whether it stops at the
//! first failure, how unknown object keys are treated and whether values are
//! coerced. They are checked once at configuration time; a key the engine
//! does not recognise is rejected immediately.

use crate::error::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys accepted by [`Preferences::from_value`].
pub const KNOWN_PREFERENCES: &[&str] = &[
    "abortEarly",
    "allowUnknown",
    "convert",
    "externals",
    "noDefaults",
    "presence",
    "stripUnknown",
];

/// Default presence applied to schemas that do not declare their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
}

/// Engine preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Stop at the first failing rule
    pub abort_early: bool,
    /// Keep object keys that the schema does not declare
    pub allow_unknown: bool,
    /// Coerce values to the declared type where possible
    pub convert: bool,
    /// Run external rules (asynchronous validation only)
    pub externals: bool,
    /// Ignore declared defaults
    pub no_defaults: bool,
    /// Presence for schemas without an explicit one
    pub presence: Presence,
    /// Drop object keys that the schema does not declare
    pub strip_unknown: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            abort_early: true,
            allow_unknown: false,
            convert: true,
            externals: true,
            no_defaults: false,
            presence: Presence::Optional,
            strip_unknown: false,
        }
    }
}

impl Preferences {
    /// Preferences used when the host supplies none.
    pub fn adapter_defaults() -> Self {
        Self {
            strip_unknown: true,
            ..Self::default()
        }
    }

    /// Check and parse host supplied preferences.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::PreferencesNotObject`] when `value` is not an object
    /// * [`ConfigurationError::UnknownPreference`] for the first unrecognised key
    /// * [`ConfigurationError::InvalidPreference`] when a known key has the wrong type
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        let object = value
            .as_object()
            .ok_or(ConfigurationError::PreferencesNotObject)?;

        if let Some(key) = object
            .keys()
            .find(|key| !KNOWN_PREFERENCES.contains(&key.as_str()))
        {
            return Err(ConfigurationError::UnknownPreference { key: key.clone() });
        }

        serde_json::from_value(value.clone())
            .map_err(|source| ConfigurationError::InvalidPreference { source })
    }
}
