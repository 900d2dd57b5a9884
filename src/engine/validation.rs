//! Validation of payloads against engine schemas.
//!
//! Validation walks the schema and the payload together, coercing values when
//! the `convert` preference is on and collecting rule failures as
//! [`ErrorDetail`]s. External rules found on the way are queued and run only
//! by [`Schema::validate_async`], once every synchronous rule has passed.

use super::external::{ExternalContext, ExternalRule};
use super::reference::Reference;
use super::types::{Allowed, Schema, SchemaKind};
use crate::bucket::Snapshot;
use crate::error::{ErrorDetail, ErrorKind, PathSegment, ValidationError, ValidationResult};
use crate::preferences::{Preferences, Presence};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use log::trace;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Options for a single validation run.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions<'a> {
    pub preferences: &'a Preferences,
    /// Snapshot that `$name` references resolve against
    pub context: &'a Snapshot,
}

/// Result of a synchronous validation.
///
/// When `error` is `None`, `value` holds the validated and coerced payload.
/// Otherwise `value` is the payload as far as validation got and should not
/// be used.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub value: Value,
    pub error: Option<ValidationError>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> ValidationResult<Value> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

type QueuedExternal = (Vec<PathSegment>, Arc<dyn ExternalRule>);

impl Schema {
    /// Validate synchronously.
    ///
    /// Schemas carrying external rules fail with an `any.external` detail
    /// unless the `externals` preference is off, in which case the rules are
    /// skipped.
    pub fn validate(&self, value: Value, options: &ValidationOptions<'_>) -> ValidationOutcome {
        let (value, details, externals) = Walker::run(self, value, options);

        if !details.is_empty() {
            return ValidationOutcome {
                value,
                error: Some(ValidationError::from_details(details)),
            };
        }

        if options.preferences.externals && !externals.is_empty() {
            let detail = ErrorDetail::new(
                ErrorKind::External,
                Vec::new(),
                "Schema with external rules must use asynchronous validation",
            );
            return ValidationOutcome {
                value,
                error: Some(ValidationError::from_details(vec![detail])),
            };
        }

        ValidationOutcome { value, error: None }
    }

    /// Validate, then run queued external rules in declaration order.
    pub async fn validate_async(
        &self,
        value: Value,
        options: &ValidationOptions<'_>,
    ) -> ValidationResult<Value> {
        let (mut value, details, externals) = Walker::run(self, value, options);

        if !details.is_empty() {
            return Err(ValidationError::from_details(details));
        }
        if !options.preferences.externals {
            return Ok(value);
        }

        for (path, rule) in externals {
            let current = value_at(&value, &path).cloned().unwrap_or(Value::Null);
            let outcome = {
                let context = ExternalContext {
                    path: &path,
                    schemas: options.context,
                    root: &value,
                };
                rule.check(&current, &context).await
            };

            match outcome {
                Ok(Some(replacement)) => set_at(&mut value, &path, replacement),
                Ok(None) => {}
                Err(cause) => {
                    let label = label_for(&path);
                    return Err(ValidationError::external(path, &label, cause));
                }
            }
        }

        Ok(value)
    }
}

struct Walker<'a> {
    preferences: &'a Preferences,
    context: &'a Snapshot,
    path: Vec<PathSegment>,
    details: Vec<ErrorDetail>,
    externals: Vec<QueuedExternal>,
}

impl<'a> Walker<'a> {
    fn run(
        schema: &Schema,
        value: Value,
        options: &ValidationOptions<'a>,
    ) -> (Value, Vec<ErrorDetail>, Vec<QueuedExternal>) {
        let mut walker = Walker {
            preferences: options.preferences,
            context: options.context,
            path: Vec::new(),
            details: Vec::new(),
            externals: Vec::new(),
        };
        trace!("Validating payload against {} schema", schema.kind.name());
        let value = walker.visit(schema, Some(value), None).unwrap_or(Value::Null);
        (value, walker.details, walker.externals)
    }

    fn halted(&self) -> bool {
        self.preferences.abort_early && !self.details.is_empty()
    }

    fn fail(&mut self, kind: ErrorKind, message: impl fmt::Display) {
        let label = label_for(&self.path);
        self.details.push(ErrorDetail::new(
            kind,
            self.path.clone(),
            format!("\"{}\" {}", label, message),
        ));
    }

    /// Validate `value` (`None` when the key is missing) and return the value
    /// to keep in the output.
    fn visit(
        &mut self,
        schema: &Schema,
        value: Option<Value>,
        parent: Option<&Map<String, Value>>,
    ) -> Option<Value> {
        let presence = schema.presence.unwrap_or(self.preferences.presence);

        let Some(value) = value else {
            if presence == Presence::Required {
                self.fail(ErrorKind::Required, "is required");
                return None;
            }
            if self.preferences.no_defaults {
                return None;
            }
            return schema.default.clone();
        };

        if presence == Presence::Forbidden {
            self.fail(ErrorKind::Forbidden, "is not allowed");
            return Some(value);
        }

        let errors_before = self.details.len();

        let value = if schema.allowed.is_empty() {
            self.check_kind(&schema.kind, value)
        } else {
            if !self.is_allowed(&schema.allowed, &value, parent) {
                self.fail(ErrorKind::Only, describe_allowed(&schema.allowed));
            }
            value
        };

        if self.details.len() == errors_before {
            for rule in &schema.externals {
                self.externals.push((self.path.clone(), Arc::clone(rule)));
            }
        }

        Some(value)
    }

    fn is_allowed(
        &self,
        allowed: &[Allowed],
        value: &Value,
        parent: Option<&Map<String, Value>>,
    ) -> bool {
        allowed.iter().any(|candidate| match candidate {
            Allowed::Literal(literal) => values_equal(literal, value),
            Allowed::Ref(reference) => self
                .resolve(reference, parent)
                .is_some_and(|resolved| values_equal(resolved, value)),
        })
    }

    fn resolve<'v>(
        &'v self,
        reference: &Reference,
        parent: Option<&'v Map<String, Value>>,
    ) -> Option<&'v Value> {
        let resolved = reference.resolve(parent, self.context);
        if resolved.is_none() {
            trace!("Reference {} did not resolve", reference);
        }
        resolved
    }

    fn check_kind(&mut self, kind: &SchemaKind, value: Value) -> Value {
        let convert = self.preferences.convert;
        match kind {
            SchemaKind::Any => value,
            SchemaKind::Boolean => {
                let value = if convert { coerce_boolean(value) } else { value };
                if !value.is_boolean() {
                    self.fail(ErrorKind::BooleanBase, "must be a boolean");
                }
                value
            }
            SchemaKind::Number { integer, min, max } => {
                let value = if convert { coerce_number(value) } else { value };
                let Some(number) = value.as_f64() else {
                    self.fail(ErrorKind::NumberBase, "must be a number");
                    return value;
                };
                if *integer && number.fract() != 0.0 {
                    self.fail(ErrorKind::NumberInteger, "must be an integer");
                } else if let Some(limit) = min.filter(|limit| number < *limit) {
                    self.fail(
                        ErrorKind::NumberMin,
                        format!("must be greater than or equal to {}", limit),
                    );
                } else if let Some(limit) = max.filter(|limit| number > *limit) {
                    self.fail(
                        ErrorKind::NumberMax,
                        format!("must be less than or equal to {}", limit),
                    );
                }
                value
            }
            SchemaKind::String {
                min_length,
                max_length,
                allow_empty,
            } => {
                let Some(text) = value.as_str() else {
                    self.fail(ErrorKind::StringBase, "must be a string");
                    return value;
                };
                let length = text.chars().count();
                if length == 0 && !allow_empty {
                    self.fail(ErrorKind::StringEmpty, "is not allowed to be empty");
                } else if let Some(limit) = min_length.filter(|limit| length < *limit) {
                    self.fail(
                        ErrorKind::StringMin,
                        format!("length must be at least {} characters long", limit),
                    );
                } else if let Some(limit) = max_length.filter(|limit| length > *limit) {
                    self.fail(
                        ErrorKind::StringMax,
                        format!(
                            "length must be less than or equal to {} characters long",
                            limit
                        ),
                    );
                }
                value
            }
            SchemaKind::Object { keys, unknown } => {
                let value = if convert { parse_json_string(value, '{') } else { value };
                match value {
                    Value::Object(object) => match keys {
                        Some(keys) => Value::Object(self.check_object(keys, *unknown, object)),
                        None => Value::Object(object),
                    },
                    other => {
                        self.fail(ErrorKind::ObjectBase, "must be of type object");
                        other
                    }
                }
            }
            SchemaKind::Array { items } => {
                let value = if convert { parse_json_string(value, '[') } else { value };
                match (value, items) {
                    (Value::Array(list), Some(items)) => Value::Array(self.check_items(items, list)),
                    (Value::Array(list), None) => Value::Array(list),
                    (other, _) => {
                        self.fail(ErrorKind::ArrayBase, "must be an array");
                        other
                    }
                }
            }
            SchemaKind::Date => match normalize_date(&value, convert) {
                Some(normalized) => normalized,
                None => {
                    self.fail(ErrorKind::DateBase, "must be a valid date");
                    value
                }
            },
            SchemaKind::Binary => {
                let decodes = value
                    .as_str()
                    .is_some_and(|encoded| STANDARD.decode(encoded).is_ok());
                if !decodes {
                    self.fail(ErrorKind::BinaryBase, "must be a buffer or a string");
                }
                value
            }
            SchemaKind::Custom(extension) => {
                let value = if convert { extension.coerce(value) } else { value };
                if let Err(message) = extension.validate(&value) {
                    self.fail(ErrorKind::Custom, message);
                }
                value
            }
        }
    }

    fn check_object(
        &mut self,
        keys: &[(String, Schema)],
        unknown: Option<bool>,
        mut object: Map<String, Value>,
    ) -> Map<String, Value> {
        // Sibling references see the object as it was received.
        let siblings = object.clone();
        let mut output = Map::new();

        for (name, schema) in keys {
            if self.halted() {
                break;
            }
            self.path.push(PathSegment::Key(name.clone()));
            let child = self.visit(schema, object.remove(name), Some(&siblings));
            self.path.pop();
            if let Some(child) = child {
                output.insert(name.clone(), child);
            }
        }

        let allow_unknown = unknown.unwrap_or(self.preferences.allow_unknown);
        for (name, value) in object {
            if allow_unknown {
                output.insert(name, value);
            } else if !self.preferences.strip_unknown && !self.halted() {
                self.path.push(PathSegment::Key(name));
                self.fail(ErrorKind::UnknownKey, "is not allowed");
                self.path.pop();
            }
        }

        output
    }

    fn check_items(&mut self, items: &Schema, list: Vec<Value>) -> Vec<Value> {
        let mut output = Vec::with_capacity(list.len());
        for (index, item) in list.into_iter().enumerate() {
            if self.halted() {
                break;
            }
            self.path.push(PathSegment::Index(index));
            let item = self.visit(items, Some(item), None);
            self.path.pop();
            output.push(item.unwrap_or(Value::Null));
        }
        output
    }
}

/// Dotted label for messages; `value` at the root.
fn label_for(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "value".to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn describe_allowed(allowed: &[Allowed]) -> String {
    let listed = allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if allowed.len() == 1 {
        format!("must be [{}]", listed)
    } else {
        format!("must be one of [{}]", listed)
    }
}

/// Equality that treats `1` and `1.0` as the same number.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn coerce_boolean(value: Value) -> Value {
    match value {
        Value::String(text) if text.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Value::Bool(false),
        other => other,
    }
}

fn coerce_number(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    let trimmed = text.trim();
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::Number(integer.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(value)
}

fn parse_json_string(value: Value, opening: char) -> Value {
    match &value {
        Value::String(text) if text.trim_start().starts_with(opening) => {
            serde_json::from_str(text).unwrap_or(value)
        }
        _ => value,
    }
}

/// Parse an RFC 3339 string (or epoch milliseconds when converting).
///
/// With conversion on the result is normalised to UTC with millisecond
/// precision; otherwise the input is returned unchanged.
fn normalize_date(value: &Value, convert: bool) -> Option<Value> {
    let parsed: DateTime<Utc> = match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc),
        Value::Number(millis) if convert => Utc.timestamp_millis_opt(millis.as_i64()?).single()?,
        _ => return None,
    };
    if convert {
        Some(Value::String(
            parsed.to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    } else {
        Some(value.clone())
    }
}

fn value_at<'v>(value: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => current.get(*index),
    })
}

fn set_at(value: &mut Value, path: &[PathSegment], replacement: Value) {
    let target = path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.get_mut(key.as_str()),
        PathSegment::Index(index) => current.get_mut(*index),
    });
    if let Some(target) = target {
        *target = replacement;
    }
}
