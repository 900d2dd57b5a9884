//! References to values outside the value being validated.
//!
//! A reference written `$name` (optionally followed by `.path`) points into
//! the schema context snapshot injected by the compiler. Any other reference
//! is a dotted path resolved against the object that contains the value.

use crate::bucket::Snapshot;
use serde_json::{Map, Value};
use std::fmt;

const CONTEXT_PREFIX: char = '$';

/// Where a reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefScope {
    /// The bucket snapshot the validator was built with
    Context,
    /// The object holding the referencing key
    Sibling,
}

/// A parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    scope: RefScope,
    path: Vec<String>,
}

impl Reference {
    /// Parse `$id.path` or `sibling.path`.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(CONTEXT_PREFIX) {
            Some(rest) => Self {
                scope: RefScope::Context,
                path: split_path(rest),
            },
            None => Self {
                scope: RefScope::Sibling,
                path: split_path(raw),
            },
        }
    }

    pub fn scope(&self) -> RefScope {
        self.scope
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Resolve against the enclosing object and the context snapshot.
    ///
    /// Returns `None` when any step of the path is missing; the caller
    /// reports that as an ordinary rule failure.
    pub(crate) fn resolve<'a>(
        &self,
        parent: Option<&'a Map<String, Value>>,
        context: &'a Snapshot,
    ) -> Option<&'a Value> {
        let (first, rest) = self.path.split_first()?;
        let start = match self.scope {
            RefScope::Context => context.get(first),
            RefScope::Sibling => parent.and_then(|object| object.get(first)),
        }?;
        rest.iter().try_fold(start, |current, step| step_into(current, step))
    }
}

fn split_path(raw: &str) -> Vec<String> {
    raw.split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn step_into<'a>(value: &'a Value, step: &str) -> Option<&'a Value> {
    match value {
        Value::Object(object) => object.get(step),
        Value::Array(items) => step.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            RefScope::Context => write!(f, "ref:global:{}", self.path.join(".")),
            RefScope::Sibling => write!(f, "ref:{}", self.path.join(".")),
        }
    }
}

impl From<&str> for Reference {
    fn from(raw: &str) -> Self {
        Reference::parse(raw)
    }
}
