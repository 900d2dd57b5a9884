//! Schema context buckets.
//!
//! A [`ContextBucket`] holds the named schema fragments registered in one host
//! scope. Child scopes start from a copy of their parent's entries taken at
//! fork time; nothing propagates between buckets afterwards.
//!
//! Entries live behind an `Arc` and are copied on write, so a [`Snapshot`]
//! handed to the compiler factory stays frozen even if the bucket keeps
//! accepting registrations.
//!
//! # Examples
//!
//! ```rust
//! use schema_context_compiler::{ContextBucket, SchemaFragment};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut root = ContextBucket::new();
//! root.add(SchemaFragment::new("x", json!(42)))?;
//!
//! let mut child = ContextBucket::create(Some(&root.get_all()));
//! child.add(SchemaFragment::new("y", json!(50)))?;
//!
//! assert_eq!(child.get("x"), Some(&json!(42)));
//! assert_eq!(root.get("y"), None);
//! # Ok(())
//! # }
//! ```

use crate::error::{BucketError, BucketResult};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// A named schema fragment as registered by the host.
///
/// Deserialises from the host's registration payload
/// `{ "$id": "x", "$value": 42 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFragment {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$value")]
    pub value: Value,
}

impl SchemaFragment {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Immutable view of a bucket's entries at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Arc<HashMap<String, Value>>,
}

impl Snapshot {
    /// Look up a fragment value by id.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    /// True when both snapshots share the same storage.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Copy the entries out as a plain map.
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.entries.as_ref().clone()
    }
}

impl Deref for Snapshot {
    type Target = HashMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl Snapshot {
    /// Wrap entries that did not come from a bucket.
    ///
    /// Only reachable inside the crate, so every `Snapshot` a host holds was
    /// produced by [`ContextBucket::get_all`] or is empty.
    pub(crate) fn from_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}

/// Registry of schema fragments owned by a single scope.
#[derive(Debug, Clone, Default)]
pub struct ContextBucket {
    entries: Arc<HashMap<String, Value>>,
}

impl ContextBucket {
    /// Create an empty root bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bucket inheriting the given parent entries.
    ///
    /// The parent snapshot is copied, so later registrations on either side
    /// stay local to the bucket that received them.
    pub fn create(parent: Option<&Snapshot>) -> Self {
        let entries = parent.map(Snapshot::to_map).unwrap_or_default();
        debug!("Creating schema context bucket with {} inherited entries", entries.len());
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Register a fragment.
    ///
    /// # Errors
    ///
    /// * [`BucketError::EmptyId`] when the fragment id is empty
    /// * [`BucketError::DuplicateSchema`] when the id is already registered
    ///
    /// The bucket is left untouched on error.
    pub fn add(&mut self, fragment: SchemaFragment) -> BucketResult<()> {
        if fragment.id.is_empty() {
            return Err(BucketError::EmptyId);
        }
        if self.entries.contains_key(&fragment.id) {
            return Err(BucketError::DuplicateSchema { id: fragment.id });
        }

        debug!("Registering schema fragment '{}'", fragment.id);
        Arc::make_mut(&mut self.entries).insert(fragment.id, fragment.value);
        Ok(())
    }

    /// Get a fragment value, or `None` when the id is not registered.
    pub fn get(&self, id: &str) -> Option<&Value> {
        let value = self.entries.get(id);
        if value.is_none() {
            trace!("Schema fragment '{}' not found", id);
        }
        value
    }

    /// Snapshot of every entry currently registered.
    pub fn get_all(&self) -> Snapshot {
        Snapshot {
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// External schemas handed to the compiler factory.
///
/// `Bucket` carries a snapshot managed by [`ContextBucket`], with its
/// duplicate-check and inheritance guarantees. `Raw` is a map the host
/// assembled on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalSchemas {
    Bucket(Snapshot),
    Raw(Snapshot),
}

impl ExternalSchemas {
    /// The entries, regardless of where they came from.
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            ExternalSchemas::Bucket(snapshot) | ExternalSchemas::Raw(snapshot) => snapshot,
        }
    }

    pub fn is_bucket(&self) -> bool {
        matches!(self, ExternalSchemas::Bucket(_))
    }
}

impl From<Snapshot> for ExternalSchemas {
    fn from(snapshot: Snapshot) -> Self {
        ExternalSchemas::Bucket(snapshot)
    }
}

impl From<&ContextBucket> for ExternalSchemas {
    fn from(bucket: &ContextBucket) -> Self {
        ExternalSchemas::Bucket(bucket.get_all())
    }
}

impl From<HashMap<String, Value>> for ExternalSchemas {
    fn from(entries: HashMap<String, Value>) -> Self {
        ExternalSchemas::Raw(Snapshot::from_entries(entries))
    }
}

impl From<serde_json::Map<String, Value>> for ExternalSchemas {
    fn from(entries: serde_json::Map<String, Value>) -> Self {
        ExternalSchemas::Raw(Snapshot::from_entries(
            entries.into_iter().collect::<HashMap<_, _>>(),
        ))
    }
}
