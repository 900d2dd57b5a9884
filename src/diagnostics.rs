//! Rate-limited diagnostic signals.
//!
//! The compiler factory raises coded diagnostics when it sees a usage pattern
//! that bypasses the bucket guarantees. Delivery is delegated to a
//! [`DiagnosticSink`]; [`Diagnostics`] decides whether a code is delivered at
//! all. Each factory owns its own `Diagnostics`, so tests can observe and
//! reset it without touching global state.

use log::warn;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Raised when external schemas reach the compiler without a bucket.
pub const EXTERNAL_SCHEMA_WITHOUT_BUCKET: &str = "external-schema-without-bucket";

/// A coded diagnostic signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: &'static str,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Look up the catalogued message for a code.
fn catalog(code: &'static str) -> Diagnostic {
    let message = match code {
        EXTERNAL_SCHEMA_WITHOUT_BUCKET => {
            "External schemas added without a context bucket bypass duplicate checks and scope inheritance"
        }
        _ => "Unknown diagnostic",
    };
    Diagnostic { code, message }
}

/// Destination for diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Default sink writing through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// How often a code may be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitPolicy {
    /// At most once per `Diagnostics` until reset
    #[default]
    Once,
    /// Every occurrence
    Always,
}

/// Diagnostic emitter with per-code rate limiting.
///
/// Cloning shares the sink and the record of emitted codes.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
    policy: EmitPolicy,
    emitted: Arc<Mutex<HashSet<&'static str>>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("policy", &self.policy)
            .field("emitted", &self.emitted_codes())
            .finish()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            policy: EmitPolicy::Once,
            emitted: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_policy(mut self, policy: EmitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Raise `code`. Returns whether it reached the sink.
    pub fn emit(&self, code: &'static str) -> bool {
        if self.policy == EmitPolicy::Once {
            // Sinks run outside the lock, so a poisoned set is still consistent.
            let mut emitted = self.emitted.lock().unwrap_or_else(|e| e.into_inner());
            if !emitted.insert(code) {
                return false;
            }
        }
        self.sink.emit(&catalog(code));
        true
    }

    /// Forget every emitted code.
    pub fn reset(&self) {
        self.emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn has_emitted(&self, code: &str) -> bool {
        self.emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(code)
    }

    fn emitted_codes(&self) -> Vec<&'static str> {
        self.emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect()
    }
}
