//! Host-facing integration tests.

pub mod async_validation;
pub mod buckets;
pub mod diagnostics;
pub mod encapsulation;
