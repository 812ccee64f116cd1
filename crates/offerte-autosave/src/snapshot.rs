//! Snapshots and value-based change detection.
//!
//! A snapshot pairs the caller's value with a fingerprint of its canonical
//! JSON form. Two values are "the same data" when their fingerprints match,
//! regardless of how the values were built or which allocation they live in.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{AutoSaveError, Result};

/// SHA-256 of a value's canonical JSON encoding, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a serializable value.
    ///
    /// The value is first converted to a `serde_json::Value`, whose object
    /// maps keep keys sorted, so field order never influences the result.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let canonical = serde_json::to_value(value)
            .and_then(|json| serde_json::to_vec(&json))
            .map_err(|source| AutoSaveError::Snapshot { source })?;

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log output.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable point-in-time value of the data being auto-saved.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    value: T,
    fingerprint: Fingerprint,
}

impl<T: Serialize> Snapshot<T> {
    /// Capture a snapshot of `value`.
    pub fn capture(value: T) -> Result<Self> {
        let fingerprint = Fingerprint::of(&value)?;
        Ok(Self { value, fingerprint })
    }
}

impl<T> Snapshot<T> {
    /// The captured value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the snapshot, returning the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// The value's fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Deep value equality.
    pub fn same_data<U>(&self, other: &Snapshot<U>) -> bool {
        self.fingerprint == other.fingerprint
    }
}
