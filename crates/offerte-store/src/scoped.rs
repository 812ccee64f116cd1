//! Explicitly scoped key/value state.
//!
//! Small UI facts such as "onboarding finished" or "tour dismissed" live in
//! a [`ScopedStore`] that is created by its owner and handed to whoever needs
//! it, instead of in process-wide globals. Tests get an in-memory store of
//! their own; the CLI opens one file per user.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::io::{read_optional, write_atomic};

const CHANGE_CAPACITY: usize = 64;

/// A key written or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    /// The new value, `None` when removed.
    pub value: Option<Value>,
}

/// On-disk shape of a file-backed store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    entries: BTreeMap<String, Value>,
}

/// Key/value state with an explicit owner and lifetime.
#[derive(Debug)]
pub struct ScopedStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
    changes: broadcast::Sender<StoreChange>,
}

impl ScopedStore {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::with_entries(None, BTreeMap::new())
    }

    /// Open a file-backed store. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match read_optional(&path)? {
            Some(bytes) => {
                let file: StoreFile =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidFormat {
                        path: path.clone(),
                        reason: format!("not a store file ({e})"),
                    })?;
                file.entries
            }
            None => BTreeMap::new(),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened scoped store");
        Ok(Self::with_entries(Some(path), entries))
    }

    fn with_entries(path: Option<PathBuf>, entries: BTreeMap<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            path,
            entries,
            changes,
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read and deserialize a value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| StoreError::Deserialization {
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    /// Raw JSON value for a key.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store a value, persisting it before it becomes visible.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            source: Box::new(e),
        })?;
        if self.entries.get(key) == Some(&value) {
            return Ok(());
        }

        let previous = self.entries.insert(key.to_string(), value.clone());
        if let Err(error) = self.flush() {
            self.restore(key, previous);
            return Err(error);
        }
        self.emit(key, Some(value));
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(false);
        };
        if let Err(error) = self.flush() {
            self.restore(key, Some(previous));
            return Err(error);
        }
        self.emit(key, None);
        Ok(true)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// A boolean flag; missing or non-boolean values read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Set a boolean flag.
    pub fn set_flag(&mut self, name: &str, value: bool) -> Result<()> {
        self.set(name, &value)
    }

    /// Receive every later change.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = StoreFile {
            entries: self.entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Serialization {
            source: Box::new(e),
        })?;
        write_atomic(path, &bytes)
    }

    fn restore(&mut self, key: &str, previous: Option<Value>) {
        match previous {
            Some(value) => self.entries.insert(key.to_string(), value),
            None => self.entries.remove(key),
        };
    }

    fn emit(&self, key: &str, value: Option<Value>) {
        tracing::trace!(key, "Scoped store changed");
        // No receivers is fine.
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
        });
    }
}
