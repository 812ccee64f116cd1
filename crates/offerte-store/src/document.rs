//! Document files: auto-saved data wrapped in a versioned JSON envelope.
//!
//! ```text
//! {
//!   "format": "offerte-document",
//!   "schema_version": 1,
//!   "saved_at": "2026-03-14T09:26:53Z",
//!   "data": { ... }
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::io::{read_optional, write_atomic};

/// Format marker stored in every document.
pub const DOCUMENT_FORMAT: &str = "offerte-document";

/// Current document schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A document as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFile<T> {
    /// Always [`DOCUMENT_FORMAT`].
    pub format: String,

    /// Schema version (for future migrations).
    pub schema_version: u32,

    /// When the document was last saved.
    pub saved_at: DateTime<Utc>,

    /// The editor's data.
    pub data: T,
}

impl<T> DocumentFile<T> {
    /// Wrap data in a fresh envelope stamped with the current time.
    pub fn new(data: T) -> Self {
        Self {
            format: DOCUMENT_FORMAT.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            data,
        }
    }
}

/// Save `data` to `path` atomically. Returns the stored timestamp.
pub fn save_document<T: Serialize>(data: &T, path: &Path) -> Result<DateTime<Utc>> {
    let document = DocumentFile::new(data);
    let bytes = serde_json::to_vec_pretty(&document).map_err(|e| StoreError::Serialization {
        source: Box::new(e),
    })?;

    write_atomic(path, &bytes)?;

    tracing::info!("Saved document to {}", path.display());
    Ok(document.saved_at)
}

/// Save a document asynchronously.
///
/// Spawns the save operation on a blocking thread pool to avoid
/// blocking the async runtime.
pub async fn save_document_async<T>(data: T, path: PathBuf) -> Result<DateTime<Utc>>
where
    T: Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || save_document(&data, &path))
        .await
        .map_err(|e| StoreError::Serialization {
            source: Box::new(e),
        })?
}

/// Load a document, validating the envelope.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<DocumentFile<T>> {
    match read_optional(path)? {
        Some(bytes) => parse_document(&bytes, path),
        None => Err(StoreError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: std::io::ErrorKind::NotFound.into(),
        }),
    }
}

/// Load a document, or `None` when no file exists yet.
pub fn load_document_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<DocumentFile<T>>> {
    read_optional(path)?
        .map(|bytes| parse_document(&bytes, path))
        .transpose()
}

/// Load a document asynchronously.
pub async fn load_document_async<T>(path: PathBuf) -> Result<DocumentFile<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || load_document(&path))
        .await
        .map_err(|e| StoreError::Deserialization {
            source: Box::new(e),
        })?
}

/// Validate the envelope before deserializing the payload, so a foreign
/// file reports a format problem instead of a field mismatch.
fn parse_document<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<DocumentFile<T>> {
    let raw: Value = serde_json::from_slice(bytes).map_err(|e| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        reason: format!("not valid JSON ({e})"),
    })?;

    if raw.get("format").and_then(Value::as_str) != Some(DOCUMENT_FORMAT) {
        return Err(StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "missing document format marker".to_string(),
        });
    }

    let version = raw
        .get("schema_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "missing schema version".to_string(),
        })?;
    if version > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(StoreError::UnsupportedVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }

    let document = serde_json::from_value(raw).map_err(|e| StoreError::Deserialization {
        source: Box::new(e),
    })?;

    tracing::debug!("Loaded document from {}", path.display());
    Ok(document)
}
