//! Store error types.
//!
//! All store operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;
use thiserror::Error;

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path cannot hold a document (no file name).
    #[error("Not a valid document path: {path}")]
    InvalidPath { path: PathBuf },

    /// Not an offerte document or store file.
    #[error("Invalid file format: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Document written by a newer version.
    #[error("Document version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    /// Serialization error.
    #[error("Failed to serialize data")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Deserialization error.
    #[error("Failed to deserialize data")]
    Deserialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote document does not exist.
    #[error("Document not found: {id}")]
    NotFound { id: String },

    /// Remote write raced with another writer.
    #[error("Document {id} changed concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Remote store refused the mutation.
    #[error("Mutation rejected: {reason}")]
    Rejected { reason: String },
}

impl StoreError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::InvalidPath { path } => {
                format!("{} is not a valid place to store a document", path.display())
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The file at {} is not a valid offerte document: {}",
                    path.display(),
                    reason
                )
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This document was saved by a newer version of the application \
                    (document version {}, your version supports up to {}). \
                    Please update the application.",
                    found, max_supported
                )
            }
            Self::Serialization { .. } => "An error occurred while saving the data.".to_string(),
            Self::Deserialization { .. } => {
                "An error occurred while reading the data. The file may be corrupted.".to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::NotFound { id } => format!("The document '{}' no longer exists.", id),
            Self::Conflict { id, .. } => {
                format!("The document '{}' was changed by someone else.", id)
            }
            Self::Rejected { reason } => format!("The server refused the change: {}", reason),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::InvalidPath { .. } => Some("Choose a file name for the document.".into()),
            Self::InvalidFormat { .. } => {
                Some("Make sure you selected a document saved by this application.".into())
            }
            Self::UnsupportedVersion { .. } => Some("Install the latest version.".into()),
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } => Some("Try opening a backup if you have one.".into()),
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
            Self::NotFound { .. } => None,
            Self::Conflict { .. } => Some("Reload the document and apply your changes again.".into()),
            Self::Rejected { .. } => Some("Try again in a moment.".into()),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
