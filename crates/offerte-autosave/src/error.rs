//! Auto-save error types.
//!
//! Persist failures are kept verbatim in a cloneable [`SaveFailure`] so they
//! can sit in the published status and be handed to every waiting
//! `save_now` caller at once.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by a persister.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failed persist attempt.
///
/// Wraps the error produced by the persister without altering it. Clones
/// share the same underlying error, so [`SaveFailure::same_as`] can tell
/// whether two failures came from the same attempt.
#[derive(Clone)]
pub struct SaveFailure(Arc<dyn StdError + Send + Sync + 'static>);

impl SaveFailure {
    /// Capture an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Build a failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Borrow the original error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Whether both values wrap the very same error instance.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<BoxError> for SaveFailure {
    fn from(error: BoxError) -> Self {
        Self(Arc::from(error))
    }
}

impl PartialEq for SaveFailure {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for SaveFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Auto-save operation error.
#[derive(Debug, Error)]
pub enum AutoSaveError {
    /// The value could not be turned into a comparable snapshot.
    #[error("Failed to snapshot data for change detection")]
    Snapshot {
        #[source]
        source: serde_json::Error,
    },

    /// The persister rejected the save.
    #[error("Failed to save: {0}")]
    Persist(#[source] SaveFailure),

    /// The auto-saver has been torn down.
    #[error("Auto-save session has been disposed")]
    Disposed,
}

impl AutoSaveError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Snapshot { .. } => {
                "Your changes could not be prepared for saving.".to_string()
            }
            Self::Persist(failure) => format!("Your changes could not be saved: {failure}"),
            Self::Disposed => "This editor has been closed.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Snapshot { .. } => None,
            Self::Persist(_) => {
                Some("Check your connection and try saving again.".into())
            }
            Self::Disposed => Some("Reopen the document to continue editing.".into()),
        }
    }

    /// The persist failure, if this error wraps one.
    pub fn failure(&self) -> Option<&SaveFailure> {
        match self {
            Self::Persist(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type alias for auto-save operations.
pub type Result<T> = std::result::Result<T, AutoSaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("quota exceeded")]
    struct QuotaExceeded;

    #[test]
    fn test_failure_keeps_original_error() {
        let failure = SaveFailure::new(QuotaExceeded);
        assert_eq!(failure.to_string(), "quota exceeded");
        assert_eq!(failure.downcast_ref::<QuotaExceeded>(), Some(&QuotaExceeded));
    }

    #[test]
    fn test_failure_identity() {
        let failure = SaveFailure::msg("offline");
        let clone = failure.clone();
        let other = SaveFailure::msg("offline");
        assert!(failure.same_as(&clone));
        assert_eq!(failure, clone);
        assert_ne!(failure, other);
    }

    #[test]
    fn test_failure_from_boxed() {
        let boxed: BoxError = Box::new(QuotaExceeded);
        let failure = SaveFailure::from(boxed);
        assert!(failure.downcast_ref::<QuotaExceeded>().is_some());
    }

    #[test]
    fn test_user_messages() {
        let error = AutoSaveError::Persist(SaveFailure::msg("server unreachable"));
        assert_eq!(
            error.user_message(),
            "Your changes could not be saved: server unreachable"
        );
        assert!(error.suggestion().is_some());
        assert!(error.failure().is_some());
        assert!(AutoSaveError::Disposed.failure().is_none());
    }
}
