//! Public save-state projection.

use chrono::{DateTime, Utc};

use crate::error::SaveFailure;

/// Read-only view of the auto-saver, as consumers see it.
///
/// Every field is derived from the same reconciler transition, so any value
/// observed through [`crate::AutoSave::status`] or a subscription is one of the
/// coherent combinations described by [`SaveState`].
///
/// `is_saving` with `is_dirty == false` does occur: a manual save of
/// unchanged data, or a revert to the last persisted value while a save is
/// in flight. [`SaveState`] reports both as [`SaveState::Saving`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    /// A persist is in flight.
    pub is_saving: bool,
    /// The latest data differs from what was last persisted.
    pub is_dirty: bool,
    /// When the last successful persist completed.
    pub last_saved: Option<DateTime<Utc>>,
    /// Why the last persist failed, until a new edit or a successful save.
    pub error: Option<SaveFailure>,
}

/// The state machine position derived from a [`SaveStatus`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    /// Clean, nothing saved during this session yet.
    Idle,
    /// Unsaved edits waiting for the debounce timer or a manual save.
    Dirty,
    /// A persist is in flight.
    Saving,
    /// Clean, last confirmed at `at`.
    Saved { at: DateTime<Utc> },
    /// The last persist failed; the data is still unsaved.
    Failed(SaveFailure),
}

impl SaveStatus {
    /// Project the status onto the explicit state machine.
    pub fn state(&self) -> SaveState {
        if self.is_saving {
            return SaveState::Saving;
        }
        if let Some(error) = &self.error {
            return SaveState::Failed(error.clone());
        }
        if self.is_dirty {
            return SaveState::Dirty;
        }
        match self.last_saved {
            Some(at) => SaveState::Saved { at },
            None => SaveState::Idle,
        }
    }

    /// Whether there is data that has not been confirmed persisted.
    #[inline]
    pub fn has_unsaved_changes(&self) -> bool {
        self.is_dirty
    }
}

impl SaveState {
    /// Short lowercase name, used in logs and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
            Self::Saved { .. } => "saved",
            Self::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(SaveStatus::default().state(), SaveState::Idle);
    }

    #[test]
    fn test_saving_takes_precedence() {
        let status = SaveStatus {
            is_saving: true,
            is_dirty: true,
            last_saved: None,
            error: Some(SaveFailure::msg("earlier failure")),
        };
        assert_eq!(status.state(), SaveState::Saving);
    }

    #[test]
    fn test_failed_and_saved() {
        let failure = SaveFailure::msg("rejected");
        let failed = SaveStatus {
            is_dirty: true,
            error: Some(failure.clone()),
            ..Default::default()
        };
        assert_eq!(failed.state(), SaveState::Failed(failure));
        assert_eq!(failed.state().name(), "failed");

        let at = Utc::now();
        let saved = SaveStatus {
            last_saved: Some(at),
            ..Default::default()
        };
        assert_eq!(saved.state(), SaveState::Saved { at });
    }
}
