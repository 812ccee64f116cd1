//! Offline-aware save indicator.
//!
//! Combines the auto-saver's [`SaveStatus`] with debounced connectivity into
//! the single badge shown next to the editor title.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use offerte_autosave::{SaveState, SaveStatus};

/// Network reachability as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

/// Debounces connectivity reports so short drops don't flicker the badge.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    grace: Duration,
    /// When the current outage began, if the last report was "offline".
    down_since: Option<Instant>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl ConnectivityMonitor {
    /// `grace` is how long the connection must stay down before it shows.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            down_since: None,
        }
    }

    /// The connection is (back) up. Takes effect immediately.
    ///
    /// Returns how long the outage lasted, or `None` if it was not down.
    pub fn online(&mut self, now: Instant) -> Option<Duration> {
        let since = self.down_since.take()?;
        let outage = now.saturating_duration_since(since);
        tracing::debug!(outage_ms = outage.as_millis(), "Connection restored");
        Some(outage)
    }

    /// The connection dropped. Repeated reports keep the original start.
    pub fn offline(&mut self, now: Instant) {
        if self.down_since.is_none() {
            tracing::debug!("Connection lost");
            self.down_since = Some(now);
        }
    }

    /// Connectivity to display at `now`.
    pub fn state(&self, now: Instant) -> Connectivity {
        match self.down_since {
            Some(since) if now.saturating_duration_since(since) >= self.grace => {
                Connectivity::Offline
            }
            _ => Connectivity::Online,
        }
    }

    /// When [`ConnectivityMonitor::state`] will next change on its own.
    pub fn deadline(&self) -> Option<Instant> {
        self.down_since.map(|since| since + self.grace)
    }
}

/// What the save badge shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveIndicator {
    /// Everything persisted. `at` is `None` when nothing was saved this
    /// session.
    Saved { at: Option<DateTime<Utc>> },
    Saving,
    Unsaved,
    Failed { message: String },
    /// No connection; `pending` when there are edits that still need saving.
    Offline { pending: bool },
}

impl SaveIndicator {
    pub fn from_status(status: &SaveStatus, connectivity: Connectivity) -> Self {
        if connectivity == Connectivity::Offline {
            return Self::Offline {
                pending: status.is_dirty || status.is_saving,
            };
        }
        match status.state() {
            SaveState::Idle => Self::Saved { at: None },
            SaveState::Saved { at } => Self::Saved { at: Some(at) },
            SaveState::Saving => Self::Saving,
            SaveState::Dirty => Self::Unsaved,
            SaveState::Failed(failure) => Self::Failed {
                message: failure.to_string(),
            },
        }
    }

    /// Badge text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "Opgeslagen",
            Self::Saving => "Opslaan...",
            Self::Unsaved => "Niet opgeslagen",
            Self::Failed { .. } => "Opslaan mislukt",
            Self::Offline { pending: true } => "Offline, wijzigingen nog niet opgeslagen",
            Self::Offline { pending: false } => "Offline",
        }
    }

    /// Relative time of the last save (e.g. "3 minuten geleden"), for the
    /// badge tooltip.
    pub fn relative_saved_label(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Self::Saved { at: Some(at) } => Some(relative_time(*at, now)),
            _ => None,
        }
    }

    /// Whether leaving the editor now would lose data.
    pub fn warns_on_leave(&self) -> bool {
        matches!(
            self,
            Self::Saving | Self::Unsaved | Self::Failed { .. } | Self::Offline { pending: true }
        )
    }
}

/// Dutch relative time, e.g. "zojuist", "2 uur geleden", "gisteren".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(then);

    if duration.num_minutes() < 1 {
        "zojuist".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        format!("{} {} geleden", mins, if mins == 1 { "minuut" } else { "minuten" })
    } else if duration.num_hours() < 24 {
        format!("{} uur geleden", duration.num_hours())
    } else if duration.num_days() == 1 {
        "gisteren".to_string()
    } else if duration.num_days() < 7 {
        format!("{} dagen geleden", duration.num_days())
    } else if duration.num_weeks() < 4 {
        let weeks = duration.num_weeks();
        format!("{} {} geleden", weeks, if weeks == 1 { "week" } else { "weken" })
    } else {
        then.format("%d-%m-%Y").to_string()
    }
}
