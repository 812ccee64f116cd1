//! Auto-save configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for auto-save behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Whether automatic (debounced) saving is enabled.
    ///
    /// Manual saves through `save_now` still work when this is `false`.
    pub enabled: bool,

    /// Debounce delay in milliseconds.
    ///
    /// After a change, the reconciler waits this long before saving.
    /// Additional changes reset the timer.
    pub debounce_ms: u64,

    /// Maximum delay before forcing a save.
    ///
    /// If changes keep coming, save after this many milliseconds since the
    /// first unsaved change. `None` means edits can postpone the save
    /// indefinitely.
    pub max_delay_ms: Option<u64>,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000, // 2 seconds
            max_delay_ms: None,
        }
    }
}

impl AutoSaveConfig {
    /// Create a disabled auto-save config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the debounce delay.
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Set the maximum delay before a forced save.
    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: Option<u64>) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Enable or disable automatic saving.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The quiet period as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The forced-save cap as a [`Duration`], if configured.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }

    /// How long the debounce timer should run.
    ///
    /// `since_first_unsaved` is the time elapsed since the first change that
    /// has not been persisted yet. Without a max delay this is always the
    /// full debounce period.
    pub fn timer_delay(&self, since_first_unsaved: Duration) -> Duration {
        let debounce = self.debounce();
        match self.max_delay() {
            Some(max) => debounce.min(max.saturating_sub(since_first_unsaved)),
            None => debounce,
        }
    }
}
