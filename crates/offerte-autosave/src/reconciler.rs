//! Dirty state reconciliation for auto-save.
//!
//! [`Reconciler`] is the whole auto-save state machine without any I/O: it
//! never sleeps, spawns or reads a clock. Callers feed it one of four event
//! kinds (a change, a timer firing, a persist settling, a manual save) and
//! carry out the [`Effect`]s it returns. The tokio driver in
//! [`crate::AutoSave`] is one such caller; tests are another.

use std::mem;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AutoSaveConfig;
use crate::error::SaveFailure;
use crate::snapshot::{Fingerprint, Snapshot};
use crate::status::SaveStatus;

/// Identifies one armed debounce timer. Firings of older tokens are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Identifies one persist attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

/// Identifies one caller waiting on a manual save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

/// Work the driver must perform after an event.
#[derive(Debug)]
pub enum Effect<T> {
    /// Replace any pending timer with one that fires after `delay`.
    ArmTimer { token: TimerToken, delay: Duration },
    /// Drop the pending timer without firing it.
    CancelTimer,
    /// Start persisting `data`; report back through [`Reconciler::persist_settled`].
    Persist { attempt: AttemptId, data: T },
    /// Complete the given manual save requests.
    Resolve {
        waiters: Vec<WaiterId>,
        outcome: Result<(), SaveFailure>,
    },
}

#[derive(Debug)]
struct InFlight {
    attempt: AttemptId,
    fingerprint: Fingerprint,
    waiters: Vec<WaiterId>,
}

/// Tracks the latest data against the last persisted baseline.
#[derive(Debug)]
pub struct Reconciler<T> {
    config: AutoSaveConfig,

    /// Most recent snapshot handed to [`Reconciler::observe`].
    current: Snapshot<T>,

    /// Fingerprint of the data last confirmed persisted.
    baseline: Fingerprint,

    /// The only timer allowed to fire.
    timer: Option<TimerToken>,

    in_flight: Option<InFlight>,

    /// A timer fired while a persist was in flight.
    deferred_auto: bool,

    /// Manual saves requested while a persist was in flight.
    deferred_waiters: Vec<WaiterId>,

    /// When the first change since the last successful save was observed.
    first_unsaved_change: Option<Instant>,

    last_saved: Option<DateTime<Utc>>,
    error: Option<SaveFailure>,

    live: bool,
    next_id: u64,
}

impl<T> Reconciler<T>
where
    T: Serialize + Clone,
{
    /// Create a reconciler whose baseline is the initial snapshot.
    ///
    /// The initial data is never reported as dirty and never persisted on
    /// its own.
    pub fn new(initial: Snapshot<T>, config: AutoSaveConfig) -> Self {
        let baseline = initial.fingerprint().clone();
        tracing::debug!(baseline = %baseline.short(), "Auto-save: baseline seeded");
        Self {
            config,
            current: initial,
            baseline,
            timer: None,
            in_flight: None,
            deferred_auto: false,
            deferred_waiters: Vec::new(),
            first_unsaved_change: None,
            last_saved: None,
            error: None,
            live: true,
            next_id: 0,
        }
    }

    /// Whether the latest data differs from the baseline.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        *self.current.fingerprint() != self.baseline
    }

    /// Whether a persist is in flight.
    #[inline]
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether [`Reconciler::teardown`] has been called.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// The currently armed timer, if any.
    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.timer
    }

    /// The latest observed snapshot.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Fingerprint of the last persisted data.
    pub fn baseline(&self) -> &Fingerprint {
        &self.baseline
    }

    /// Active configuration.
    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    /// Project the consumer-visible status.
    pub fn status(&self) -> SaveStatus {
        SaveStatus {
            is_saving: self.is_saving(),
            is_dirty: self.is_dirty(),
            last_saved: self.last_saved,
            error: self.error.clone(),
        }
    }

    /// A new snapshot of the caller's data.
    pub fn observe(&mut self, snapshot: Snapshot<T>, now: Instant) -> Vec<Effect<T>> {
        if !self.live {
            tracing::trace!("Auto-save: change ignored after teardown");
            return Vec::new();
        }
        if snapshot.same_data(&self.current) {
            return Vec::new();
        }

        self.current = snapshot;
        // A new edit supersedes the previous failure.
        self.error = None;

        let mut effects = Vec::new();
        if self.is_dirty() {
            if self.first_unsaved_change.is_none() {
                self.first_unsaved_change = Some(now);
            }
            tracing::debug!(
                fingerprint = %self.current.fingerprint().short(),
                "Auto-save: marked dirty"
            );
            if self.config.enabled {
                self.cancel_timer(&mut effects);
                effects.push(self.arm_timer(now));
            }
        } else {
            tracing::debug!("Auto-save: data matches baseline again");
            self.first_unsaved_change = None;
            self.deferred_auto = false;
            self.cancel_timer(&mut effects);
        }
        effects
    }

    /// The debounce timer identified by `token` expired.
    pub fn timer_fired(&mut self, token: TimerToken) -> Vec<Effect<T>> {
        if !self.live || self.timer != Some(token) {
            tracing::trace!(?token, "Auto-save: stale timer ignored");
            return Vec::new();
        }
        self.timer = None;

        if !self.config.enabled || !self.is_dirty() {
            return Vec::new();
        }
        if self.in_flight.is_some() {
            tracing::debug!("Auto-save: timer fired during save, deferring");
            self.deferred_auto = true;
            return Vec::new();
        }
        vec![self.start_persist(Vec::new())]
    }

    /// Persist immediately, bypassing the debounce timer.
    ///
    /// Returns the waiter id that a later [`Effect::Resolve`] will complete.
    /// The current snapshot is written even when it matches the baseline.
    /// A request made while a save is in flight waits for it and only
    /// persists again if the data is still dirty. After teardown no effect
    /// is ever produced for the waiter.
    pub fn save_now(&mut self) -> (WaiterId, Vec<Effect<T>>) {
        let waiter = WaiterId(self.next_id());
        if !self.live {
            return (waiter, Vec::new());
        }

        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);

        if self.in_flight.is_some() {
            tracing::debug!("Auto-save: manual save queued behind in-flight save");
            self.deferred_waiters.push(waiter);
        } else {
            tracing::debug!(dirty = self.is_dirty(), "Auto-save: manual save");
            effects.push(self.start_persist(vec![waiter]));
        }
        (waiter, effects)
    }

    /// The persist started as `attempt` has completed.
    pub fn persist_settled(
        &mut self,
        attempt: AttemptId,
        outcome: Result<(), SaveFailure>,
        saved_at: DateTime<Utc>,
        now: Instant,
    ) -> Vec<Effect<T>> {
        if !self.live {
            tracing::trace!(?attempt, "Auto-save: outcome discarded after teardown");
            return Vec::new();
        }
        let flight = match self.in_flight.take() {
            Some(flight) if flight.attempt == attempt => flight,
            other => {
                self.in_flight = other;
                tracing::trace!(?attempt, "Auto-save: unknown attempt ignored");
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        match &outcome {
            Ok(()) => {
                tracing::info!(
                    fingerprint = %flight.fingerprint.short(),
                    "Auto-save: saved"
                );
                self.baseline = flight.fingerprint;
                self.last_saved = Some(saved_at);
                self.error = None;
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "Auto-save: save failed");
                if self.is_dirty() {
                    self.error = Some(failure.clone());
                }
            }
        }
        if !flight.waiters.is_empty() {
            effects.push(Effect::Resolve {
                waiters: flight.waiters,
                outcome: outcome.clone(),
            });
        }

        let deferred_waiters = mem::take(&mut self.deferred_waiters);
        if !self.is_dirty() {
            self.first_unsaved_change = None;
            self.deferred_auto = false;
            self.cancel_timer(&mut effects);
            if !deferred_waiters.is_empty() {
                effects.push(Effect::Resolve {
                    waiters: deferred_waiters,
                    outcome: Ok(()),
                });
            }
            return effects;
        }

        // Changes arrived while the save was in flight.
        if outcome.is_ok() {
            self.first_unsaved_change = Some(now);
        }
        let run_auto = self.deferred_auto && self.config.enabled;
        if !deferred_waiters.is_empty() || run_auto {
            self.cancel_timer(&mut effects);
            effects.push(self.start_persist(deferred_waiters));
        } else if outcome.is_ok() && self.config.enabled && self.timer.is_none() {
            effects.push(self.arm_timer(now));
        }
        effects
    }

    /// Turn automatic saving on or off.
    pub fn set_enabled(&mut self, enabled: bool, now: Instant) -> Vec<Effect<T>> {
        if !self.live || self.config.enabled == enabled {
            return Vec::new();
        }
        self.config.enabled = enabled;
        tracing::debug!(enabled, "Auto-save: enabled changed");

        let mut effects = Vec::new();
        if !enabled {
            self.deferred_auto = false;
            self.cancel_timer(&mut effects);
        } else if self.is_dirty()
            && self.in_flight.is_none()
            && self.timer.is_none()
            && self.error.is_none()
        {
            effects.push(self.arm_timer(now));
        }
        effects
    }

    /// Stop reconciling. Every later event is a no-op.
    pub fn teardown(&mut self) -> Vec<Effect<T>> {
        if !self.live {
            return Vec::new();
        }
        self.live = false;
        self.deferred_auto = false;
        self.deferred_waiters.clear();
        tracing::debug!(
            in_flight = self.in_flight.is_some(),
            "Auto-save: torn down"
        );

        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        effects
    }

    fn start_persist(&mut self, waiters: Vec<WaiterId>) -> Effect<T> {
        let attempt = AttemptId(self.next_id());
        self.deferred_auto = false;
        self.in_flight = Some(InFlight {
            attempt,
            fingerprint: self.current.fingerprint().clone(),
            waiters,
        });
        tracing::debug!(?attempt, "Auto-save: persist started");
        Effect::Persist {
            attempt,
            data: self.current.value().clone(),
        }
    }

    fn arm_timer(&mut self, now: Instant) -> Effect<T> {
        let since_first = self
            .first_unsaved_change
            .map_or(Duration::ZERO, |first| now.saturating_duration_since(first));
        let delay = self.config.timer_delay(since_first);
        let token = TimerToken(self.next_id());
        self.timer = Some(token);
        Effect::ArmTimer { token, delay }
    }

    fn cancel_timer(&mut self, effects: &mut Vec<Effect<T>>) {
        if self.timer.take().is_some() {
            effects.push(Effect::CancelTimer);
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
