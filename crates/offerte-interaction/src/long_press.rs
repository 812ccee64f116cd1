//! Long-press detection.
//!
//! Pointer events and clock readings come from the caller, so the detector
//! works the same under a UI event loop, a terminal, or a test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Long-press tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPressConfig {
    /// How long the pointer must stay down.
    pub threshold_ms: u64,
    /// How far the pointer may wander before the press is abandoned.
    pub move_tolerance: f32,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 500,
            move_tolerance: 10.0,
        }
    }
}

impl LongPressConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

/// Pointer position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_to(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// What a press turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPressEvent {
    /// Held long enough; fires while the pointer is still down.
    Fired,
    /// Released before the threshold.
    Tap,
    /// Released after [`LongPressEvent::Fired`].
    LongPressEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Pressed { since: Instant, origin: Point },
    Fired,
    Abandoned,
}

/// Detects long presses from raw pointer events.
#[derive(Debug, Clone)]
pub struct LongPress {
    config: LongPressConfig,
    phase: Phase,
}

impl Default for LongPress {
    fn default() -> Self {
        Self::new(LongPressConfig::default())
    }
}

impl LongPress {
    pub fn new(config: LongPressConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }

    /// Pointer went down. A press already in progress is replaced.
    pub fn press(&mut self, at: Instant, position: Point) {
        self.phase = Phase::Pressed {
            since: at,
            origin: position,
        };
    }

    /// Pointer moved while down.
    pub fn moved(&mut self, position: Point) {
        if let Phase::Pressed { origin, .. } = self.phase
            && origin.distance_to(position) > self.config.move_tolerance
        {
            tracing::trace!("Long press abandoned: pointer moved");
            self.phase = Phase::Abandoned;
        }
    }

    /// Check the clock. Returns [`LongPressEvent::Fired`] exactly once per
    /// press, as soon as the threshold has passed.
    pub fn poll(&mut self, now: Instant) -> Option<LongPressEvent> {
        match self.phase {
            Phase::Pressed { since, .. }
                if now.saturating_duration_since(since) >= self.config.threshold() =>
            {
                self.phase = Phase::Fired;
                Some(LongPressEvent::Fired)
            }
            _ => None,
        }
    }

    /// Pointer went up.
    pub fn release(&mut self, at: Instant) -> Option<LongPressEvent> {
        // A release after the threshold counts even if nobody polled in time.
        let fired = self.poll(at).is_some();
        let event = match self.phase {
            Phase::Fired if fired => Some(LongPressEvent::Fired),
            Phase::Fired => Some(LongPressEvent::LongPressEnd),
            Phase::Pressed { .. } => Some(LongPressEvent::Tap),
            Phase::Idle | Phase::Abandoned => None,
        };
        self.phase = Phase::Idle;
        event
    }

    /// Abandon the current press (pointer left the target, scroll began).
    pub fn cancel(&mut self) {
        if self.phase != Phase::Idle {
            self.phase = Phase::Abandoned;
        }
    }

    /// When the caller should poll next, if a press is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pressed { since, .. } => Some(since + self.config.threshold()),
            _ => None,
        }
    }

    /// Whether a long press is currently held.
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_quick_release_is_tap() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::new(5.0, 5.0));
        assert_eq!(press.poll(t0 + ms(200)), None);
        assert_eq!(press.release(t0 + ms(250)), Some(LongPressEvent::Tap));
        assert_eq!(press.deadline(), None);
    }

    #[test]
    fn test_hold_fires_once_then_ends() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::default());
        assert_eq!(press.deadline(), Some(t0 + ms(500)));

        assert_eq!(press.poll(t0 + ms(499)), None);
        assert_eq!(press.poll(t0 + ms(500)), Some(LongPressEvent::Fired));
        assert_eq!(press.poll(t0 + ms(900)), None);
        assert!(press.is_active());
        assert_eq!(
            press.release(t0 + ms(1200)),
            Some(LongPressEvent::LongPressEnd)
        );
        assert!(!press.is_active());
    }

    #[test]
    fn test_late_release_without_poll_reports_fired() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::default());
        assert_eq!(press.release(t0 + ms(800)), Some(LongPressEvent::Fired));
    }

    #[test]
    fn test_small_jitter_is_tolerated() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::new(100.0, 100.0));
        press.moved(Point::new(106.0, 108.0));
        assert_eq!(press.poll(t0 + ms(500)), Some(LongPressEvent::Fired));
    }

    #[test]
    fn test_moving_out_abandons() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::new(100.0, 100.0));
        press.moved(Point::new(100.0, 111.0));
        assert_eq!(press.poll(t0 + ms(600)), None);
        assert_eq!(press.release(t0 + ms(700)), None);
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut press = LongPress::default();
        press.press(t0, Point::default());
        press.cancel();
        assert_eq!(press.deadline(), None);
        assert_eq!(press.release(t0 + ms(50)), None);
    }

    #[test]
    fn test_custom_threshold() {
        let t0 = Instant::now();
        let mut press = LongPress::new(LongPressConfig {
            threshold_ms: 1500,
            ..LongPressConfig::default()
        });
        press.press(t0, Point::default());
        assert_eq!(press.poll(t0 + ms(1000)), None);
        assert_eq!(press.poll(t0 + ms(1500)), Some(LongPressEvent::Fired));
    }
}
