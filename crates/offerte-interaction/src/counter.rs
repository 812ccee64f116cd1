//! Eased number display for totals and dashboard figures.

use std::time::{Duration, Instant};

/// Default animation length.
pub const DEFAULT_DURATION_MS: u64 = 1000;

/// Animates a displayed number toward its latest target.
#[derive(Debug, Clone)]
pub struct AnimatedCounter {
    duration: Duration,
    from: f64,
    to: f64,
    started: Option<Instant>,
}

impl AnimatedCounter {
    /// A counter resting at `value`.
    pub fn new(value: f64) -> Self {
        Self::with_duration(value, Duration::from_millis(DEFAULT_DURATION_MS))
    }

    pub fn with_duration(value: f64, duration: Duration) -> Self {
        Self {
            duration,
            from: value,
            to: value,
            started: None,
        }
    }

    /// The value being animated toward.
    pub fn target(&self) -> f64 {
        self.to
    }

    /// Start animating toward `value` from whatever is displayed at `now`.
    pub fn retarget(&mut self, value: f64, now: Instant) {
        if value == self.to {
            return;
        }
        self.from = self.value_at(now);
        self.to = value;
        self.started = Some(now);
    }

    /// Displayed value at `now`.
    pub fn value_at(&self, now: Instant) -> f64 {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * ease_out_cubic(progress)
    }

    /// Displayed value rounded for whole-unit display (cents, counts).
    pub fn rounded_at(&self, now: Instant) -> i64 {
        self.value_at(now).round() as i64
    }

    /// Whether the animation has reached its target.
    pub fn is_settled(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    fn progress(&self, now: Instant) -> f64 {
        let Some(started) = self.started else {
            return 1.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

/// `1 - (1 - t)^3`: fast start, gentle landing.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_resting_counter_is_settled() {
        let counter = AnimatedCounter::new(42.0);
        let now = Instant::now();
        assert!(counter.is_settled(now));
        assert_eq!(counter.value_at(now), 42.0);
    }

    #[test]
    fn test_eases_to_target() {
        let t0 = Instant::now();
        let mut counter = AnimatedCounter::new(0.0);
        counter.retarget(1000.0, t0);

        assert_eq!(counter.value_at(t0), 0.0);
        // Half way through the time, 87.5% of the distance
        assert!((counter.value_at(t0 + ms(500)) - 875.0).abs() < 1e-6);
        assert!(!counter.is_settled(t0 + ms(999)));
        assert_eq!(counter.value_at(t0 + ms(1000)), 1000.0);
        assert!(counter.is_settled(t0 + ms(1000)));
        assert_eq!(counter.rounded_at(t0 + ms(5000)), 1000);
    }

    #[test]
    fn test_retarget_continues_from_displayed_value() {
        let t0 = Instant::now();
        let mut counter = AnimatedCounter::new(0.0);
        counter.retarget(1000.0, t0);

        let mid = t0 + ms(500);
        let shown = counter.value_at(mid);
        counter.retarget(2000.0, mid);

        assert_eq!(counter.value_at(mid), shown);
        assert_eq!(counter.value_at(mid + ms(1000)), 2000.0);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let t0 = Instant::now();
        let mut counter = AnimatedCounter::with_duration(10.0, Duration::ZERO);
        counter.retarget(20.0, t0);
        assert_eq!(counter.value_at(t0), 20.0);
        assert!(counter.is_settled(t0));
    }

    proptest! {
        #[test]
        fn prop_value_stays_between_start_and_target(
            from in -1.0e6f64..1.0e6,
            to in -1.0e6f64..1.0e6,
            elapsed in 0u64..2000,
        ) {
            let t0 = Instant::now();
            let mut counter = AnimatedCounter::new(from);
            counter.retarget(to, t0);
            let value = counter.value_at(t0 + ms(elapsed));
            let (low, high) = if from <= to { (from, to) } else { (to, from) };
            prop_assert!(value >= low - 1e-6 && value <= high + 1e-6);
        }
    }
}
