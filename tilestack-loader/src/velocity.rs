//! Scroll velocity tracking with edge-triggered fast/slow transitions.

use std::time::Duration;

use tracing::debug;

use crate::Instant;

/// Scroll speed above which loading is paused (pixels per second).
pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 900.0;

/// Lower bound on the time between two samples, so back-to-back samples
/// inside one clock tick never divide by zero.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Whether the page is currently scrolling fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedState {
    /// At or below the threshold.
    #[default]
    Slow,
    /// Above the threshold.
    Fast,
}

/// A change of [`SpeedState`], reported once per crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTransition {
    /// Speed rose above the threshold.
    BecameFast,
    /// Speed fell back to or below the threshold.
    BecameSlow,
}

/// Samples the scroll position and reports threshold crossings.
///
/// ```
/// use std::time::{Duration, Instant};
/// use tilestack_loader::velocity::{ScrollVelocityMonitor, SpeedTransition};
///
/// let start = Instant::now();
/// let mut monitor = ScrollVelocityMonitor::new(0.0, start, 900.0);
///
/// let fast = monitor.sample(100.0, start + Duration::from_millis(50));
/// assert_eq!(fast, Some(SpeedTransition::BecameFast));
///
/// let still_fast = monitor.sample(200.0, start + Duration::from_millis(100));
/// assert_eq!(still_fast, None);
/// ```
#[derive(Debug, Clone)]
pub struct ScrollVelocityMonitor {
    last_position: f64,
    last_sample: Instant,
    velocity: f64,
    threshold: f64,
    state: SpeedState,
}

impl ScrollVelocityMonitor {
    /// Starts monitoring from `position`, in the slow state.
    pub fn new(position: f64, now: Instant, threshold: f64) -> Self {
        Self {
            last_position: position,
            last_sample: now,
            velocity: 0.0,
            threshold,
            state: SpeedState::Slow,
        }
    }

    /// Records one position sample.
    ///
    /// Returns a transition only when the speed state changes.
    pub fn sample(&mut self, position: f64, now: Instant) -> Option<SpeedTransition> {
        let elapsed = now
            .saturating_duration_since(self.last_sample)
            .max(MIN_SAMPLE_INTERVAL);
        self.velocity = (position - self.last_position).abs() / elapsed.as_secs_f64();
        self.last_position = position;
        self.last_sample = now;

        let next = if self.velocity > self.threshold {
            SpeedState::Fast
        } else {
            SpeedState::Slow
        };
        if next == self.state {
            return None;
        }
        self.state = next;
        debug!("Scroll speed {:.0}px/s, now {next:?}", self.velocity);
        Some(match next {
            SpeedState::Fast => SpeedTransition::BecameFast,
            SpeedState::Slow => SpeedTransition::BecameSlow,
        })
    }

    /// Velocity computed from the last two samples, in pixels per second.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// The current speed state.
    pub fn state(&self) -> SpeedState {
        self.state
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn starts_slow() {
        let monitor = ScrollVelocityMonitor::new(40.0, Instant::now(), DEFAULT_VELOCITY_THRESHOLD);
        assert_eq!(monitor.state(), SpeedState::Slow);
        assert_eq!(monitor.velocity(), 0.0);
    }

    #[test]
    fn transitions_are_edge_triggered() {
        let start = Instant::now();
        let mut monitor = ScrollVelocityMonitor::new(0.0, start, DEFAULT_VELOCITY_THRESHOLD);

        // 2000px/s, 2000px/s, then 200px/s twice.
        assert_eq!(
            monitor.sample(100.0, start + ms(50)),
            Some(SpeedTransition::BecameFast)
        );
        assert_eq!(monitor.sample(200.0, start + ms(100)), None);
        assert_eq!(
            monitor.sample(210.0, start + ms(150)),
            Some(SpeedTransition::BecameSlow)
        );
        assert_eq!(monitor.sample(220.0, start + ms(200)), None);
    }

    #[test]
    fn threshold_is_strict() {
        let start = Instant::now();
        let mut monitor = ScrollVelocityMonitor::new(0.0, start, DEFAULT_VELOCITY_THRESHOLD);
        assert_eq!(monitor.sample(450.0, start + ms(500)), None);
        assert_eq!(monitor.velocity(), 900.0);
        assert_eq!(monitor.state(), SpeedState::Slow);
    }

    #[test]
    fn direction_does_not_matter() {
        let start = Instant::now();
        let mut monitor = ScrollVelocityMonitor::new(5000.0, start, DEFAULT_VELOCITY_THRESHOLD);
        assert_eq!(
            monitor.sample(0.0, start + ms(500)),
            Some(SpeedTransition::BecameFast)
        );
        assert_eq!(monitor.velocity(), 10_000.0);
    }

    #[test]
    fn same_instant_samples_use_minimum_interval() {
        let start = Instant::now();
        let mut monitor = ScrollVelocityMonitor::new(0.0, start, DEFAULT_VELOCITY_THRESHOLD);
        assert_eq!(
            monitor.sample(1.0, start),
            Some(SpeedTransition::BecameFast)
        );
        assert_eq!(monitor.velocity(), 1000.0);
        assert!(monitor.velocity().is_finite());
    }
}
