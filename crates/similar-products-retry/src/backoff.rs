//! Backoff strategies between retry attempts.

use rand::Rng;
use std::time::Duration;

/// Computes the delay before the next attempt.
///
/// `attempt` is zero-based: `0` is the delay between the first call and the
/// first retry.
pub trait IntervalFunction: Send + Sync {
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.interval
    }
}

/// Delay grows by `multiplier` per attempt, capped at `max_interval`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl ExponentialBackoff {
    /// Doubles from `initial_interval` with no practical cap.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: Duration::from_secs(u32::MAX as u64),
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Exponential backoff with each delay spread by `± randomization_factor`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// `randomization_factor` is clamped to `[0.0, 1.0]`.
    pub fn new(base: ExponentialBackoff, randomization_factor: f64) -> Self {
        Self {
            base,
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let interval = self.base.next_interval(attempt);
        if self.randomization_factor == 0.0 {
            return interval;
        }
        let delta = interval.as_secs_f64() * self.randomization_factor;
        let low = interval.as_secs_f64() - delta;
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::rng().random_range(low..=high).max(0.0))
    }
}
