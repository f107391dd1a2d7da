//! Count-based sliding window over the most recent call outcomes.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Failure,
}

/// Ring buffer of the last `capacity` outcomes with a running failure count.
#[derive(Debug)]
pub(crate) struct SlidingWindow {
    outcomes: VecDeque<Outcome>,
    capacity: usize,
    failures: usize,
}

impl SlidingWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    /// Records an outcome, dropping the oldest one once the window is full.
    pub(crate) fn push(&mut self, outcome: Outcome) {
        if self.outcomes.len() == self.capacity {
            if let Some(Outcome::Failure) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        if outcome == Outcome::Failure {
            self.failures += 1;
        }
        self.outcomes.push_back(outcome);
    }

    pub(crate) fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures
    }

    pub(crate) fn successes(&self) -> usize {
        self.outcomes.len() - self.failures
    }

    /// Failure rate in `[0.0, 1.0]`, or `0.0` when empty.
    pub(crate) fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.outcomes.len() as f64
        }
    }

    pub(crate) fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}
