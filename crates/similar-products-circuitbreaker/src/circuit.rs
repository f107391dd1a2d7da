use crate::config::CircuitBreakerConfig;
use crate::window::{Outcome, SlidingWindow};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is open and calls are rejected.
    Open = 1,
    /// The circuit is half-open and a limited number of trial calls are allowed.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of circuit breaker metrics for observability.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Number of outcomes currently buffered in the sliding window.
    pub total_calls: usize,
    /// Failed calls in the sliding window.
    pub failure_count: usize,
    /// Successful calls in the sliding window.
    pub success_count: usize,
    /// Failure rate over the window (0.0 to 1.0).
    pub failure_rate: f64,
    /// Calls rejected since the last reset.
    pub not_permitted_calls: u64,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// A state change, as delivered to transition listeners.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub name: String,
    pub from: CircuitState,
    pub to: CircuitState,
    pub at: Instant,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    window: SlidingWindow,
    half_open_admitted: usize,
    half_open_successes: usize,
    not_permitted: u64,
    epoch: u64,
}

impl Circuit {
    pub(crate) fn new(config: &CircuitBreakerConfig, state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            window: SlidingWindow::new(config.sliding_window_size),
            half_open_admitted: 0,
            half_open_successes: 0,
            not_permitted: 0,
            epoch: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    /// Changes on every transition; identifies the state a call was admitted in.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            total_calls: self.window.len(),
            failure_count: self.window.failures(),
            success_count: self.window.successes(),
            failure_rate: self.window.failure_rate(),
            not_permitted_calls: self.not_permitted,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may proceed.
    ///
    /// The admission that observes an elapsed open wait moves the circuit to
    /// half-open and counts as its first trial call.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.wait_duration_in_open {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_admitted = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_admitted < config.permitted_calls_in_half_open {
                    self.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !permitted {
            self.not_permitted += 1;

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
        }

        permitted
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig) {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.window.push(Outcome::Success);
                self.evaluate_window(config);
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= config.permitted_calls_in_half_open {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            // Late outcome of a call admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.window.push(Outcome::Failure);
                self.evaluate_window(config);
            }
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config),
            CircuitState::Open => {}
        }
    }

    /// Gives back the trial slot of a half-open call that ended without an
    /// outcome. Calls admitted in an earlier state are ignored.
    pub(crate) fn release(&mut self, epoch: u64) -> bool {
        if self.state != CircuitState::HalfOpen || self.epoch != epoch {
            return false;
        }
        let in_flight = self.half_open_admitted > self.half_open_successes;
        if in_flight {
            self.half_open_admitted -= 1;
        }
        in_flight
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    /// Returns to closed with an empty window and cleared counters.
    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.window.clear();
        self.not_permitted = 0;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = %from_state, to = %state, "Circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.epoch = self.epoch.wrapping_add(1);
        self.window.clear();
        self.half_open_admitted = 0;
        self.half_open_successes = 0;

        if !config.transition_listeners.is_empty() {
            let transition = StateTransition {
                name: config.name.clone(),
                from: from_state,
                to: state,
                at: self.last_state_change,
            };
            for listener in &config.transition_listeners {
                listener(&transition);
            }
        }
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig) {
        // Don't evaluate until minimum calls threshold is met
        if self.window.len() < config.minimum_number_of_calls {
            return;
        }

        if self.window.failure_rate() >= config.failure_rate_threshold {
            self.transition_to(CircuitState::Open, config);
        }
    }
}
