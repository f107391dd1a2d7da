//! Configuration for the circuit breaker.

use crate::circuit::StateTransition;
use crate::error::CircuitBreakerConfigError;
use crate::CircuitBreaker;
use std::sync::Arc;
use std::time::Duration;

pub(crate) type TransitionListener = Arc<dyn Fn(&StateTransition) + Send + Sync>;

/// Validated circuit breaker settings.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) name: String,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) sliding_window_size: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) transition_listeners: Vec<TransitionListener>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_rate_threshold(&self) -> f64 {
        self.failure_rate_threshold
    }

    pub fn sliding_window_size(&self) -> usize {
        self.sliding_window_size
    }

    pub fn minimum_number_of_calls(&self) -> usize {
        self.minimum_number_of_calls
    }

    pub fn wait_duration_in_open(&self) -> Duration {
        self.wait_duration_in_open
    }

    pub fn permitted_calls_in_half_open(&self) -> usize {
        self.permitted_calls_in_half_open
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("name", &self.name)
            .field("failure_rate_threshold", &self.failure_rate_threshold)
            .field("sliding_window_size", &self.sliding_window_size)
            .field("minimum_number_of_calls", &self.minimum_number_of_calls)
            .field("wait_duration_in_open", &self.wait_duration_in_open)
            .field(
                "permitted_calls_in_half_open",
                &self.permitted_calls_in_half_open,
            )
            .field("transition_listeners", &self.transition_listeners.len())
            .finish()
    }
}

/// Builder for configuring and constructing a [`CircuitBreaker`].
pub struct CircuitBreakerConfigBuilder {
    name: String,
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    minimum_number_of_calls: usize,
    wait_duration_in_open: Duration,
    permitted_calls_in_half_open: usize,
    transition_listeners: Vec<TransitionListener>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            failure_rate_threshold: 0.5,
            sliding_window_size: 5,
            minimum_number_of_calls: 3,
            wait_duration_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
            transition_listeners: Vec::new(),
        }
    }

    /// Sets the failure rate threshold (0.0 to 1.0] at which the circuit opens.
    ///
    /// Default: 0.5 (50%)
    pub fn failure_rate_threshold(mut self, rate: f64) -> Self {
        self.failure_rate_threshold = rate;
        self
    }

    /// Sets how many of the most recent calls the failure rate is computed over.
    ///
    /// Default: 5
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets how many calls the window must hold before the failure rate is
    /// evaluated at all. Must not exceed the window size.
    ///
    /// Default: 3
    pub fn minimum_number_of_calls(mut self, count: usize) -> Self {
        self.minimum_number_of_calls = count;
        self
    }

    /// Sets how long the circuit stays open before admitting a trial call.
    ///
    /// Default: 10 seconds
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open = duration;
        self
    }

    /// Sets the number of trial calls admitted while half-open.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open(mut self, count: usize) -> Self {
        self.permitted_calls_in_half_open = count;
        self
    }

    /// Sets the name of this circuit breaker instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked on every state transition.
    ///
    /// Callbacks run while the breaker's lock is held and must not call back
    /// into the same breaker.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&StateTransition) + Send + Sync + 'static,
    {
        self.transition_listeners.push(Arc::new(f));
        self
    }

    /// Validates the settings without building a breaker.
    pub fn into_config(self) -> Result<CircuitBreakerConfig, CircuitBreakerConfigError> {
        let invalid = |reason: &str| CircuitBreakerConfigError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 1.0) {
            return Err(invalid("failure_rate_threshold must be in (0.0, 1.0]"));
        }
        if self.sliding_window_size == 0 {
            return Err(invalid("sliding_window_size must be at least 1"));
        }
        if self.minimum_number_of_calls == 0
            || self.minimum_number_of_calls > self.sliding_window_size
        {
            return Err(invalid(
                "minimum_number_of_calls must be between 1 and sliding_window_size",
            ));
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(invalid("permitted_calls_in_half_open must be at least 1"));
        }
        if self.wait_duration_in_open.is_zero() {
            return Err(invalid("wait_duration_in_open must be non-zero"));
        }

        Ok(CircuitBreakerConfig {
            name: self.name,
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls: self.minimum_number_of_calls,
            wait_duration_in_open: self.wait_duration_in_open,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            transition_listeners: self.transition_listeners,
        })
    }

    /// Builds the circuit breaker.
    pub fn build(self) -> Result<CircuitBreaker, CircuitBreakerConfigError> {
        self.into_config().map(CircuitBreaker::new)
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
