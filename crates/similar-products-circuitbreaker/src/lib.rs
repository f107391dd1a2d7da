//! Circuit breaker for Tower services.
//!
//! A [`CircuitBreaker`] is an explicitly constructed, shareable handle. It
//! tracks the outcomes of the most recent calls in a count-based sliding
//! window and rejects calls while the failure rate is too high.
//!
//! ## States
//! - **Closed**: calls pass through; outcomes fill the sliding window
//! - **Open**: calls are rejected immediately
//! - **HalfOpen**: after the open wait, a limited number of trial calls decide
//!   whether the circuit closes again
//!
//! The breaker opens once the window holds at least
//! `minimum_number_of_calls` outcomes and the failure rate reaches
//! `failure_rate_threshold`. Outcomes keep sliding: the oldest outcome leaves
//! the window when a new one arrives.
//!
//! ## Usage
//!
//! ```rust
//! use similar_products_circuitbreaker::{CircuitBreaker, CircuitBreakerLayer};
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::builder()
//!     .name("product-detail")
//!     .sliding_window_size(5)
//!     .minimum_number_of_calls(3)
//!     .failure_rate_threshold(0.5)
//!     .wait_duration_in_open(Duration::from_secs(10))
//!     .build()?;
//!
//! let service = tower::service_fn(|id: String| async move { Ok::<_, std::io::Error>(id) });
//! let guarded = CircuitBreakerLayer::new(breaker.clone()).layer(service);
//!
//! let response = guarded.oneshot("42".to_string()).await?;
//! assert_eq!(response, "42");
//! assert_eq!(breaker.metrics().success_count, 1);
//! # Ok(())
//! # }
//! ```
//!
//! Without the layer, callers drive the breaker directly through
//! [`CircuitBreaker::acquire`] and [`CallPermit::record`].

mod circuit;
mod classifier;
mod config;
mod error;
mod layer;
mod registry;
mod window;

pub use circuit::{CircuitMetrics, CircuitState, StateTransition};
pub use classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::{CircuitBreakerConfigError, CircuitBreakerError};
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};
pub use registry::CircuitBreakerRegistry;

use circuit::Circuit;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};

struct Shared {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
    state: Arc<AtomicU8>,
}

/// A shareable circuit breaker. Clones observe and drive the same circuit.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Creates a closed breaker from a validated configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "circuitbreaker_calls_total",
                "Total number of calls through the circuit breaker, by outcome"
            );
            describe_counter!(
                "circuitbreaker_transitions_total",
                "Total number of circuit breaker state transitions"
            );
            describe_gauge!(
                "circuitbreaker_state",
                "Current circuit state (0 = closed, 1 = open, 2 = half-open)"
            );
        }

        let state = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let circuit = Circuit::new(&config, Arc::clone(&state));
        Self {
            shared: Arc::new(Shared {
                config,
                circuit: Mutex::new(circuit),
                state,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Current state, read without taking the lock.
    ///
    /// An open circuit whose wait has elapsed still reads as open until the
    /// next admission attempt moves it to half-open.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Asks for permission to make one call.
    ///
    /// Every permitted call must be followed by exactly one [`record`](Self::record).
    /// Prefer [`acquire`](Self::acquire) when the call may be cancelled.
    pub fn try_acquire(&self) -> bool {
        let permitted = self.lock().try_acquire(&self.shared.config);
        self.trace_admission(permitted);
        permitted
    }

    /// Asks for permission to make one call and returns a guard for it.
    ///
    /// The outcome is reported through [`CallPermit::record`]. A permit
    /// dropped without an outcome gives its half-open trial slot back, so a
    /// cancelled trial call cannot leave the circuit half-open for good.
    pub fn acquire(&self) -> Option<CallPermit> {
        let epoch = {
            let mut circuit = self.lock();
            if circuit.try_acquire(&self.shared.config) {
                Some(circuit.epoch())
            } else {
                None
            }
        };
        self.trace_admission(epoch.is_some());

        epoch.map(|epoch| CallPermit {
            breaker: self.clone(),
            epoch,
            settled: false,
        })
    }

    fn trace_admission(&self, permitted: bool) {
        #[cfg(feature = "tracing")]
        {
            let name = &self.shared.config.name;
            if permitted {
                tracing::trace!(breaker = %name, "circuit breaker permitted call");
            } else {
                tracing::debug!(breaker = %name, "circuit breaker rejected call");
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = permitted;
    }

    /// Records the outcome of a permitted call.
    pub fn record(&self, is_failure: bool) {
        if is_failure {
            self.record_failure();
        } else {
            self.record_success();
        }
    }

    pub fn record_success(&self) {
        self.lock().record_success(&self.shared.config);
    }

    pub fn record_failure(&self) {
        self.lock().record_failure(&self.shared.config);
    }

    /// Forces the circuit open, rejecting calls until the open wait elapses.
    pub fn force_open(&self) {
        self.lock().force_open(&self.shared.config);
    }

    /// Forces the circuit closed without clearing rejection counters.
    pub fn force_closed(&self) {
        self.lock().force_closed(&self.shared.config);
    }

    /// Returns the breaker to closed and clears all buffered outcomes.
    pub fn reset(&self) {
        self.lock().reset(&self.shared.config);
    }

    pub fn metrics(&self) -> CircuitMetrics {
        self.lock().metrics()
    }

    /// Health label for reporting: `healthy`, `degraded` or `unhealthy`.
    pub fn health_status(&self) -> &'static str {
        match self.state() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    /// Shorthand for a layer with the default classifier.
    pub fn layer(&self) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.shared
            .circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for one call, handed out by [`CircuitBreaker::acquire`].
#[must_use = "a permit should be settled with `record`"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    epoch: u64,
    settled: bool,
}

impl CallPermit {
    /// Reports the outcome of the permitted call.
    pub fn record(mut self, is_failure: bool) {
        self.settled = true;
        self.breaker.record(is_failure);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let released = self.breaker.lock().release(self.epoch);

        #[cfg(feature = "tracing")]
        {
            if released {
                tracing::debug!(breaker = %self.breaker.name(), "abandoned half-open trial released");
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = released;
    }
}

impl std::fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.name())
            .field("settled", &self.settled)
            .finish()
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
