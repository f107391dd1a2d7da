use thiserror::Error;

/// Errors returned by the [`CircuitBreakerService`](crate::CircuitBreakerService).
#[derive(Debug, Clone, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; calls are not permitted.
    #[error("circuit '{name}' is open; call not permitted")]
    OpenCircuit { name: String },

    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::OpenCircuit { .. } => None,
        }
    }
}

/// Error raised when a circuit breaker configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerConfigError {
    #[error("invalid circuit breaker '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("circuit breaker '{0}' is already registered")]
    DuplicateName(String),
}
