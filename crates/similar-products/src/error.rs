//! Error taxonomy of upstream access and startup configuration.

use similar_products_cache::CacheConfigError;
use similar_products_circuitbreaker::{CircuitBreakerConfigError, CircuitBreakerError};
use similar_products_retry::RetryConfigError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream operation.
///
/// None of these escape the repository: every one is resolved to an empty
/// sequence or an absent product by the fallback layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Upstream answered 404.
    #[error("not found upstream")]
    NotFound,

    /// The call did not complete within its time limit.
    #[error("upstream call timed out after {after:?}")]
    Timeout { after: Duration },

    /// Upstream answered with a non-success status other than 404.
    #[error("upstream responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The circuit breaker rejected the call.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// The response body could not be decoded.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// The request could not be sent or the body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, FetchError::CircuitOpen { .. })
    }

    /// Whether another attempt could succeed. A 404 is definitive and an open
    /// circuit must not be hammered.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::NotFound | FetchError::CircuitOpen { .. })
    }

    /// Whether the outcome counts against the circuit breaker.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, FetchError::NotFound | FetchError::CircuitOpen { .. })
    }
}

impl From<CircuitBreakerError<FetchError>> for FetchError {
    fn from(err: CircuitBreakerError<FetchError>) -> Self {
        match err {
            CircuitBreakerError::OpenCircuit { name } => FetchError::CircuitOpen { name },
            CircuitBreakerError::Inner(inner) => inner,
        }
    }
}

/// Invalid startup configuration. Raised once while wiring, never per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid upstream base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{field} must be {expected}, got {actual}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheConfigError),

    #[error(transparent)]
    CircuitBreaker(#[from] CircuitBreakerConfigError),

    #[error(transparent)]
    Retry(#[from] RetryConfigError),

    #[error("failed to parse configuration: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
