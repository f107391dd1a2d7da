//! Name-indexed collection of circuit breakers for operational reporting.

use crate::error::CircuitBreakerConfigError;
use crate::{CircuitBreaker, CircuitMetrics};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Holds one breaker per logical operation name.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<BTreeMap<String, CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a breaker under its own name.
    pub fn register(&self, breaker: CircuitBreaker) -> Result<(), CircuitBreakerConfigError> {
        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let name = breaker.name().to_string();
        if breakers.contains_key(&name) {
            return Err(CircuitBreakerConfigError::DuplicateName(name));
        }
        breakers.insert(name, breaker);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Metrics of every registered breaker, ordered by name.
    pub fn snapshot(&self) -> Vec<(String, CircuitMetrics)> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.metrics()))
            .collect()
    }

    /// Resets every registered breaker to closed.
    pub fn reset_all(&self) {
        for breaker in self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            breaker.reset();
        }
    }
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("names", &self.names())
            .finish()
    }
}
