//! Failure classification for circuit breaker decisions.

use std::sync::Arc;

/// Decides whether a call result counts as a failure in the sliding window.
///
/// Results classified as non-failures are recorded as successes, which is how
/// definitive answers such as "not found" keep the circuit closed.
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` if the result should count toward the failure rate.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// Treats every error as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, Err> FailureClassifier<Res, Err> for DefaultClassifier {
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        result.is_err()
    }
}

/// A failure classifier backed by a closure.
///
/// ```rust
/// use similar_products_circuitbreaker::{FailureClassifier, FnClassifier};
/// use std::io::{Error, ErrorKind};
///
/// let classifier = FnClassifier::new(|result: &Result<String, Error>| match result {
///     Ok(_) => false,
///     Err(e) => e.kind() != ErrorKind::NotFound,
/// });
///
/// assert!(!classifier.classify(&Err(Error::new(ErrorKind::NotFound, "gone"))));
/// assert!(classifier.classify(&Err(Error::other("boom"))));
/// ```
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> Clone for FnClassifier<F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}
