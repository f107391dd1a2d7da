//! Retry configuration and policy.

use crate::backoff::{ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction};
use crate::{RetryConfigError, RetryLayer};
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Validated retry settings for errors of type `E`.
pub struct RetryConfig<E> {
    pub(crate) name: String,
    pub(crate) max_attempts: usize,
    pub(crate) interval: Arc<dyn IntervalFunction>,
    pub(crate) retry_on: Option<RetryPredicate<E>>,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total attempts, including the first call.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub(crate) fn should_retry(&self, error: &E) -> bool {
        self.retry_on.as_ref().map_or(true, |predicate| predicate(error))
    }

    pub(crate) fn next_backoff(&self, attempt: usize) -> Duration {
        self.interval.next_interval(attempt)
    }

    /// Wraps this configuration in a layer.
    pub fn layer(self) -> RetryLayer<E> {
        RetryLayer::new(self)
    }
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            max_attempts: self.max_attempts,
            interval: Arc::clone(&self.interval),
            retry_on: self.retry_on.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("retry_on", &self.retry_on.is_some())
            .finish()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    name: String,
    max_attempts: usize,
    interval: Arc<dyn IntervalFunction>,
    retry_on: Option<RetryPredicate<E>>,
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            max_attempts: 3,
            interval: Arc::new(
                ExponentialBackoff::new(Duration::from_millis(100))
                    .max_interval(Duration::from_secs(1)),
            ),
            retry_on: None,
        }
    }

    /// Sets the total number of attempts, including the first call.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Waits the same `interval` before every retry.
    pub fn fixed_backoff(mut self, interval: Duration) -> Self {
        self.interval = Arc::new(FixedInterval::new(interval));
        self
    }

    /// Doubles the delay from `initial` on every retry, capped at `max`.
    ///
    /// Default: 100 ms doubling up to 1 s
    pub fn exponential_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.interval = Arc::new(ExponentialBackoff::new(initial).max_interval(max));
        self
    }

    /// Like [`exponential_backoff`](Self::exponential_backoff) with each delay
    /// spread by `± randomization_factor`.
    pub fn exponential_random_backoff(
        mut self,
        initial: Duration,
        max: Duration,
        randomization_factor: f64,
    ) -> Self {
        let base = ExponentialBackoff::new(initial).max_interval(max);
        self.interval = Arc::new(ExponentialRandomBackoff::new(base, randomization_factor));
        self
    }

    /// Uses a custom interval function.
    pub fn backoff<I>(mut self, interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval = Arc::new(interval);
        self
    }

    /// Retries only errors for which `predicate` returns `true`.
    ///
    /// Default: every error is retried
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Some(Arc::new(predicate));
        self
    }

    /// Sets the name of this retry instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> Result<RetryConfig<E>, RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::ZeroAttempts { name: self.name });
        }
        Ok(RetryConfig {
            name: self.name,
            max_attempts: self.max_attempts,
            interval: self.interval,
            retry_on: self.retry_on,
        })
    }
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
