//! Bounded retry middleware for Tower services.
//!
//! [`Retry`] re-issues a failed request up to a fixed number of attempts,
//! sleeping between attempts according to an [`IntervalFunction`]. Errors
//! rejected by the configured predicate are returned immediately, and the
//! error of the last attempt is the terminal failure.
//!
//! - Fixed, exponential and randomized exponential backoff
//! - Retry predicates to skip definitive errors
//! - Optional `tracing` and `metrics` instrumentation

mod backoff;
mod config;
mod layer;

pub use backoff::{ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction};
pub use config::{RetryConfig, RetryConfigBuilder, RetryPredicate};
pub use layer::RetryLayer;

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Error raised when a retry configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryConfigError {
    #[error("retry '{name}' must allow at least one attempt")]
    ZeroAttempts { name: String },
}

/// A Tower [`Service`] that retries failed requests.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        Self { inner, config }
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    S::Response: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let mut attempt = 0;

            loop {
                let result = match service.ready().await {
                    Ok(ready) => ready.call(req.clone()).await,
                    Err(error) => Err(error),
                };

                let error = match result {
                    Ok(response) => {
                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "success").increment(1);

                        #[cfg(feature = "tracing")]
                        {
                            if attempt > 0 {
                                debug!(retry = %config.name, attempts = attempt + 1, "Call succeeded after retry");
                            }
                        }

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                if !config.should_retry(&error) {
                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "ignored").increment(1);

                    #[cfg(feature = "tracing")]
                    debug!(retry = %config.name, %error, "Error is not retryable");

                    return Err(error);
                }

                if attempt + 1 >= config.max_attempts {
                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "exhausted").increment(1);

                    #[cfg(feature = "tracing")]
                    warn!(retry = %config.name, attempts = attempt + 1, %error, "Retries exhausted");

                    return Err(error);
                }

                let delay = config.next_backoff(attempt);

                #[cfg(feature = "tracing")]
                debug!(retry = %config.name, attempt = attempt + 1, ?delay, %error, "Retrying after failure");

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        })
    }
}
