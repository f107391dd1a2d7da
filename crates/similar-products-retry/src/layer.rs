use crate::{Retry, RetryConfig};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies retry logic to a service.
///
/// ```
/// use similar_products_retry::RetryConfig;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// # fn example() -> Result<(), similar_products_retry::RetryConfigError> {
/// let retry_layer = RetryConfig::<MyError>::builder()
///     .max_attempts(3)
///     .exponential_backoff(Duration::from_millis(100), Duration::from_secs(1))
///     .build()?
///     .layer();
///
/// let service = ServiceBuilder::new()
///     .layer(retry_layer)
///     .service(tower::service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
/// # Ok(())
/// # }
/// ```
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    pub fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
