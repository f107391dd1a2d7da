use crate::error::FetchError;
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, warn};

/// Substitutes a degraded response for any [`FetchError`].
///
/// The resulting service never fails.
pub struct FallbackLayer<F> {
    name: Arc<str>,
    fallback: Arc<F>,
}

impl<F> FallbackLayer<F> {
    pub fn new(name: &str, fallback: F) -> Self {
        Self {
            name: Arc::from(name),
            fallback: Arc::new(fallback),
        }
    }
}

impl<F> Clone for FallbackLayer<F> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl<S, F> Layer<S> for FallbackLayer<F> {
    type Service = Fallback<S, F>;

    fn layer(&self, inner: S) -> Self::Service {
        Fallback {
            inner,
            name: Arc::clone(&self.name),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

/// Service produced by [`FallbackLayer`].
pub struct Fallback<S, F> {
    inner: S,
    name: Arc<str>,
    fallback: Arc<F>,
}

impl<S: Clone, F> Clone for Fallback<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: Arc::clone(&self.name),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl<S, F, Req> Service<Req> for Fallback<S, F>
where
    S: Service<Req, Error = FetchError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    F: Fn(&FetchError) -> S::Response + Send + Sync + 'static,
    Req: Display + Send + 'static,
{
    type Response = S::Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // readiness of the inner service is awaited per call, so a readiness
        // error is substituted like any other failure
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let name = Arc::clone(&self.name);
        let fallback = Arc::clone(&self.fallback);

        Box::pin(async move {
            let key = req.to_string();
            match inner.oneshot(req).await {
                Ok(response) => Ok(response),
                Err(error) => {
                    if error.is_not_found() || error.is_circuit_open() {
                        debug!(operation = %name, product_id = %key, %error, "Using fallback");
                    } else {
                        warn!(operation = %name, product_id = %key, %error, "Using fallback after upstream failure");
                    }
                    Ok(fallback(&error))
                }
            }
        })
    }
}
