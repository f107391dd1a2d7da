//! Resilience composition for upstream operations.
//!
//! Each logical operation is wrapped, outermost first, in
//!
//! ```text
//! fallback -> retry -> circuit breaker -> upstream call (with timeout)
//! ```
//!
//! so that an open circuit fails fast inside the retry loop without being
//! retried, and every terminal failure is replaced by the operation's
//! degraded value. Cache reads and writes happen around this stack in the
//! repository.

mod fallback;

pub use fallback::{Fallback, FallbackLayer};

use crate::error::FetchError;
use crate::model::{ProductId, ProductResponse};
use crate::upstream::UpstreamService;
use similar_products_circuitbreaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerLayer, FnClassifier,
};
use similar_products_retry::RetryConfig;
use std::convert::Infallible;
use tower::util::BoxCloneSyncService;
use tower::{ServiceBuilder, ServiceExt};

/// Name of the similar-ids operation and of its circuit breaker.
pub const SIMILAR_IDS: &str = "similar-ids";

/// Name of the product-detail operation and of its circuit breaker.
pub const PRODUCT_DETAIL: &str = "product-detail";

/// An upstream operation with every resilience layer applied. It never fails.
pub type ResilientService<Res> = BoxCloneSyncService<ProductId, Res, Infallible>;

/// Similar-ids lookup that degrades to an empty list.
pub fn similar_ids_operation(
    upstream: UpstreamService<Vec<ProductId>>,
    breaker: CircuitBreaker,
    retry: RetryConfig<FetchError>,
) -> ResilientService<Vec<ProductId>> {
    guard(upstream, breaker, retry, |_: &FetchError| Vec::new())
}

/// Product lookup that degrades to an absent product.
///
/// A 404 is not retried and yields `None` like any other failure.
pub fn product_detail_operation(
    upstream: UpstreamService<ProductResponse>,
    breaker: CircuitBreaker,
    retry: RetryConfig<FetchError>,
) -> ResilientService<Option<ProductResponse>> {
    let upstream = BoxCloneSyncService::new(upstream.map_response(Some));
    guard(upstream, breaker, retry, |_: &FetchError| None)
}

fn guard<Res, F>(
    upstream: UpstreamService<Res>,
    breaker: CircuitBreaker,
    retry: RetryConfig<FetchError>,
    fallback: F,
) -> ResilientService<Res>
where
    Res: Send + 'static,
    F: Fn(&FetchError) -> Res + Send + Sync + 'static,
{
    let classifier = FnClassifier::new(|result: &Result<Res, FetchError>| match result {
        Ok(_) => false,
        Err(error) => error.counts_as_failure(),
    });
    let name = breaker.name().to_string();

    let service = ServiceBuilder::new()
        .layer(FallbackLayer::new(&name, fallback))
        .layer(retry.layer())
        .map_err(|error: CircuitBreakerError<FetchError>| FetchError::from(error))
        .layer(CircuitBreakerLayer::new(breaker).with_classifier(classifier))
        .service(upstream);

    BoxCloneSyncService::new(service)
}
