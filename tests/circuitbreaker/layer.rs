use super::default_builder;
use similar_products_circuitbreaker::{
    CircuitBreakerError, CircuitBreakerLayer, CircuitState, FnClassifier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::BoxCloneSyncService;
use tower::{Layer, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
enum LookupError {
    Missing,
    Unavailable,
}

fn counting_service(
    outcome: Result<&'static str, LookupError>,
) -> (Arc<AtomicUsize>, BoxCloneSyncService<u32, &'static str, LookupError>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let service = tower::service_fn(move |_id: u32| {
        counter.fetch_add(1, Ordering::SeqCst);
        let outcome = outcome.clone();
        async move { outcome }
    });
    (calls, BoxCloneSyncService::new(service))
}

#[tokio::test]
async fn open_circuit_short_circuits_the_inner_service() {
    let breaker = default_builder("layer-open").build().unwrap();
    let (calls, service) = counting_service(Ok("ok"));
    let guarded = breaker.layer().layer(service);

    breaker.force_open();
    let result = guarded.oneshot(1).await;

    match result {
        Err(CircuitBreakerError::OpenCircuit { name }) => assert_eq!(name, "layer-open"),
        other => panic!("expected open circuit, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(breaker.metrics().not_permitted_calls, 1);
}

#[tokio::test]
async fn inner_errors_are_wrapped_and_counted() {
    let breaker = default_builder("layer-errors").build().unwrap();
    let (calls, service) = counting_service(Err(LookupError::Unavailable));
    let guarded = breaker.layer().layer(service);

    for _ in 0..3 {
        let error = guarded.clone().oneshot(1).await.unwrap_err();
        assert_eq!(error.into_inner(), Some(LookupError::Unavailable));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let error = guarded.clone().oneshot(1).await.unwrap_err();
    assert!(error.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn classified_non_failures_keep_the_circuit_closed() {
    let breaker = default_builder("layer-classifier").build().unwrap();
    let (calls, service) = counting_service(Err(LookupError::Missing));
    let classifier = FnClassifier::new(|result: &Result<&'static str, LookupError>| {
        matches!(result, Err(LookupError::Unavailable))
    });
    let guarded = CircuitBreakerLayer::new(breaker.clone())
        .with_classifier(classifier)
        .layer(service);

    for _ in 0..10 {
        let error = guarded.clone().oneshot(1).await.unwrap_err();
        assert_eq!(error.into_inner(), Some(LookupError::Missing));
    }

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.failure_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}
