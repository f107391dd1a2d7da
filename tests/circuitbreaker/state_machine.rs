use super::default_builder;
use similar_products_circuitbreaker::{CircuitBreakerLayer, CircuitState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::advance;
use tower::{service_fn, Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn two_failures_and_a_success_open_then_recover() {
    let breaker = default_builder("recovery").build().unwrap();

    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Open);

    assert!(!breaker.try_acquire());
    assert_eq!(breaker.metrics().not_permitted_calls, 1);

    advance(Duration::from_secs(10)).await;
    assert!(breaker.try_acquire());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().total_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_rejects_until_wait_elapses() {
    let breaker = default_builder("wait").build().unwrap();
    breaker.force_open();

    advance(Duration::from_secs(9)).await;
    assert!(!breaker.try_acquire());
    assert_eq!(breaker.state(), CircuitState::Open);

    advance(Duration::from_secs(1)).await;
    assert!(breaker.try_acquire());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn half_open_failure_reopens_and_restarts_wait() {
    let breaker = default_builder("reopen").build().unwrap();
    breaker.force_open();

    advance(Duration::from_secs(10)).await;
    assert!(breaker.try_acquire());
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    advance(Duration::from_secs(5)).await;
    assert!(!breaker.try_acquire());

    advance(Duration::from_secs(5)).await;
    assert!(breaker.try_acquire());
}

#[tokio::test(start_paused = true)]
async fn half_open_admits_only_the_permitted_trials() {
    let breaker = default_builder("trials")
        .permitted_calls_in_half_open(2)
        .build()
        .unwrap();
    breaker.force_open();
    advance(Duration::from_secs(10)).await;

    assert!(breaker.try_acquire());
    assert!(breaker.try_acquire());
    assert!(!breaker.try_acquire());

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn outcomes_recorded_while_open_are_ignored() {
    let breaker = default_builder("late").build().unwrap();
    breaker.force_open();

    breaker.record_success();
    breaker.record_failure();

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Open);
    assert_eq!(metrics.total_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn transitions_are_reported_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let breaker = default_builder("listener")
        .on_state_transition(move |transition| {
            sink.lock()
                .unwrap()
                .push((transition.from, transition.to));
        })
        .build()
        .unwrap();

    for _ in 0..3 {
        breaker.record_failure();
    }
    advance(Duration::from_secs(10)).await;
    assert!(breaker.try_acquire());
    breaker.record_success();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test]
async fn reset_clears_window_and_counters() {
    let breaker = default_builder("reset").build().unwrap();
    breaker.record_failure();
    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.try_acquire());

    breaker.reset();

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.total_calls, 0);
    assert_eq!(metrics.not_permitted_calls, 0);
    assert!(breaker.try_acquire());
}

#[tokio::test]
async fn health_follows_state() {
    let breaker = default_builder("health").build().unwrap();
    assert_eq!(breaker.health_status(), "healthy");

    breaker.force_open();
    assert_eq!(breaker.health_status(), "unhealthy");

    breaker.force_closed();
    assert_eq!(breaker.health_status(), "healthy");
}

#[tokio::test(start_paused = true)]
async fn cancelled_trial_call_frees_half_open_slot() {
    let breaker = default_builder("cancelled-trial").build().unwrap();
    breaker.force_open();
    advance(Duration::from_secs(10)).await;

    let slow = CircuitBreakerLayer::new(breaker.clone()).layer(service_fn(|_: ()| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, std::io::Error>(())
    }));
    let cancelled = tokio::time::timeout(Duration::from_millis(10), slow.oneshot(())).await;
    assert!(cancelled.is_err());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let fast = CircuitBreakerLayer::new(breaker.clone())
        .layer(service_fn(|_: ()| async { Ok::<_, std::io::Error>(()) }));
    for _ in 0..100 {
        assert!(fast.clone().oneshot(()).await.is_ok());
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().not_permitted_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn permit_dropped_after_reopen_does_not_free_a_new_trial() {
    let breaker = default_builder("stale-permit")
        .permitted_calls_in_half_open(2)
        .build()
        .unwrap();
    breaker.force_open();
    advance(Duration::from_secs(10)).await;

    let stale = breaker.acquire().unwrap();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    advance(Duration::from_secs(10)).await;
    let first = breaker.acquire().unwrap();
    let second = breaker.acquire().unwrap();
    drop(stale);
    assert!(breaker.acquire().is_none());

    first.record(false);
    second.record(false);
    assert_eq!(breaker.state(), CircuitState::Closed);
}
