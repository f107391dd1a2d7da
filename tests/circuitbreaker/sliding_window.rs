use super::default_builder;
use similar_products_circuitbreaker::CircuitState;

#[tokio::test]
async fn failures_below_minimum_calls_keep_circuit_closed() {
    let breaker = default_builder("minimum").build().unwrap();
    breaker.record_failure();
    breaker.record_failure();

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.failure_rate, 1.0);
}

#[tokio::test]
async fn rate_equal_to_threshold_opens() {
    let breaker = default_builder("exact")
        .sliding_window_size(4)
        .minimum_number_of_calls(4)
        .build()
        .unwrap();

    breaker.record_failure();
    breaker.record_success();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn rate_just_below_threshold_stays_closed() {
    let breaker = default_builder("below")
        .sliding_window_size(5)
        .minimum_number_of_calls(5)
        .build()
        .unwrap();

    breaker.record_failure();
    breaker.record_failure();
    for _ in 0..3 {
        breaker.record_success();
    }

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.failure_count, 2);
    assert_eq!(metrics.success_count, 3);
}

#[tokio::test]
async fn oldest_outcomes_slide_out_of_the_window() {
    let breaker = default_builder("sliding").build().unwrap();

    breaker.record_failure();
    for _ in 0..4 {
        breaker.record_success();
    }
    // [S, S, S, S, F]
    breaker.record_failure();
    assert_eq!(breaker.metrics().failure_count, 1);

    // [S, S, S, F, F]
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    // [S, S, F, F, F]
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn window_never_holds_more_than_its_size() {
    let breaker = default_builder("bounded").build().unwrap();
    for _ in 0..100 {
        breaker.record_success();
    }

    let metrics = breaker.metrics();
    assert_eq!(metrics.total_calls, 5);
    assert_eq!(metrics.success_count, 5);
}
