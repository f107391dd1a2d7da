use super::support::{config, ids, server_error, service, service_with, MockUpstream};
use similar_products::resilience::PRODUCT_DETAIL;
use similar_products::{ProductId, ProductRepository};
use similar_products_circuitbreaker::CircuitState;
use std::time::Duration;
use tokio::time::advance;

fn catalogue(upstream: &MockUpstream, count: usize) -> Vec<ProductId> {
    (0..count)
        .map(|n| {
            let id = n.to_string();
            upstream.product(&id, &format!("Product {n}"), "10.00", true);
            ProductId::parse(&id).unwrap()
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn lookups_are_bounded_by_max_concurrency() {
    let upstream = MockUpstream::new();
    let ids = catalogue(&upstream, 50);
    upstream.delay_products(Duration::from_millis(10));
    let service = service(&upstream);

    let details = service.repository().find_product_details(&ids).await;

    assert_eq!(details.len(), 50);
    assert_eq!(upstream.product_calls(), 50);
    assert_eq!(upstream.max_in_flight(), 10);
}

#[tokio::test(start_paused = true)]
async fn configured_bound_is_honoured() {
    let upstream = MockUpstream::new();
    let ids = catalogue(&upstream, 20);
    upstream.delay_products(Duration::from_millis(10));
    let mut config = config();
    config.max_concurrency = 3;
    let service = service_with(&upstream, &config);

    let details = service.repository().find_product_details(&ids).await;

    assert_eq!(details.len(), 20);
    assert_eq!(upstream.max_in_flight(), 3);
    assert_eq!(service.repository().max_concurrency(), 3);
}

#[tokio::test(start_paused = true)]
async fn empty_id_list_makes_no_calls() {
    let upstream = MockUpstream::new();
    let service = service(&upstream);

    let details = service.repository().find_product_details(&[]).await;

    assert!(details.is_empty());
    assert_eq!(upstream.product_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_similar_ids_resolve_to_one_product_each() {
    let upstream = MockUpstream::new();
    upstream
        .similar("1", &["2", "3", "2"])
        .product("2", "Dress Shirt", "19.99", true)
        .product("3", "Blazer", "29.99", false);
    let service = service(&upstream);

    let products = service.resolver().get_similar_products("1").await.unwrap();

    // both occurrences of "2" rank at its first position
    assert_eq!(ids(&products), vec!["2", "2", "3"]);
}

#[tokio::test(start_paused = true)]
async fn product_breaker_opens_then_recovers_after_wait() {
    let upstream = MockUpstream::new();
    upstream.similar("1", &["2"]).product_error("2", server_error());
    let service = service(&upstream);
    let breaker = service.breaker(PRODUCT_DETAIL).unwrap();

    let products = service.resolver().get_similar_products("1").await.unwrap();
    assert!(products.is_empty());
    assert_eq!(upstream.product_calls(), 3);
    assert_eq!(breaker.state(), CircuitState::Open);

    upstream.product("2", "Dress Shirt", "19.99", true);

    let products = service.resolver().get_similar_products("1").await.unwrap();
    assert!(products.is_empty());
    assert_eq!(upstream.product_calls(), 3);

    advance(Duration::from_secs(10)).await;

    let products = service.resolver().get_similar_products("1").await.unwrap();
    assert_eq!(ids(&products), vec!["2"]);
    assert_eq!(upstream.product_calls(), 4);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn cancelled_request_keeps_completed_details_cached() {
    let upstream = MockUpstream::new();
    upstream
        .similar("1", &["2", "3", "4"])
        .product("2", "Dress Shirt", "19.99", true)
        .product("3", "Blazer", "29.99", false)
        .product("4", "Boots", "39.99", true)
        .delay_product("4", Duration::from_secs(1));
    let service = service(&upstream);

    let request = service.resolver().get_similar_products("1");
    assert!(tokio::time::timeout(Duration::from_millis(100), request)
        .await
        .is_err());
    assert_eq!(upstream.product_calls(), 3);

    let repository = service.repository();
    for id in ["2", "3"] {
        let detail = repository
            .find_product_detail(&ProductId::parse(id).unwrap())
            .await;
        assert_eq!(detail.unwrap().id().as_str(), id);
    }
    assert_eq!(upstream.product_calls(), 3);
    assert_eq!(service.cache_stats().product_detail.hits, 2);

    let breaker = service.breaker(PRODUCT_DETAIL).unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().total_calls, 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_half_open_trial_does_not_block_later_lookups() {
    let upstream = MockUpstream::new();
    upstream
        .similar("1", &["2"])
        .product("2", "Dress Shirt", "19.99", true)
        .delay_products(Duration::from_secs(1));
    let service = service(&upstream);
    let breaker = service.breaker(PRODUCT_DETAIL).unwrap();
    breaker.force_open();
    advance(Duration::from_secs(10)).await;

    let request = service.resolver().get_similar_products("1");
    assert!(tokio::time::timeout(Duration::from_millis(100), request)
        .await
        .is_err());
    assert_eq!(upstream.product_calls(), 1);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let products = service.resolver().get_similar_products("1").await.unwrap();
    assert_eq!(ids(&products), vec!["2"]);
    assert_eq!(upstream.product_calls(), 2);
    assert_eq!(breaker.state(), CircuitState::Closed);
}
