use super::helpers::*;
use serial_test::serial;
use similar_products_cache::CacheConfig;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn cache_metrics_exist() {
    init_recorder();

    let cache = CacheConfig::builder()
        .name("metrics-cache")
        .max_size(1)
        .ttl(Duration::from_secs(60))
        .build::<u32, u32>()
        .unwrap();

    cache.get(&1);
    cache.put(1, 1);
    cache.get(&1);
    cache.put(2, 2);

    assert_counter_exists("cache_requests_total");
    assert_metric_has_label("cache_requests_total", "cache", "metrics-cache");
    assert_metric_has_label("cache_requests_total", "result", "hit");
    assert_metric_has_label("cache_requests_total", "result", "miss");

    assert_counter_exists("cache_evictions_total");
    assert_metric_has_label("cache_evictions_total", "cache", "metrics-cache");

    assert_gauge_exists("cache_size");
    assert_metric_has_label("cache_size", "cache", "metrics-cache");
}
