use similar_products_cache::{CacheConfig, TtlCache};
use std::time::Duration;
use tokio::time::advance;

fn cache(ttl: Duration) -> TtlCache<String, u32> {
    CacheConfig::builder()
        .name("expiry")
        .max_size(16)
        .ttl(ttl)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn entry_is_visible_until_ttl_elapses() {
    let cache = cache(Duration::from_secs(300));
    cache.put("1".to_string(), 1);

    advance(Duration::from_secs(299)).await;
    assert_eq!(cache.get(&"1".to_string()), Some(1));

    advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get(&"1".to_string()), None);
}

#[tokio::test(start_paused = true)]
async fn reads_do_not_extend_lifetime() {
    let cache = cache(Duration::from_secs(300));
    cache.put("1".to_string(), 1);

    advance(Duration::from_secs(200)).await;
    assert_eq!(cache.get(&"1".to_string()), Some(1));

    advance(Duration::from_secs(100)).await;
    assert_eq!(cache.get(&"1".to_string()), None);
}

#[tokio::test(start_paused = true)]
async fn rewrite_restarts_lifetime() {
    let cache = cache(Duration::from_secs(300));
    cache.put("1".to_string(), 1);

    advance(Duration::from_secs(200)).await;
    cache.put("1".to_string(), 2);

    advance(Duration::from_secs(200)).await;
    assert_eq!(cache.get(&"1".to_string()), Some(2));
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_a_miss_and_leaves_the_cache() {
    let cache = cache(Duration::from_secs(60));
    cache.put("1".to_string(), 1);
    cache.put("2".to_string(), 2);

    advance(Duration::from_secs(60)).await;
    assert_eq!(cache.get(&"1".to_string()), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    // "2" is expired too but has not been read yet
    assert_eq!(stats.size, 1);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_independently() {
    let cache = cache(Duration::from_secs(10));
    cache.put("early".to_string(), 1);
    advance(Duration::from_secs(5)).await;
    cache.put("late".to_string(), 2);

    advance(Duration::from_secs(5)).await;
    assert_eq!(cache.get(&"early".to_string()), None);
    assert_eq!(cache.get(&"late".to_string()), Some(2));
}
