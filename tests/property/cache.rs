//! Property tests for the TTL cache.
//!
//! Invariants tested:
//! - Size never exceeds the configured bound
//! - The most recently written key is always readable
//! - Hits plus misses equals the number of reads

use proptest::prelude::*;
use similar_products_cache::CacheConfig;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u32),
    Get(u8),
    Invalidate(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<u8>(), any::<u32>()).prop_map(|(key, value)| Op::Put(key % 32, value)),
        3 => any::<u8>().prop_map(|key| Op::Get(key % 32)),
        1 => any::<u8>().prop_map(|key| Op::Invalidate(key % 32)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the cache never holds more entries than its bound
    #[test]
    fn size_is_bounded(max_size in 1usize..=16, ops in prop::collection::vec(op(), 1..200)) {
        let cache = CacheConfig::builder()
            .max_size(max_size)
            .ttl(Duration::from_secs(600))
            .build::<u8, u32>()
            .unwrap();

        let mut reads = 0u64;
        for op in ops {
            match op {
                Op::Put(key, value) => {
                    cache.put(key, value);
                    prop_assert_eq!(cache.get(&key), Some(value));
                    reads += 1;
                }
                Op::Get(key) => {
                    cache.get(&key);
                    reads += 1;
                }
                Op::Invalidate(key) => {
                    cache.invalidate(&key);
                }
            }
            prop_assert!(cache.len() <= max_size);
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, reads);
        prop_assert_eq!(stats.size, cache.len());
    }

    /// Property: with room for every key, nothing is evicted
    #[test]
    fn no_eviction_below_capacity(keys in prop::collection::vec(any::<u16>(), 1..100)) {
        let distinct: HashSet<u16> = keys.iter().copied().collect();
        let cache = CacheConfig::builder()
            .max_size(distinct.len())
            .ttl(Duration::from_secs(600))
            .build::<u16, u16>()
            .unwrap();

        for key in &keys {
            cache.put(*key, *key);
        }

        prop_assert_eq!(cache.len(), distinct.len());
        prop_assert_eq!(cache.stats().evictions, 0);
        for key in distinct {
            prop_assert_eq!(cache.get(&key), Some(key));
        }
    }
}
