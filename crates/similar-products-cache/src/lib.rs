//! Bounded in-memory cache with LRU eviction and expiry after write.
//!
//! [`TtlCache`] is a cheap-to-clone handle over shared, lock-protected
//! storage. It is meant to sit in front of a slow or unreliable lookup in a
//! read-through fashion: the caller reads, and on a miss computes the value
//! and writes it back.
//!
//! - **Size bound**: writing a new key into a full cache first drops expired
//!   entries, then evicts the least recently used entry if still full
//! - **Expiry after write**: an entry is visible while
//!   `now - written_at < ttl`; expired entries read as absent
//! - **Statistics**: hits, misses and evictions are counted per instance
//!
//! Time is read from [`tokio::time::Instant`], so tests can pause and advance
//! the clock.
//!
//! # Examples
//!
//! ```
//! use similar_products_cache::CacheConfig;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), similar_products_cache::CacheConfigError> {
//! let cache = CacheConfig::builder()
//!     .name("product-detail")
//!     .max_size(1000)
//!     .ttl(Duration::from_secs(600))
//!     .build::<String, u32>()?;
//!
//! cache.put("1".to_string(), 42);
//! assert_eq!(cache.get(&"1".to_string()), Some(42));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::CacheConfigError;

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use store::{CacheStore, Insertion};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Point-in-time counters of a cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    /// Fraction of reads that were hits, or `0.0` before the first read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// A size-bounded cache whose entries expire a fixed time after being written.
///
/// Clones share the same storage. Reads and writes take a short-lived lock
/// that is never held across an `.await`.
pub struct TtlCache<K: Hash + Eq, V> {
    config: Arc<CacheConfig>,
    store: Arc<Mutex<CacheStore<K, V>>>,
    counters: Arc<Counters>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Creates an empty cache from a validated configuration.
    pub fn new(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "cache_requests_total",
                "Total number of cache requests (hits and misses)"
            );
            describe_counter!("cache_evictions_total", "Total number of cache evictions");
            describe_gauge!("cache_size", "Current number of entries in the cache");
        }

        let store = CacheStore::new(config.max_size, config.ttl);
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns the live value for `key`, if any.
    ///
    /// A hit marks the entry as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lock().get(key);

        match &found {
            Some(_) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);

                #[cfg(feature = "metrics")]
                counter!("cache_requests_total", "cache" => self.config.name.clone(), "result" => "hit")
                    .increment(1);

                #[cfg(feature = "tracing")]
                debug!(cache = %self.config.name, "Cache hit");
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);

                #[cfg(feature = "metrics")]
                counter!("cache_requests_total", "cache" => self.config.name.clone(), "result" => "miss")
                    .increment(1);

                #[cfg(feature = "tracing")]
                debug!(cache = %self.config.name, "Cache miss");
            }
        }

        found
    }

    /// Writes `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: K, value: V) {
        let (insertion, _size) = {
            let mut store = self.lock();
            let insertion = store.insert(key, value);
            (insertion, store.len())
        };

        #[cfg(feature = "metrics")]
        gauge!("cache_size", "cache" => self.config.name.clone()).set(_size as f64);

        if insertion == Insertion::Evicted {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);

            #[cfg(feature = "metrics")]
            counter!("cache_evictions_total", "cache" => self.config.name.clone()).increment(1);

            #[cfg(feature = "tracing")]
            info!(cache = %self.config.name, "Cache eviction occurred");
        }
    }

    /// Removes the entry for `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key)
    }

    /// Removes every entry.
    pub fn invalidate_all(&self) {
        self.lock().clear();

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, "Cache cleared");
    }

    /// Number of stored entries. Expired entries count until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<K, V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Hash + Eq, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.config.name)
            .field("max_size", &self.config.max_size)
            .field("ttl", &self.config.ttl)
            .finish()
    }
}
