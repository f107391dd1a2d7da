//! Cache storage: LRU ordering plus expiry after write.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// Entry in the cache with write-time tracking.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// An entry is visible while `now - inserted_at < ttl`.
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Outcome of an insert, as seen by the eviction bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// The key was new and there was room for it.
    Added,
    /// The key already existed and its entry was replaced.
    Replaced,
    /// The key was new and the least recently used entry made room for it.
    Evicted,
}

/// Size-bounded store with LRU eviction and a single TTL for all entries.
pub(crate) struct CacheStore<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> CacheStore<K, V> {
    pub(crate) fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// Gets a live value and marks it as most recently used.
    ///
    /// Expired entries are dropped on the way and read as absent.
    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        let expired = self.entries.peek(key)?.is_expired(self.ttl, Instant::now());
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`.
    ///
    /// A new key arriving in a full cache first clears out expired entries;
    /// only when none are left does the least recently used live entry go.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Insertion {
        let replacing = self.entries.contains(&key);
        if !replacing && self.entries.len() == self.entries.cap().get() {
            self.purge_expired(Instant::now());
        }
        match self.entries.push(key, CacheEntry::new(value)) {
            Some(_) if replacing => Insertion::Replaced,
            Some(_) => Insertion::Evicted,
            None => Insertion::Added,
        }
    }

    /// Drops every expired entry, keeping the recency order of the rest.
    fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        if !self.entries.iter().any(|(_, entry)| entry.is_expired(ttl, now)) {
            return;
        }

        let capacity = self.entries.cap();
        // into_iter yields least recently used first
        let entries = std::mem::replace(&mut self.entries, LruCache::new(capacity));
        for (key, entry) in entries {
            if !entry.is_expired(ttl, now) {
                self.entries.push(key, entry);
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        self.entries.pop(key).is_some()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
