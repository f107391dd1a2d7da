//! Configuration for caches.

use crate::{CacheConfigError, TtlCache};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Validated configuration of a single cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub(crate) name: String,
    pub(crate) max_size: NonZeroUsize,
    pub(crate) ttl: Duration,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of entries held at once.
    pub fn max_size(&self) -> usize {
        self.max_size.get()
    }

    /// Time an entry stays visible after it was written.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Builder for configuring and constructing a [`TtlCache`].
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    name: String,
    max_size: usize,
    ttl: Duration,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            max_size: 100,
            ttl: Duration::from_secs(300),
        }
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of entries in the cache.
    ///
    /// When a new key is written into a full cache the least recently used
    /// entry is evicted.
    ///
    /// Default: 100
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the time-to-live of entries, measured from their last write.
    ///
    /// Default: 5 minutes
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validates the settings without building a cache.
    pub fn into_config(self) -> Result<CacheConfig, CacheConfigError> {
        let max_size = NonZeroUsize::new(self.max_size).ok_or_else(|| {
            CacheConfigError::ZeroCapacity {
                name: self.name.clone(),
            }
        })?;
        if self.ttl.is_zero() {
            return Err(CacheConfigError::ZeroTtl { name: self.name });
        }
        Ok(CacheConfig {
            name: self.name,
            max_size,
            ttl: self.ttl,
        })
    }

    /// Builds the cache.
    pub fn build<K, V>(self) -> Result<TtlCache<K, V>, CacheConfigError>
    where
        K: Hash + Eq,
        V: Clone,
    {
        self.into_config().map(TtlCache::new)
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
