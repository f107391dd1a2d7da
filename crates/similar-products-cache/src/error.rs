//! Error types for cache construction.

use thiserror::Error;

/// Errors raised while building a cache from its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheConfigError {
    /// The cache was configured to hold no entries.
    #[error("cache '{name}' must hold at least one entry")]
    ZeroCapacity { name: String },

    /// The cache was configured with a zero time-to-live.
    #[error("cache '{name}' must have a non-zero time-to-live")]
    ZeroTtl { name: String },
}
