//! Application configuration.
//!
//! Every setting has a default matching the production deployment, so an
//! empty document is a valid configuration. Durations are written in
//! milliseconds.
//!
//! ```json
//! {
//!   "upstream": { "base_url": "http://localhost:3001", "timeout_ms": 3000 },
//!   "detail_cache": { "max_size": 1000, "ttl_ms": 600000 },
//!   "similar_ids_cache": { "max_size": 500, "ttl_ms": 300000 },
//!   "circuit_breaker": { "sliding_window_size": 5, "wait_duration_in_open_ms": 10000 },
//!   "retry": { "max_attempts": 3 },
//!   "max_concurrency": 10
//! }
//! ```

use crate::error::{ConfigError, FetchError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use similar_products_cache::{CacheConfig, CacheConfigBuilder};
use similar_products_circuitbreaker::{CircuitBreaker, CircuitBreakerConfigBuilder};
use similar_products_retry::{RetryConfig, RetryConfigError};
use std::time::Duration;

const MIN_OPEN_WAIT: Duration = Duration::from_secs(1);
const MAX_OPEN_WAIT: Duration = Duration::from_secs(60);

/// Top-level configuration of the similar-products service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimilarProductsConfig {
    pub upstream: UpstreamConfig,
    pub detail_cache: CacheSettings,
    pub similar_ids_cache: CacheSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
    /// Upper bound on product lookups in flight for one request.
    pub max_concurrency: usize,
}

impl Default for SimilarProductsConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            detail_cache: CacheSettings {
                max_size: 1000,
                ttl: Duration::from_secs(600),
            },
            similar_ids_cache: CacheSettings {
                max_size: 500,
                ttl: Duration::from_secs(300),
            },
            circuit_breaker: CircuitBreakerSettings::default(),
            retry: RetrySettings::default(),
            max_concurrency: 10,
        }
    }
}

impl SimilarProductsConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream.base_url()?;
        if self.upstream.timeout.is_zero() {
            return Err(out_of_range(
                "upstream.timeout_ms",
                "greater than zero",
                self.upstream.timeout.as_millis(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(out_of_range(
                "max_concurrency",
                "at least 1",
                self.max_concurrency,
            ));
        }

        let wait = self.circuit_breaker.wait_duration_in_open;
        if !(MIN_OPEN_WAIT..=MAX_OPEN_WAIT).contains(&wait) {
            return Err(out_of_range(
                "circuit_breaker.wait_duration_in_open_ms",
                "between 1000 and 60000",
                wait.as_millis(),
            ));
        }
        self.circuit_breaker.builder("validation").into_config()?;

        self.detail_cache.builder("product-detail").into_config()?;
        self.similar_ids_cache.builder("similar-ids").into_config()?;
        self.retry.build("validation")?;
        Ok(())
    }
}

fn out_of_range(field: &'static str, expected: &'static str, actual: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        expected,
        actual: actual.to_string(),
    }
}

/// Where the product service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

impl UpstreamConfig {
    /// Parses the base url, which must be an absolute http(s) url.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot carry path segments".to_string()));
        }
        Ok(url)
    }
}

/// Size bound and expiry of one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub max_size: usize,
    #[serde(rename = "ttl_ms", with = "duration_ms")]
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheSettings {
    pub fn builder(&self, name: &str) -> CacheConfigBuilder {
        CacheConfig::builder()
            .name(name)
            .max_size(self.max_size)
            .ttl(self.ttl)
    }
}

/// Settings shared by the per-operation circuit breakers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitBreakerSettings {
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    pub failure_rate_threshold: f64,
    #[serde(rename = "wait_duration_in_open_ms", with = "duration_ms")]
    pub wait_duration_in_open: Duration,
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            sliding_window_size: 5,
            minimum_number_of_calls: 3,
            failure_rate_threshold: 0.5,
            wait_duration_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn builder(&self, name: &str) -> CircuitBreakerConfigBuilder {
        CircuitBreaker::builder()
            .name(name)
            .sliding_window_size(self.sliding_window_size)
            .minimum_number_of_calls(self.minimum_number_of_calls)
            .failure_rate_threshold(self.failure_rate_threshold)
            .wait_duration_in_open(self.wait_duration_in_open)
            .permitted_calls_in_half_open(self.permitted_calls_in_half_open)
    }
}

/// Attempt bound and backoff for upstream calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts, including the first call.
    pub max_attempts: usize,
    #[serde(rename = "initial_backoff_ms", with = "duration_ms")]
    pub initial_backoff: Duration,
    #[serde(rename = "max_backoff_ms", with = "duration_ms")]
    pub max_backoff: Duration,
    /// Spread applied to each delay, `0.0` for none.
    pub randomization_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            randomization_factor: 0.0,
        }
    }
}

impl RetrySettings {
    /// Builds a retry policy that only retries retryable fetch errors.
    pub fn build(&self, name: &str) -> Result<RetryConfig<FetchError>, RetryConfigError> {
        let builder = RetryConfig::builder()
            .name(name)
            .max_attempts(self.max_attempts)
            .retry_on(FetchError::is_retryable);
        let builder = if self.randomization_factor > 0.0 {
            builder.exponential_random_backoff(
                self.initial_backoff,
                self.max_backoff,
                self.randomization_factor,
            )
        } else {
            builder.exponential_backoff(self.initial_backoff, self.max_backoff)
        };
        builder.build()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
