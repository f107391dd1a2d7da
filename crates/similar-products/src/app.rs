//! Startup wiring.

use crate::config::SimilarProductsConfig;
use crate::error::ConfigError;
use crate::model::{ProductDetail, ProductId, ProductResponse};
use crate::repository::CachedProductRepository;
use crate::resilience::{self, PRODUCT_DETAIL, SIMILAR_IDS};
use crate::resolver::SimilarProductsResolver;
use crate::upstream::{UpstreamClient, UpstreamService};
use similar_products_cache::{CacheStats, TtlCache};
use similar_products_circuitbreaker::{CircuitBreaker, CircuitBreakerRegistry};
use tracing::info;

/// Cache counters of both caches, for operational reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheReport {
    pub similar_ids: CacheStats,
    pub product_detail: CacheStats,
}

/// The fully wired service: caches, breakers, retry policies, repository and
/// resolver, built once from a validated configuration.
#[derive(Debug, Clone)]
pub struct SimilarProducts {
    resolver: SimilarProductsResolver<CachedProductRepository>,
    breakers: CircuitBreakerRegistry,
}

impl SimilarProducts {
    /// Wires everything against the HTTP product service.
    pub fn from_config(config: &SimilarProductsConfig) -> Result<Self, ConfigError> {
        let client = UpstreamClient::new(&config.upstream)?;
        Self::with_upstream(
            config,
            client.similar_ids_service(),
            client.product_service(),
        )
    }

    /// Wires everything against the given upstream operations.
    pub fn with_upstream(
        config: &SimilarProductsConfig,
        similar_ids: UpstreamService<Vec<ProductId>>,
        product: UpstreamService<ProductResponse>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let breakers = CircuitBreakerRegistry::new();
        let similar_ids_breaker = config.circuit_breaker.builder(SIMILAR_IDS).build()?;
        let product_breaker = config.circuit_breaker.builder(PRODUCT_DETAIL).build()?;
        breakers.register(similar_ids_breaker.clone())?;
        breakers.register(product_breaker.clone())?;

        let similar_ids = resilience::similar_ids_operation(
            similar_ids,
            similar_ids_breaker,
            config.retry.build(SIMILAR_IDS)?,
        );
        let product = resilience::product_detail_operation(
            product,
            product_breaker,
            config.retry.build(PRODUCT_DETAIL)?,
        );

        let similar_ids_cache: TtlCache<ProductId, Vec<ProductId>> =
            config.similar_ids_cache.builder(SIMILAR_IDS).build()?;
        let detail_cache: TtlCache<ProductId, ProductDetail> =
            config.detail_cache.builder(PRODUCT_DETAIL).build()?;

        let repository =
            CachedProductRepository::new(similar_ids, product, similar_ids_cache, detail_cache)
                .with_max_concurrency(config.max_concurrency);

        info!(
            upstream = %config.upstream.base_url,
            max_concurrency = config.max_concurrency,
            "Similar products service ready"
        );

        Ok(Self {
            resolver: SimilarProductsResolver::new(repository),
            breakers,
        })
    }

    pub fn resolver(&self) -> &SimilarProductsResolver<CachedProductRepository> {
        &self.resolver
    }

    pub fn repository(&self) -> &CachedProductRepository {
        self.resolver.repository()
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// The breaker guarding `name` ([`SIMILAR_IDS`] or [`PRODUCT_DETAIL`]).
    pub fn breaker(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers.get(name)
    }

    pub fn cache_stats(&self) -> CacheReport {
        let repository = self.repository();
        CacheReport {
            similar_ids: repository.similar_ids_cache().stats(),
            product_detail: repository.detail_cache().stats(),
        }
    }
}
