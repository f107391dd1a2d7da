//! Read-through product repository.

use crate::model::{ProductDetail, ProductId, ProductResponse};
use crate::resilience::ResilientService;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use similar_products_cache::TtlCache;
use std::future::Future;
use tower::ServiceExt;
use tracing::{debug, warn};

/// Default bound on product lookups in flight during a fan-out.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Access to similar-product ids and product details.
///
/// Implementations resolve every degraded case to an empty list or an absent
/// product; none of these operations fail.
pub trait ProductRepository: Send + Sync {
    /// Ids similar to `id`, in upstream ranking order.
    fn find_similar_ids(&self, id: &ProductId) -> impl Future<Output = Vec<ProductId>> + Send;

    /// The validated detail of `id`, if upstream has a valid one.
    fn find_product_detail(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Option<ProductDetail>> + Send;

    /// The details that could be resolved for `ids`, in no particular order.
    fn find_product_details(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Vec<ProductDetail>> + Send;
}

/// [`ProductRepository`] backed by two TTL caches in front of resilient
/// upstream operations.
///
/// Similar-id lists are always cached, including the empty list produced by
/// a fallback. Product details are cached only when valid; absent products
/// are looked up again on the next request.
#[derive(Clone)]
pub struct CachedProductRepository {
    similar_ids: ResilientService<Vec<ProductId>>,
    product: ResilientService<Option<ProductResponse>>,
    similar_ids_cache: TtlCache<ProductId, Vec<ProductId>>,
    detail_cache: TtlCache<ProductId, ProductDetail>,
    max_concurrency: usize,
}

impl CachedProductRepository {
    pub fn new(
        similar_ids: ResilientService<Vec<ProductId>>,
        product: ResilientService<Option<ProductResponse>>,
        similar_ids_cache: TtlCache<ProductId, Vec<ProductId>>,
        detail_cache: TtlCache<ProductId, ProductDetail>,
    ) -> Self {
        Self {
            similar_ids,
            product,
            similar_ids_cache,
            detail_cache,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets how many product lookups may be in flight at once. Values below
    /// one are raised to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn similar_ids_cache(&self) -> &TtlCache<ProductId, Vec<ProductId>> {
        &self.similar_ids_cache
    }

    pub fn detail_cache(&self) -> &TtlCache<ProductId, ProductDetail> {
        &self.detail_cache
    }

    fn owned_lookup(&self, id: ProductId) -> BoxFuture<'static, Option<ProductDetail>> {
        let repository = self.clone();
        Box::pin(async move { repository.find_product_detail(&id).await })
    }
}

impl ProductRepository for CachedProductRepository {
    async fn find_similar_ids(&self, id: &ProductId) -> Vec<ProductId> {
        if let Some(ids) = self.similar_ids_cache.get(id) {
            debug!(product_id = %id, "Similar ids served from cache");
            return ids;
        }

        let ids = self
            .similar_ids
            .clone()
            .oneshot(id.clone())
            .await
            .unwrap_or_else(|never| match never {});

        debug!(product_id = %id, count = ids.len(), "Caching similar ids");
        self.similar_ids_cache.put(id.clone(), ids.clone());
        ids
    }

    async fn find_product_detail(&self, id: &ProductId) -> Option<ProductDetail> {
        if let Some(detail) = self.detail_cache.get(id) {
            debug!(product_id = %id, "Product detail served from cache");
            return Some(detail);
        }

        let response = self
            .product
            .clone()
            .oneshot(id.clone())
            .await
            .unwrap_or_else(|never| match never {})?;

        match response.into_detail() {
            Ok(detail) => {
                self.detail_cache.put(id.clone(), detail.clone());
                Some(detail)
            }
            Err(invalid) => {
                warn!(product_id = %id, %invalid, "Discarding invalid product");
                None
            }
        }
    }

    async fn find_product_details(&self, ids: &[ProductId]) -> Vec<ProductDetail> {
        stream::iter(ids.to_vec())
            .map(|id| self.owned_lookup(id))
            .buffer_unordered(self.max_concurrency)
            .filter_map(|detail| async move { detail })
            .collect()
            .await
    }
}

impl std::fmt::Debug for CachedProductRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProductRepository")
            .field("similar_ids_cache", &self.similar_ids_cache)
            .field("detail_cache", &self.detail_cache)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}
