//! The similar-products use case.

use crate::model::{InvalidProductId, ProductDetail, ProductId};
use crate::repository::ProductRepository;
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves a product id into the details of its similar products.
#[derive(Debug, Clone)]
pub struct SimilarProductsResolver<R> {
    repository: R,
}

impl<R: ProductRepository> SimilarProductsResolver<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Inbound entry point. Fails only when `product_id` is blank; upstream
    /// problems show up as fewer (or zero) products.
    pub async fn get_similar_products(
        &self,
        product_id: &str,
    ) -> Result<Vec<ProductDetail>, InvalidProductId> {
        let id = ProductId::parse(product_id)?;
        Ok(self.execute(&id).await)
    }

    /// Looks up the similar ids first, then their details.
    ///
    /// Details come back in the upstream ranking order of the similar ids.
    pub async fn execute(&self, id: &ProductId) -> Vec<ProductDetail> {
        let similar_ids = self.repository.find_similar_ids(id).await;
        if similar_ids.is_empty() {
            info!(product_id = %id, "No similar products");
            return Vec::new();
        }

        let mut details = self.repository.find_product_details(&similar_ids).await;

        let rank: HashMap<&ProductId, usize> = similar_ids
            .iter()
            .enumerate()
            .rev()
            .map(|(position, similar)| (similar, position))
            .collect();
        details.sort_by_key(|detail| rank.get(detail.id()).copied().unwrap_or(usize::MAX));

        debug!(
            product_id = %id,
            requested = similar_ids.len(),
            resolved = details.len(),
            "Resolved similar products"
        );
        details
    }
}
