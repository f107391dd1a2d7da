//! Resilient read-through enrichment of similar products.
//!
//! Given a product id, [`SimilarProductsResolver`] asks the upstream product
//! service for the ids of similar products and then fetches the detail of
//! each one, keeping at most ten lookups in flight. Every upstream call goes
//! through a circuit breaker, bounded retry and a fallback, and results are
//! cached with expiry after write:
//!
//! | cache | entries | ttl |
//! |---|---|---|
//! | similar ids | 500 | 5 min |
//! | product detail | 1000 | 10 min |
//!
//! A slow or failing upstream never turns into an error for the caller; it
//! yields fewer products, or none.
//!
//! # Example
//!
//! ```no_run
//! use similar_products::{SimilarProducts, SimilarProductsConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = SimilarProductsConfig::default();
//! config.upstream.base_url = "http://localhost:3001".into();
//!
//! let service = SimilarProducts::from_config(&config)?;
//! let products = service.resolver().get_similar_products("1").await?;
//! println!("{}", serde_json::to_string(&products)?);
//! # Ok(())
//! # }
//! ```

mod app;
mod config;
mod error;
mod model;
mod repository;
pub mod resilience;
mod resolver;
mod upstream;

pub use app::{CacheReport, SimilarProducts};
pub use config::{
    CacheSettings, CircuitBreakerSettings, RetrySettings, SimilarProductsConfig, UpstreamConfig,
};
pub use error::{ConfigError, FetchError};
pub use model::{InvalidProduct, InvalidProductId, ProductDetail, ProductId, ProductResponse};
pub use repository::{CachedProductRepository, ProductRepository, DEFAULT_MAX_CONCURRENCY};
pub use resolver::SimilarProductsResolver;
pub use upstream::{UpstreamClient, UpstreamService};
