//! Resolves the similar products of one product id and prints them as JSON.
//!
//! ```text
//! similar-products 1 --upstream http://localhost:3001
//! RUST_LOG=similar_products=debug similar-products 1 --config config.json
//! ```

use clap::Parser;
use similar_products::{SimilarProducts, SimilarProductsConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "similar-products", about = "Resolve similar products of a product id")]
struct Args {
    /// Product id whose similar products are resolved
    product_id: String,

    /// Base url of the upstream product service
    #[arg(long, env = "SIMILAR_PRODUCTS_UPSTREAM")]
    upstream: Option<String>,

    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print circuit breaker and cache counters after resolving
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("similar_products=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimilarProductsConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SimilarProductsConfig::default(),
    };
    if let Some(upstream) = args.upstream {
        config.upstream.base_url = upstream;
    }

    let service = SimilarProducts::from_config(&config)?;
    let products = service
        .resolver()
        .get_similar_products(&args.product_id)
        .await?;
    println!("{}", serde_json::to_string_pretty(&products)?);

    if args.stats {
        for (name, metrics) in service.breakers().snapshot() {
            eprintln!("breaker {name}: {}", serde_json::to_string(&metrics)?);
        }
        let caches = service.cache_stats();
        eprintln!("cache similar-ids: {:?}", caches.similar_ids);
        eprintln!("cache product-detail: {:?}", caches.product_detail);
    }

    Ok(())
}
