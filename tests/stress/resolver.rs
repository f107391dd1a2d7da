//! Resolver stress tests

use rust_decimal::Decimal;
use similar_products::{
    FetchError, ProductId, ProductResponse, SimilarProducts, SimilarProductsConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::service_fn;
use tower::util::BoxCloneSyncService;

/// Test: many concurrent requests sharing caches and breakers
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_requests() {
    let product_calls = Arc::new(AtomicUsize::new(0));

    let similar = BoxCloneSyncService::new(service_fn(|id: ProductId| async move {
        let base: u32 = id.as_str().parse().unwrap_or(0);
        Ok::<_, FetchError>(
            (1..=20u32)
                .filter_map(|n| ProductId::parse(&((base * 100 + n) % 5000).to_string()).ok())
                .collect(),
        )
    }));

    let counter = Arc::clone(&product_calls);
    let product = BoxCloneSyncService::new(service_fn(move |id: ProductId| {
        counter.fetch_add(1, Ordering::Relaxed);
        async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok::<_, FetchError>(ProductResponse {
                id: Some(id.to_string()),
                name: Some(format!("Product {id}")),
                price: Some(Decimal::new(999, 2)),
                availability: Some(true),
            })
        }
    }));

    let service =
        SimilarProducts::with_upstream(&SimilarProductsConfig::default(), similar, product)
            .unwrap();

    let start = Instant::now();
    let mut handles = Vec::new();
    for request in 0..200u32 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .resolver()
                .get_similar_products(&(request % 50).to_string())
                .await
                .unwrap()
                .len()
        }));
    }

    let mut resolved = 0;
    for handle in handles {
        resolved += handle.await.unwrap();
    }

    let calls = product_calls.load(Ordering::Relaxed);
    println!("200 requests in {:?}", start.elapsed());
    println!("Upstream product calls: {calls}");
    println!("{:?}", service.cache_stats());

    assert_eq!(resolved, 200 * 20);
    // 50 distinct requests with 20 distinct ids each; concurrent misses may
    // fetch the same id more than once
    assert!(calls >= 1000);
}
