//! Integration tests for catalog writes and build hook notifications.
//!
//! Run with: cargo test -p coconut-catalog-integration-tests

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use coconut_catalog::{BuildHookNotifier, Catalog, CatalogError, StoreError};
use coconut_catalog_core::{
    BrandPatch, CollectionId, NewCollection, NewProduct, Price, ProductId, ProductPatch,
};
use coconut_catalog_integration_tests::{bowls_store, eventually, fast_options, hook_server};

fn new_product(name: &str, collection: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        price: Price::from_cents(1250).expect("valid price"),
        description: String::new(),
        image: String::new(),
        collection: collection.to_string(),
        featured: false,
    }
}

#[tokio::test]
async fn test_unknown_collection_fails_without_writing() {
    let remote = bowls_store();
    let catalog = Catalog::create(Arc::new(remote.clone()), fast_options())
        .await
        .expect("catalog should start");
    let mut events = catalog.subscribe_mutations();

    let patch = ProductPatch {
        collection: Some("Cups".to_string()),
        ..ProductPatch::default()
    };
    let result = catalog
        .mutations()
        .update_product(&ProductId::new("p1"), &patch)
        .await;
    assert_eq!(
        result,
        Err(CatalogError::CollectionNotFound("Cups".to_string()))
    );

    let result = catalog.mutations().add_product(&new_product("Cup Lid", "cups")).await;
    assert!(matches!(result, Err(CatalogError::CollectionNotFound(_))));

    assert_eq!(remote.write_count(), 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    catalog.dispose().await;
}

#[tokio::test]
async fn test_rejected_write_surfaces_store_error() {
    let remote = bowls_store();
    let catalog = Catalog::create(Arc::new(remote.clone()), fast_options())
        .await
        .expect("catalog should start");
    let mut events = catalog.subscribe_mutations();
    remote.fail_writes(Some("read only"));

    let result = catalog
        .mutations()
        .add_collection(&NewCollection {
            name: "Cups".to_string(),
            description: String::new(),
            image: String::new(),
        })
        .await;

    assert_eq!(
        result,
        Err(CatalogError::Store(StoreError::Unavailable(
            "read only".to_string()
        )))
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(catalog.snapshot().collections.len(), 1);

    catalog.dispose().await;
}

#[tokio::test]
async fn test_write_is_reconciled_into_snapshot() {
    let catalog = Catalog::create(Arc::new(bowls_store()), fast_options())
        .await
        .expect("catalog should start");

    catalog
        .mutations()
        .add_product(&new_product("Coconut Ladle", "Bowls"))
        .await
        .expect("write should succeed");

    let handle = &catalog;
    let reconciled = eventually(|| async move {
        handle
            .snapshot()
            .products
            .iter()
            .any(|p| p.name == "Coconut Ladle" && p.collection == "Bowls")
    })
    .await;
    assert!(reconciled);
    assert!(catalog.reconciler_stats().reloads() >= 1);

    catalog.dispose().await;
}

#[tokio::test]
async fn test_collection_delete_cascades_to_products() {
    let catalog = Catalog::create(Arc::new(bowls_store()), fast_options())
        .await
        .expect("catalog should start");

    catalog
        .mutations()
        .delete_collection(&CollectionId::new("c1"))
        .await
        .expect("delete should succeed");

    let handle = &catalog;
    let emptied = eventually(|| async move {
        let snapshot = handle.snapshot();
        snapshot.collections.is_empty() && snapshot.products.is_empty()
    })
    .await;
    assert!(emptied);

    catalog.dispose().await;
}

#[tokio::test]
async fn test_brand_update_keeps_other_fields() {
    let catalog = Catalog::create(Arc::new(bowls_store()), fast_options())
        .await
        .expect("catalog should start");
    let before = catalog.snapshot().site_settings.clone();

    catalog
        .mutations()
        .update_site_settings(&BrandPatch {
            brand_name: None,
            tagline: Some("Shells all the way down".to_string()),
        })
        .await
        .expect("write should succeed");

    let handle = &catalog;
    let updated = eventually(|| async move {
        handle.snapshot().site_settings.tagline == "Shells all the way down"
    })
    .await;
    assert!(updated);

    let after = catalog.snapshot().site_settings.clone();
    assert_eq!(after.brand_name, before.brand_name);
    assert_eq!(after.hero_product, before.hero_product);

    catalog.dispose().await;
}

#[tokio::test]
async fn test_write_burst_triggers_one_build() {
    let (url, hits) = hook_server().await.expect("hook server should bind");
    let catalog = Catalog::create(Arc::new(bowls_store()), fast_options())
        .await
        .expect("catalog should start");
    let notifier = BuildHookNotifier::new(url, Duration::from_millis(100))
        .spawn(catalog.subscribe_mutations());

    for name in ["Cup A", "Cup B", "Cup C"] {
        catalog
            .mutations()
            .add_product(&new_product(name, "Bowls"))
            .await
            .expect("write should succeed");
    }

    let counter = &hits;
    assert!(eventually(|| async move { counter.load(Ordering::SeqCst) >= 1 }).await);

    catalog.dispose().await;
    notifier.await.expect("notifier task should finish");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
