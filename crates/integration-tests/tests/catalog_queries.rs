//! Integration tests for loading and querying the catalog.
//!
//! Run with: cargo test -p coconut-catalog-integration-tests

#![allow(clippy::indexing_slicing)]

use std::sync::Arc;

use coconut_catalog::{Catalog, MemoryStore, RELATED_PRODUCTS_LIMIT};
use coconut_catalog_core::{
    ALL_COLLECTIONS, CollectionId, ProductFilter, ProductId, SortKey, StoreStatus, Table,
    UNKNOWN_COLLECTION,
};
use coconut_catalog_integration_tests::{bowls_store, collection_row, fast_options, product_row};

fn names<'a>(products: impl IntoIterator<Item = &'a coconut_catalog_core::Product>) -> Vec<&'a str> {
    products.into_iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn test_price_low_within_collection() {
    let catalog = Catalog::create(Arc::new(bowls_store()), fast_options())
        .await
        .expect("catalog should start");
    let snapshot = catalog.snapshot();

    let bowls = snapshot.products_in_collection("Bowls");
    let sorted = coconut_catalog::query::sort_products(bowls, SortKey::PriceLow);
    assert_eq!(names(sorted), ["Coconut Cup", "Coconut Bowl"]);

    catalog.dispose().await;
}

#[tokio::test]
async fn test_collection_membership_is_resolved_by_name() {
    let store = bowls_store();
    store.load_rows(Table::Collections, vec![collection_row("c2", "Planters")]);
    store.load_rows(
        Table::Products,
        vec![
            product_row("p3", "Shell Planter", "12.00", "c2", false, "2024-01-04T00:00:00Z"),
            product_row("p4", "Mystery Lid", "3.00", "c9", false, "2024-01-05T00:00:00Z"),
        ],
    );

    let catalog = Catalog::create(Arc::new(store), fast_options())
        .await
        .expect("catalog should start");
    let snapshot = catalog.snapshot();

    let lid = snapshot
        .lookup_product(&ProductId::new("p4"))
        .expect("p4 should be loaded");
    assert_eq!(lid.collection, UNKNOWN_COLLECTION);

    for product in &snapshot.products {
        let in_collection = snapshot.products_in_collection(&product.collection);
        assert!(in_collection.iter().any(|p| p.id == product.id));
    }

    assert_eq!(snapshot.products_in_collection(ALL_COLLECTIONS).len(), 4);
    assert_eq!(
        names(snapshot.products_in_collection_id(&CollectionId::new("c2"))),
        ["Shell Planter"]
    );

    catalog.dispose().await;
}

#[tokio::test]
async fn test_search_overrides_collection_filter() {
    let catalog = Catalog::create(Arc::new(MemoryStore::seeded()), fast_options())
        .await
        .expect("catalog should start");
    let snapshot = catalog.snapshot();

    let filter = ProductFilter {
        collection: "Home Decor".to_string(),
        sort: SortKey::PriceLow,
        search: "spoon".to_string(),
    };
    let results = snapshot.browse(&filter);

    assert!(!results.is_empty());
    assert!(results.iter().all(|p| p.name.to_lowercase().contains("spoon")
        || p.description.to_lowercase().contains("spoon")
        || p.collection.to_lowercase().contains("spoon")));
    assert!(results.windows(2).all(|w| w[0].price <= w[1].price));

    catalog.dispose().await;
}

#[tokio::test]
async fn test_seeded_catalog_is_consistent() {
    let catalog = Catalog::create(Arc::new(MemoryStore::seeded()), fast_options())
        .await
        .expect("catalog should start");
    assert_eq!(catalog.store().status(), StoreStatus::Ready);

    let snapshot = catalog.snapshot();
    let stats = snapshot.catalog_stats();
    assert_eq!(stats.total_collections, snapshot.collections.len());
    assert_eq!(stats.total_products, snapshot.products.len());
    assert_eq!(stats.featured_products, snapshot.featured_products().len());

    let summed: usize = snapshot
        .collections
        .iter()
        .map(|c| snapshot.collection_summary(&c.name).products)
        .sum();
    assert_eq!(summed, snapshot.products.len());

    let newest = snapshot.browse(&ProductFilter {
        sort: SortKey::Newest,
        ..ProductFilter::default()
    });
    assert!(newest.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let first = snapshot.products.first().expect("seeded products");
    let related = snapshot.related_products(first, RELATED_PRODUCTS_LIMIT);
    assert!(related.len() <= RELATED_PRODUCTS_LIMIT);
    assert!(related.iter().all(|p| p.id != first.id && p.collection == first.collection));

    assert_eq!(snapshot.site_settings.brand_name, "Everything Coconut");

    catalog.dispose().await;
}
