//! Read-side queries over a [`Snapshot`].
//!
//! Every query is a pure function of the snapshot it runs on. Missing
//! entities are reported as `None` or an empty list, never as an error.

use rust_decimal::Decimal;
use serde::Serialize;

use coconut_catalog_core::{
    ALL_COLLECTIONS, Collection, CollectionId, Price, Product, ProductFilter, ProductId, SortKey,
};

use crate::snapshot::Snapshot;

/// Default number of related products shown next to a product.
pub const RELATED_PRODUCTS_LIMIT: usize = 4;

/// Per-collection product counts and price range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub products: usize,
    pub featured: usize,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

/// Catalog-wide counts shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_products: usize,
    pub total_collections: usize,
    pub featured_products: usize,
    /// Mean product price rounded to cents; zero for an empty catalog.
    pub average_price: Price,
}

impl Snapshot {
    /// Find a product by ID.
    #[must_use]
    pub fn lookup_product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Find a collection by ID.
    #[must_use]
    pub fn lookup_collection(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| &c.id == id)
    }

    /// Find a collection by its exact name.
    #[must_use]
    pub fn collection_by_name(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Products in the named collection (case-insensitive), or every product
    /// for `"all"`.
    #[must_use]
    pub fn products_in_collection(&self, name: &str) -> Vec<&Product> {
        filter_by_collection(&self.products, name)
    }

    /// Products in the collection with this ID.
    ///
    /// Empty if the collection is not in the snapshot.
    #[must_use]
    pub fn products_in_collection_id(&self, id: &CollectionId) -> Vec<&Product> {
        self.lookup_collection(id).map_or_else(Vec::new, |collection| {
            self.products
                .iter()
                .filter(|p| p.collection == collection.name)
                .collect()
        })
    }

    /// Featured products, in snapshot order.
    #[must_use]
    pub fn featured_products(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.featured).collect()
    }

    /// Products whose name, description or collection contains `query`.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        search_products(&self.products, query)
    }

    /// Other products from the same collection, at most `limit`.
    #[must_use]
    pub fn related_products(&self, product: &Product, limit: usize) -> Vec<&Product> {
        self.products_in_collection(&product.collection)
            .into_iter()
            .filter(|p| p.id != product.id)
            .take(limit)
            .collect()
    }

    /// Counts and price range of the named collection.
    #[must_use]
    pub fn collection_summary(&self, name: &str) -> CollectionSummary {
        let products = self.products_in_collection(name);
        CollectionSummary {
            name: name.to_string(),
            products: products.len(),
            featured: products.iter().filter(|p| p.featured).count(),
            min_price: products.iter().map(|p| p.price).min(),
            max_price: products.iter().map(|p| p.price).max(),
        }
    }

    /// Catalog-wide counts and average price.
    #[must_use]
    pub fn catalog_stats(&self) -> CatalogStats {
        let total = self.products.len();
        let average_price = if total == 0 {
            Price::ZERO
        } else {
            let sum: Decimal = self.products.iter().map(|p| p.price.amount()).sum();
            Price::new((sum / Decimal::from(total)).round_dp(2)).unwrap_or(Price::ZERO)
        };

        CatalogStats {
            total_products: total,
            total_collections: self.collections.len(),
            featured_products: self.products.iter().filter(|p| p.featured).count(),
            average_price,
        }
    }

    /// Collections whose name or description contains `query`
    /// (case-insensitive). A blank query returns every collection.
    #[must_use]
    pub fn filter_collections(&self, query: &str) -> Vec<&Collection> {
        if query.trim().is_empty() {
            return self.collections.iter().collect();
        }
        let needle = query.to_lowercase();
        self.collections
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// The product listing for a browse filter.
    ///
    /// A non-blank search replaces the collection filter; the sort applies
    /// either way.
    #[must_use]
    pub fn browse(&self, filter: &ProductFilter) -> Vec<&Product> {
        let products = if filter.search.trim().is_empty() {
            self.products_in_collection(&filter.collection)
        } else {
            self.search(&filter.search)
        };
        sort_products(products, filter.sort)
    }
}

/// Products in the named collection (case-insensitive), or all of them for
/// `"all"`.
pub fn filter_by_collection<'a, I>(products: I, name: &str) -> Vec<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    if name == ALL_COLLECTIONS {
        return products.into_iter().collect();
    }
    let name = name.to_lowercase();
    products
        .into_iter()
        .filter(|p| p.collection.to_lowercase() == name)
        .collect()
}

/// Case-insensitive substring search over name, description and collection.
///
/// A blank query matches everything.
pub fn search_products<'a, I>(products: I, query: &str) -> Vec<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    if query.trim().is_empty() {
        return products.into_iter().collect();
    }
    let needle = query.to_lowercase();
    products
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
                || p.collection.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Stable sort by `key`. Equal elements keep their relative order.
#[must_use]
pub fn sort_products(mut products: Vec<&Product>, key: SortKey) -> Vec<&Product> {
    match key {
        SortKey::Name => products.sort_by_cached_key(|p| p.name.to_lowercase()),
        SortKey::PriceLow => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceHigh => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    products
}
