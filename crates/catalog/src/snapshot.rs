//! Immutable catalog snapshots and the denormalization pass that builds them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use coconut_catalog_core::{
    Collection, CollectionId, HeroProduct, Product, ProductId, SiteSettings, Table,
    UNKNOWN_COLLECTION,
};

use crate::remote::Row;
use crate::remote::rows::{
    BRAND_SETTINGS_KEY, BrandRecord, CollectionRow, HERO_PRODUCT_KEY, ProductRow, SettingRecord,
};

/// A complete copy of the catalog at one point in time.
///
/// Snapshots are never mutated after construction; a reload builds a new one
/// and swaps it in wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Collections, ordered by name.
    pub collections: Vec<Collection>,
    /// Products, newest first.
    pub products: Vec<Product>,
    pub site_settings: SiteSettings,
    /// Incremented on every successful reload; `0` before the first.
    pub generation: u64,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// The snapshot held before the first successful reload.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            collections: Vec::new(),
            products: Vec::new(),
            site_settings: SiteSettings::default(),
            generation: 0,
            loaded_at: None,
        }
    }

    /// Build a snapshot from freshly fetched rows.
    ///
    /// Product collection references are resolved against `collection_rows`
    /// only. Unresolvable references become [`UNKNOWN_COLLECTION`]. Rows that
    /// fail to decode are logged and skipped.
    #[must_use]
    pub fn build(
        collection_rows: Vec<Row>,
        product_rows: Vec<Row>,
        setting_rows: Vec<Row>,
        generation: u64,
    ) -> Self {
        let collections: Vec<Collection> = collection_rows
            .into_iter()
            .filter_map(|row| decode::<CollectionRow>(Table::Collections, row))
            .map(into_collection)
            .collect();

        let names: HashMap<&str, &str> = collections
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let products = product_rows
            .into_iter()
            .filter_map(|row| decode::<ProductRow>(Table::Products, row))
            .map(|row| denormalize(row, &names))
            .collect();

        let site_settings = merge_settings(setting_rows);

        Self {
            collections,
            products,
            site_settings,
            generation,
            loaded_at: Some(Utc::now()),
        }
    }
}

fn decode<T: DeserializeOwned>(table: Table, row: Row) -> Option<T> {
    let id = row.get("id").and_then(serde_json::Value::as_str).map(str::to_string);
    match serde_json::from_value(serde_json::Value::Object(row)) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(%table, id = ?id, error = %e, "Skipping malformed row");
            None
        }
    }
}

fn into_collection(row: CollectionRow) -> Collection {
    Collection {
        id: CollectionId::new(row.id),
        name: row.name,
        description: row.description,
        image: row.image,
        created_at: row.created_at,
    }
}

/// Resolve a product row's collection id to a collection name.
fn denormalize(row: ProductRow, names: &HashMap<&str, &str>) -> Product {
    let collection = row
        .collection_id
        .as_deref()
        .and_then(|id| names.get(id).copied())
        .unwrap_or(UNKNOWN_COLLECTION)
        .to_string();

    Product {
        id: ProductId::new(row.id),
        name: row.name,
        price: row.price,
        description: row.description,
        image: row.image,
        collection,
        featured: row.featured,
        created_at: row.created_at,
    }
}

/// Merge settings records over the defaults.
fn merge_settings(rows: Vec<Row>) -> SiteSettings {
    let mut settings = SiteSettings::default();

    for row in rows {
        let record: SettingRecord = match serde_json::from_value(serde_json::Value::Object(row)) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping malformed site_settings row");
                continue;
            }
        };

        match record.key.as_str() {
            HERO_PRODUCT_KEY => match serde_json::from_value::<HeroProduct>(record.value) {
                Ok(hero) => settings.hero_product = hero,
                Err(e) => warn!(error = %e, "Ignoring malformed hero_product record"),
            },
            BRAND_SETTINGS_KEY => match serde_json::from_value::<BrandRecord>(record.value) {
                Ok(brand) => {
                    if let Some(name) = brand.brand_name {
                        settings.brand_name = name;
                    }
                    if let Some(tagline) = brand.tagline {
                        settings.tagline = tagline;
                    }
                }
                Err(e) => warn!(error = %e, "Ignoring malformed brand_settings record"),
            },
            _ => {}
        }
    }

    settings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn collection(id: &str, name: &str) -> Row {
        row(json!({ "id": id, "name": name, "created_at": "2024-01-01T00:00:00Z" }))
    }

    fn product(id: &str, name: &str, collection_id: &str) -> Row {
        row(json!({
            "id": id,
            "name": name,
            "price": "10.00",
            "collection_id": collection_id,
            "created_at": "2024-01-15T10:00:00Z"
        }))
    }

    #[test]
    fn test_denormalizes_collection_names() {
        let snapshot = Snapshot::build(
            vec![collection("c1", "Bowls")],
            vec![product("p1", "Coconut Bowl", "c1"), product("p2", "Mystery", "c9")],
            vec![],
            1,
        );

        assert_eq!(snapshot.products[0].collection, "Bowls");
        assert_eq!(snapshot.products[1].collection, UNKNOWN_COLLECTION);
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.loaded_at.is_some());
    }

    #[test]
    fn test_missing_collection_id_is_unknown() {
        let mut orphan = product("p1", "Orphan", "c1");
        orphan.insert("collection_id".to_string(), serde_json::Value::Null);
        let snapshot = Snapshot::build(vec![collection("c1", "Bowls")], vec![orphan], vec![], 1);
        assert_eq!(snapshot.products[0].collection, UNKNOWN_COLLECTION);
    }

    #[test]
    fn test_settings_merge_over_defaults() {
        let snapshot = Snapshot::build(
            vec![],
            vec![],
            vec![row(json!({
                "key": BRAND_SETTINGS_KEY,
                "value": { "tagline": "Made by hand" }
            }))],
            1,
        );

        let defaults = SiteSettings::default();
        assert_eq!(snapshot.site_settings.tagline, "Made by hand");
        assert_eq!(snapshot.site_settings.brand_name, defaults.brand_name);
        assert_eq!(snapshot.site_settings.hero_product, defaults.hero_product);
    }

    #[test]
    fn test_hero_record_replaces_default() {
        let snapshot = Snapshot::build(
            vec![],
            vec![],
            vec![row(json!({
                "key": HERO_PRODUCT_KEY,
                "value": {
                    "id": "hero-2",
                    "title": "Spoon Set",
                    "description": "Carved spoons",
                    "image": "https://example.com/spoons.jpg",
                    "ctaText": "Shop Spoons",
                    "ctaLink": "/products?collection=Kitchen"
                }
            }))],
            1,
        );

        assert_eq!(snapshot.site_settings.hero_product.title, "Spoon Set");
        assert_eq!(snapshot.site_settings.hero_product.price, None);
    }

    #[test]
    fn test_malformed_hero_keeps_default() {
        let snapshot = Snapshot::build(
            vec![],
            vec![],
            vec![row(json!({ "key": HERO_PRODUCT_KEY, "value": { "title": 7 } }))],
            1,
        );
        assert_eq!(snapshot.site_settings.hero_product, HeroProduct::default());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut negative = product("p2", "Refund", "c1");
        negative.insert("price".to_string(), json!("-3"));
        let mut null_text = product("p3", "Coconut Cup", "c1");
        null_text.insert("description".to_string(), serde_json::Value::Null);
        let nameless = row(json!({ "id": "c2", "created_at": "2024-01-01T00:00:00Z" }));

        let snapshot = Snapshot::build(
            vec![collection("c1", "Bowls"), nameless],
            vec![product("p1", "Coconut Bowl", "c1"), negative, null_text],
            vec![],
            1,
        );

        assert_eq!(snapshot.collections.len(), 1);
        let names: Vec<_> = snapshot.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Coconut Bowl", "Coconut Cup"]);
        assert!(snapshot.products[1].description.is_empty());
        assert_eq!(snapshot.products[1].collection, "Bowls");
    }
}
