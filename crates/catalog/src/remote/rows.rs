//! Typed views of remote rows.
//!
//! Column names follow the remote schema (`snake_case`, `collection_id`),
//! not the mirror's entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use coconut_catalog_core::Price;

/// Settings key holding the hero banner.
pub const HERO_PRODUCT_KEY: &str = "hero_product";
/// Settings key holding the brand name and tagline.
pub const BRAND_SETTINGS_KEY: &str = "brand_settings";

/// A row of the `collections` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRow {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `products` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    /// Collection identifier; resolved to a name during denormalization.
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Nullable columns read `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A keyed record of the `site_settings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub key: String,
    pub value: serde_json::Value,
}

/// The `brand_settings` value. Either field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandRecord {
    pub brand_name: Option<String>,
    pub tagline: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_row_accepts_numeric_price_and_defaults() {
        let row: ProductRow = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Coconut Bowl",
            "price": 10,
            "collection_id": "c1",
            "created_at": "2024-01-15T10:00:00+00:00",
            "updated_at": "2024-01-15T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(row.price, Price::from_cents(1000).unwrap());
        assert!(!row.featured);
        assert!(row.description.is_empty());
        assert_eq!(row.collection_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_null_text_columns_read_as_empty() {
        let row: ProductRow = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Coconut Bowl",
            "price": "10.00",
            "description": null,
            "image": null,
            "featured": null,
            "created_at": "2024-01-15T10:00:00Z"
        }))
        .unwrap();
        assert!(row.description.is_empty());
        assert!(row.image.is_empty());
        assert!(!row.featured);

        let row: CollectionRow = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "name": "Bowls",
            "description": null,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(row.description.is_empty());
    }

    #[test]
    fn test_brand_record_partial() {
        let brand: BrandRecord =
            serde_json::from_value(serde_json::json!({ "tagline": "Made by hand" })).unwrap();
        assert_eq!(brand.brand_name, None);
        assert_eq!(brand.tagline.as_deref(), Some("Made by hand"));
    }
}
