//! Catalog entities as they appear in the in-memory mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CollectionId, ProductId};
use super::price::Price;

/// Collection name given to products whose collection reference does not
/// resolve within the snapshot they were loaded with.
pub const UNKNOWN_COLLECTION: &str = "Unknown";

/// A product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    /// Unique within a snapshot.
    pub name: String,
    pub description: String,
    /// Image URL or embedded `data:` URL.
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// A product with its collection reference resolved to a collection name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    /// Image URL or embedded `data:` URL.
    pub image: String,
    /// Resolved collection name, or [`UNKNOWN_COLLECTION`].
    pub collection: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

/// The hero banner shown on the home page.
///
/// Stored remotely as the JSON value of the `hero_product` settings record,
/// using camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroProduct {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub cta_text: String,
    pub cta_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl Default for HeroProduct {
    fn default() -> Self {
        Self {
            id: "hero-1".to_string(),
            title: "Handcrafted Coconut Bowl Set".to_string(),
            description: "Transform your dining experience with our beautifully handcrafted \
                          coconut bowls."
                .to_string(),
            image: "https://images.pexels.com/photos/6542652/pexels-photo-6542652.jpeg\
                    ?auto=compress&cs=tinysrgb&w=1200"
                .to_string(),
            cta_text: "Shop Coconut Bowls".to_string(),
            cta_link: "/products?collection=Bowls & Tableware".to_string(),
            price: Some(Price::from_cents(4599).unwrap_or(Price::ZERO)),
        }
    }
}

/// Brand identity, stored remotely as the `brand_settings` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandSettings {
    pub brand_name: String,
    pub tagline: String,
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            brand_name: "Everything Coconut".to_string(),
            tagline: "Sustainable Handmade Coconut Products".to_string(),
        }
    }
}

/// Site-wide settings: hero banner plus brand identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub hero_product: HeroProduct,
    pub brand_name: String,
    pub tagline: String,
}

impl SiteSettings {
    /// Brand fields as the record stored under `brand_settings`.
    #[must_use]
    pub fn brand(&self) -> BrandSettings {
        BrandSettings {
            brand_name: self.brand_name.clone(),
            tagline: self.tagline.clone(),
        }
    }

    /// `hero` carrying the stored hero's id, for replacing the banner in place.
    #[must_use]
    pub fn hero_replacement(&self, hero: HeroProduct) -> HeroProduct {
        HeroProduct {
            id: self.hero_product.id.clone(),
            ..hero
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        let brand = BrandSettings::default();
        Self {
            hero_product: HeroProduct::default(),
            brand_name: brand.brand_name,
            tagline: brand.tagline,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hero_product_uses_camel_case_keys() {
        let json = serde_json::to_value(HeroProduct::default()).unwrap();
        assert!(json.get("ctaText").is_some());
        assert!(json.get("ctaLink").is_some());
        assert!(json.get("cta_text").is_none());
    }

    #[test]
    fn test_hero_product_price_is_optional() {
        let hero: HeroProduct = serde_json::from_value(serde_json::json!({
            "id": "hero-2",
            "title": "Spoons",
            "description": "Carved",
            "image": "https://example.com/spoon.jpg",
            "ctaText": "Shop",
            "ctaLink": "/products"
        }))
        .unwrap();
        assert_eq!(hero.price, None);
    }

    #[test]
    fn test_default_site_settings_has_brand() {
        let settings = SiteSettings::default();
        assert_eq!(settings.brand_name, "Everything Coconut");
        assert_eq!(settings.brand(), BrandSettings::default());
        assert!(!settings.hero_product.title.is_empty());
    }

    #[test]
    fn test_hero_replacement_keeps_stored_id() {
        let mut settings = SiteSettings::default();
        settings.hero_product.id = "hero-7".to_string();

        let hero = settings.hero_replacement(HeroProduct {
            id: String::new(),
            title: "Spoon Set".to_string(),
            price: None,
            ..HeroProduct::default()
        });

        assert_eq!(hero.id, "hero-7");
        assert_eq!(hero.title, "Spoon Set");
        assert_eq!(hero.price, None);
    }
}
