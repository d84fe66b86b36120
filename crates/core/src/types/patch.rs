//! Create and update intents for catalog writes.
//!
//! Update types are patches: every field is `Option`, where `None` leaves the
//! remote value unchanged and `Some(v)` sets it to `v`, including an empty
//! string.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// A collection to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub description: String,
    pub image: String,
}

/// Partial update of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl CollectionPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// A product to create. `collection` is a collection *name*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image: String,
    pub collection: String,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update of a product. `collection` is a collection *name*.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub collection: Option<String>,
    pub featured: Option<bool>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.collection.is_none()
            && self.featured.is_none()
    }
}

/// Partial update of the brand identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandPatch {
    pub brand_name: Option<String>,
    pub tagline: Option<String>,
}

impl BrandPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.brand_name.is_none() && self.tagline.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patches_are_empty() {
        assert!(CollectionPatch::default().is_empty());
        assert!(ProductPatch::default().is_empty());
        assert!(BrandPatch::default().is_empty());
    }

    #[test]
    fn test_empty_string_is_present() {
        let patch = ProductPatch {
            description: Some(String::new()),
            ..ProductPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
