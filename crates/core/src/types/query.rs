//! Sort keys and browse filters for product listings.

use serde::{Deserialize, Serialize};

/// Collection filter value that matches every product.
pub const ALL_COLLECTIONS: &str = "all";

/// Product listing sort order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Name, ascending.
    #[default]
    #[serde(rename = "name")]
    Name,
    /// Price, ascending.
    #[serde(rename = "price-low")]
    PriceLow,
    /// Price, descending.
    #[serde(rename = "price-high")]
    PriceHigh,
    /// Creation time, newest first.
    #[serde(rename = "newest")]
    Newest,
}

impl SortKey {
    /// Parse from a URL/CLI parameter value. Unknown values fall back to `Name`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "newest" => Self::Newest,
            _ => Self::Name,
        }
    }

    /// Convert to parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Newest => "newest",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product browse state: collection filter, sort order and search query.
///
/// A non-blank search takes precedence over the collection filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub collection: String,
    pub sort: SortKey,
    pub search: String,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            collection: ALL_COLLECTIONS.to_string(),
            sort: SortKey::Name,
            search: String::new(),
        }
    }
}
