//! Demo catalog loaded by [`MemoryStore::seeded`](crate::remote::MemoryStore::seeded).

use serde_json::{Value, json};

use crate::remote::Row;
use crate::remote::rows::{BRAND_SETTINGS_KEY, HERO_PRODUCT_KEY};

const IMAGE_BASE: &str = "https://images.pexels.com/photos";

/// `(id, name, description, photo)`
const COLLECTIONS: &[(&str, &str, &str, &str)] = &[
    (
        "bowls-tableware",
        "Bowls & Tableware",
        "Handcrafted coconut bowls and sustainable dining essentials",
        "6542652",
    ),
    (
        "home-decor",
        "Home Decor",
        "Eco-friendly coconut shell decorative items for your home",
        "6207516",
    ),
    (
        "planters-garden",
        "Planters & Garden",
        "Natural coconut shell planters and garden accessories",
        "4751978",
    ),
    (
        "kitchen-accessories",
        "Kitchen Accessories",
        "Sustainable coconut-based kitchen tools and accessories",
        "4198224",
    ),
    (
        "wellness-spa",
        "Wellness & Spa",
        "Natural coconut products for wellness and self-care",
        "3865711",
    ),
];

/// `(id, name, price, description, collection_id, featured, created_at)`
const PRODUCTS: &[(&str, &str, &str, &str, &str, bool, &str)] = &[
    (
        "1",
        "Handcrafted Coconut Bowl Set (4 pieces)",
        "45.99",
        "Set of 4 handcrafted coconut bowls, each uniquely shaped and polished.",
        "bowls-tableware",
        true,
        "2024-01-15T10:00:00Z",
    ),
    (
        "2",
        "Coconut Shell Spoon Set",
        "18.99",
        "Set of 6 handcarved coconut shell spoons with a smooth finish.",
        "bowls-tableware",
        true,
        "2024-01-14T09:30:00Z",
    ),
    (
        "3",
        "Large Coconut Serving Bowl",
        "24.99",
        "Extra large coconut bowl for salads, fruits or as a centerpiece.",
        "bowls-tableware",
        false,
        "2024-01-13T14:20:00Z",
    ),
    (
        "4",
        "Coconut Shell Cups (Set of 2)",
        "22.99",
        "Pair of coconut shell cups for hot or cold beverages.",
        "bowls-tableware",
        false,
        "2024-01-12T11:15:00Z",
    ),
    (
        "5",
        "Coconut Shell Candle Holders (Set of 3)",
        "32.99",
        "Three coconut shell candle holders in different sizes.",
        "home-decor",
        true,
        "2024-01-11T16:45:00Z",
    ),
    (
        "6",
        "Decorative Coconut Shell Wall Art",
        "38.99",
        "Wall art made from coconut shells arranged in an artistic pattern.",
        "home-decor",
        false,
        "2024-01-10T13:30:00Z",
    ),
    (
        "7",
        "Coconut Shell Bird Feeder",
        "19.99",
        "Bird feeder made from a whole coconut shell, with hanging rope.",
        "home-decor",
        true,
        "2024-01-09T12:00:00Z",
    ),
    (
        "9",
        "Hanging Coconut Planters (Set of 3)",
        "42.99",
        "Hanging coconut shell planters with natural rope hangers.",
        "planters-garden",
        true,
        "2024-01-07T10:30:00Z",
    ),
    (
        "12",
        "Coconut Fiber Garden Mulch",
        "15.99",
        "Natural coconut fiber mulch that retains moisture.",
        "planters-garden",
        true,
        "2024-01-04T09:20:00Z",
    ),
    (
        "13",
        "Coconut Shell Ladle",
        "12.99",
        "Handcarved ladle with a coconut shell bowl and wooden handle.",
        "kitchen-accessories",
        false,
        "2024-01-03T16:30:00Z",
    ),
    (
        "14",
        "Coconut Shell Measuring Cups",
        "26.99",
        "Set of measuring cups carved from coconut shells.",
        "kitchen-accessories",
        true,
        "2024-01-02T12:45:00Z",
    ),
    (
        "16",
        "Coconut Oil Soap Bars (Set of 3)",
        "21.99",
        "Cold-pressed coconut oil soap bars.",
        "wellness-spa",
        true,
        "2023-12-31T14:30:00Z",
    ),
    (
        "18",
        "Pure Coconut Oil (16oz)",
        "18.99",
        "Virgin coconut oil for cooking and skin care.",
        "wellness-spa",
        true,
        "2023-12-29T15:45:00Z",
    ),
    (
        "20",
        "Coconut Fiber Bath Mitt",
        "12.99",
        "Exfoliating bath mitt woven from coconut fiber.",
        "wellness-spa",
        false,
        "2023-12-27T16:25:00Z",
    ),
];

fn image(photo: &str) -> String {
    format!("{IMAGE_BASE}/{photo}/pexels-photo-{photo}.jpeg?auto=compress&cs=tinysrgb&w=800")
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Demo `collections` rows.
#[must_use]
pub fn collection_rows() -> Vec<Row> {
    COLLECTIONS
        .iter()
        .map(|&(id, name, description, photo)| {
            row(json!({
                "id": id,
                "name": name,
                "description": description,
                "image": image(photo),
                "created_at": "2024-01-01T00:00:00Z",
            }))
        })
        .collect()
}

/// Demo `products` rows.
#[must_use]
pub fn product_rows() -> Vec<Row> {
    PRODUCTS
        .iter()
        .map(
            |&(id, name, price, description, collection_id, featured, created_at)| {
                let photo = COLLECTIONS
                    .iter()
                    .find(|c| c.0 == collection_id)
                    .map_or("6542652", |c| c.3);
                row(json!({
                    "id": id,
                    "name": name,
                    "price": price,
                    "description": description,
                    "image": image(photo),
                    "collection_id": collection_id,
                    "featured": featured,
                    "created_at": created_at,
                }))
            },
        )
        .collect()
}

/// Demo `site_settings` rows.
#[must_use]
pub fn setting_rows() -> Vec<Row> {
    vec![
        row(json!({
            "key": HERO_PRODUCT_KEY,
            "value": {
                "id": "hero-1",
                "title": "Handcrafted Coconut Bowl Set",
                "description": "Beautifully handcrafted coconut bowls, each upcycled from discarded shells.",
                "image": image("6542652"),
                "ctaText": "Shop Coconut Bowls",
                "ctaLink": "/products?collection=Bowls & Tableware",
                "price": "45.99",
            },
        })),
        row(json!({
            "key": BRAND_SETTINGS_KEY,
            "value": {
                "brandName": "Everything Coconut",
                "tagline": "Sustainable Handmade Coconut Products",
            },
        })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_product_references_a_seeded_collection() {
        let collections = collection_rows();
        for product in product_rows() {
            let collection_id = product.get("collection_id").and_then(Value::as_str);
            assert!(
                collections
                    .iter()
                    .any(|c| c.get("id").and_then(Value::as_str) == collection_id),
                "dangling collection reference in {product:?}"
            );
        }
    }
}
