//! Read-only catalog queries.

use tracing::info;

use coconut_catalog::RELATED_PRODUCTS_LIMIT;
use coconut_catalog_core::{Product, ProductFilter, ProductId, SortKey};

use super::{CommandError, Session};

fn log_product(product: &Product) {
    info!(
        id = %product.id,
        price = %product.price,
        collection = %product.collection,
        featured = product.featured,
        "{}",
        product.name
    );
}

/// List products matching a collection filter or search query.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or loaded.
pub async fn products(
    demo: bool,
    collection: String,
    search: String,
    sort: &str,
) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    let filter = ProductFilter {
        collection,
        sort: SortKey::parse(sort),
        search,
    };
    let products = snapshot.browse(&filter);

    info!(
        count = products.len(),
        collection = %filter.collection,
        search = %filter.search,
        sort = %filter.sort,
        "Products"
    );
    for product in products {
        log_product(product);
    }

    session.close().await;
    Ok(())
}

/// Show one product and the products related to it.
///
/// # Errors
///
/// Returns [`CommandError::NotFound`] if no product has the given ID.
pub async fn product(demo: bool, id: &str) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    let Some(product) = snapshot.lookup_product(&ProductId::new(id)) else {
        session.close().await;
        return Err(CommandError::NotFound(format!("product {id}")));
    };

    log_product(product);
    if !product.description.is_empty() {
        info!("{}", product.description);
    }

    let related = snapshot.related_products(product, RELATED_PRODUCTS_LIMIT);
    info!(count = related.len(), "Related products");
    for related in related {
        log_product(related);
    }

    session.close().await;
    Ok(())
}

/// List collections with their product counts and price ranges.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or loaded.
pub async fn collections(demo: bool, search: &str) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    let collections = snapshot.filter_collections(search);
    info!(count = collections.len(), "Collections");
    for collection in collections {
        let summary = snapshot.collection_summary(&collection.name);
        info!(
            id = %collection.id,
            products = summary.products,
            featured = summary.featured,
            min_price = %summary.min_price.map(|p| p.to_string()).unwrap_or_default(),
            max_price = %summary.max_price.map(|p| p.to_string()).unwrap_or_default(),
            "{}",
            collection.name
        );
    }

    session.close().await;
    Ok(())
}

/// List featured products.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or loaded.
pub async fn featured(demo: bool) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    let featured = snapshot.featured_products();
    info!(count = featured.len(), "Featured products");
    for product in featured {
        log_product(product);
    }

    session.close().await;
    Ok(())
}

/// Show catalog-wide counts.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or loaded.
pub async fn stats(demo: bool) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    let stats = snapshot.catalog_stats();
    info!(
        products = stats.total_products,
        collections = stats.total_collections,
        featured = stats.featured_products,
        average_price = %stats.average_price,
        generation = snapshot.generation,
        "Catalog stats"
    );

    session.close().await;
    Ok(())
}

/// Print the hero banner and brand settings as JSON.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or loaded.
pub async fn settings(demo: bool) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let snapshot = session.snapshot()?;

    session.close().await;

    let json = serde_json::to_string_pretty(&snapshot.site_settings)?;
    info!("Site settings:\n{json}");
    Ok(())
}
