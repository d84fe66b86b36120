//! Catalog mutations.
//!
//! Each command opens the catalog, performs one write through the mutation
//! proxy and reloads to log the result. When a build hook is configured the
//! session waits for it before exiting.

use tracing::info;

use coconut_catalog_core::{
    BrandPatch, CollectionId, CollectionPatch, HeroProduct, NewCollection, NewProduct, ProductId,
    ProductPatch,
};

use super::{CommandError, Session};

/// Reload after a write and close the session.
async fn finish(session: Session) -> Result<(), CommandError> {
    let result = session.catalog().store().reload().await;
    session.close().await;

    let snapshot = result?;
    info!(
        generation = snapshot.generation,
        collections = snapshot.collections.len(),
        products = snapshot.products.len(),
        "Catalog reloaded"
    );
    Ok(())
}

/// Create a collection.
///
/// # Errors
///
/// Returns an error if the remote store rejects the write.
pub async fn add_collection(demo: bool, collection: &NewCollection) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    if let Err(e) = session.catalog().mutations().add_collection(collection).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Update a collection.
///
/// # Errors
///
/// Returns an error if the remote store rejects the write.
pub async fn update_collection(
    demo: bool,
    id: &str,
    patch: &CollectionPatch,
) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    let id = CollectionId::new(id);
    if let Err(e) = session.catalog().mutations().update_collection(&id, patch).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Delete a collection together with its products.
///
/// # Errors
///
/// Returns [`CommandError::NotFound`] if the collection is not in the
/// catalog, or an error if the remote store rejects the write.
pub async fn delete_collection(demo: bool, id: &str) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    let id = CollectionId::new(id);

    let snapshot = session.snapshot()?;
    if snapshot.lookup_collection(&id).is_none() {
        session.close().await;
        return Err(CommandError::NotFound(format!("collection {id}")));
    }

    if let Err(e) = session.catalog().mutations().delete_collection(&id).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Create a product in an existing collection.
///
/// # Errors
///
/// Returns an error if the collection name does not resolve or the remote
/// store rejects the write.
pub async fn add_product(demo: bool, product: &NewProduct) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    if let Err(e) = session.catalog().mutations().add_product(product).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Update a product.
///
/// # Errors
///
/// Returns an error if a new collection name does not resolve or the remote
/// store rejects the write.
pub async fn update_product(
    demo: bool,
    id: &str,
    patch: &ProductPatch,
) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    let id = ProductId::new(id);
    if let Err(e) = session.catalog().mutations().update_product(&id, patch).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Delete a product.
///
/// # Errors
///
/// Returns [`CommandError::NotFound`] if the product is not in the catalog,
/// or an error if the remote store rejects the write.
pub async fn delete_product(demo: bool, id: &str) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    let id = ProductId::new(id);

    let snapshot = session.snapshot()?;
    if snapshot.lookup_product(&id).is_none() {
        session.close().await;
        return Err(CommandError::NotFound(format!("product {id}")));
    }

    if let Err(e) = session.catalog().mutations().delete_product(&id).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Replace the hero banner, keeping the stored hero id.
///
/// # Errors
///
/// Returns an error if the catalog is unavailable or the remote store
/// rejects the write.
pub async fn set_hero(demo: bool, hero: HeroProduct) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    let hero = match session.snapshot() {
        Ok(snapshot) => snapshot.site_settings.hero_replacement(hero),
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    };

    if let Err(e) = session.catalog().mutations().update_hero_product(&hero).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}

/// Update brand name and/or tagline.
///
/// # Errors
///
/// Returns an error if the remote store rejects the write.
pub async fn set_brand(demo: bool, patch: &BrandPatch) -> Result<(), CommandError> {
    let session = Session::open(demo, true).await?;
    if let Err(e) = session.catalog().mutations().update_site_settings(patch).await {
        session.close().await;
        return Err(e.into());
    }
    finish(session).await
}
