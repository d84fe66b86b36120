//! Write-side proxy to the remote store.
//!
//! Translates catalog intents into remote row writes. Collection names are
//! resolved to collection IDs against the current snapshot before anything is
//! written. The mirror itself is never touched: a successful call means the
//! remote store accepted the write, and the change becomes visible once the
//! resulting notification has been reconciled.
//!
//! Every accepted write is announced as a [`MutationEvent`] on a broadcast
//! channel for listeners such as the build hook notifier.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use coconut_catalog_core::{
    BrandPatch, BrandSettings, ChangeKind, CollectionId, CollectionPatch, HeroProduct,
    NewCollection, NewProduct, Price, ProductId, ProductPatch, Table,
};

use crate::error::CatalogError;
use crate::remote::rows::{BRAND_SETTINGS_KEY, HERO_PRODUCT_KEY};
use crate::remote::{Row, SettingRecord, StoreError};
use crate::store::CatalogStore;

const EVENT_CAPACITY: usize = 64;

/// A write accepted by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// The written row's ID (or settings key), when known before the write.
    pub record_id: Option<String>,
}

/// Proxies catalog writes to the remote store.
///
/// Cheaply cloneable; clones share the event channel.
#[derive(Debug, Clone)]
pub struct MutationProxy {
    store: CatalogStore,
    events: broadcast::Sender<MutationEvent>,
}

impl MutationProxy {
    /// Create a proxy writing through `store`'s remote.
    #[must_use]
    pub fn new(store: CatalogStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { store, events }
    }

    /// Receive an event for every accepted write.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product in the named collection.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CollectionNotFound`] without writing if the
    /// collection is not in the current snapshot, or the store's error.
    #[instrument(skip(self, product), fields(name = %product.name, collection = %product.collection))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), CatalogError> {
        let collection_id = self.resolve_collection(&product.collection)?;

        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(product.name.as_str()));
        row.insert("price".to_string(), price_value(product.price));
        row.insert("description".to_string(), Value::from(product.description.as_str()));
        row.insert("image".to_string(), Value::from(product.image.as_str()));
        row.insert("collection_id".to_string(), Value::from(collection_id.into_inner()));
        row.insert("featured".to_string(), Value::Bool(product.featured));

        let result = self.store.remote().insert(Table::Products, row).await;
        self.finish(Table::Products, ChangeKind::Insert, None, result)
    }

    /// Update the fields present in `patch`.
    ///
    /// An empty patch is accepted without contacting the remote store.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CollectionNotFound`] without writing if the
    /// patch names a collection absent from the current snapshot, or the
    /// store's error.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError> {
        if patch.is_empty() {
            debug!("Empty product patch, nothing to write");
            return Ok(());
        }

        let collection_id = patch
            .collection
            .as_deref()
            .map(|name| self.resolve_collection(name))
            .transpose()?;

        let mut row = Row::new();
        if let Some(name) = &patch.name {
            row.insert("name".to_string(), Value::from(name.as_str()));
        }
        if let Some(price) = patch.price {
            row.insert("price".to_string(), price_value(price));
        }
        if let Some(description) = &patch.description {
            row.insert("description".to_string(), Value::from(description.as_str()));
        }
        if let Some(image) = &patch.image {
            row.insert("image".to_string(), Value::from(image.as_str()));
        }
        if let Some(collection_id) = collection_id {
            row.insert("collection_id".to_string(), Value::from(collection_id.into_inner()));
        }
        if let Some(featured) = patch.featured {
            row.insert("featured".to_string(), Value::Bool(featured));
        }

        let result = self
            .store
            .remote()
            .update(Table::Products, id.as_str(), row)
            .await;
        self.finish(Table::Products, ChangeKind::Update, Some(id.to_string()), result)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError> {
        let result = self.store.remote().delete(Table::Products, id.as_str()).await;
        self.finish(Table::Products, ChangeKind::Delete, Some(id.to_string()), result)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Returns the store's error (e.g. a duplicate name).
    #[instrument(skip(self, collection), fields(name = %collection.name))]
    pub async fn add_collection(&self, collection: &NewCollection) -> Result<(), CatalogError> {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(collection.name.as_str()));
        row.insert("description".to_string(), Value::from(collection.description.as_str()));
        row.insert("image".to_string(), Value::from(collection.image.as_str()));

        let result = self.store.remote().insert(Table::Collections, row).await;
        self.finish(Table::Collections, ChangeKind::Insert, None, result)
    }

    /// Update the fields present in `patch`.
    ///
    /// An empty patch is accepted without contacting the remote store.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[instrument(skip(self, patch), fields(collection_id = %id))]
    pub async fn update_collection(
        &self,
        id: &CollectionId,
        patch: &CollectionPatch,
    ) -> Result<(), CatalogError> {
        if patch.is_empty() {
            debug!("Empty collection patch, nothing to write");
            return Ok(());
        }

        let mut row = Row::new();
        if let Some(name) = &patch.name {
            row.insert("name".to_string(), Value::from(name.as_str()));
        }
        if let Some(description) = &patch.description {
            row.insert("description".to_string(), Value::from(description.as_str()));
        }
        if let Some(image) = &patch.image {
            row.insert("image".to_string(), Value::from(image.as_str()));
        }

        let result = self
            .store
            .remote()
            .update(Table::Collections, id.as_str(), row)
            .await;
        self.finish(Table::Collections, ChangeKind::Update, Some(id.to_string()), result)
    }

    /// Delete a collection. The remote store cascades the delete to the
    /// collection's products.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[instrument(skip(self), fields(collection_id = %id))]
    pub async fn delete_collection(&self, id: &CollectionId) -> Result<(), CatalogError> {
        let affected = self.store.snapshot().products_in_collection_id(id).len();
        if affected > 0 {
            info!(products = affected, "Collection delete will cascade to products");
        }

        let result = self
            .store
            .remote()
            .delete(Table::Collections, id.as_str())
            .await;
        self.finish(Table::Collections, ChangeKind::Delete, Some(id.to_string()), result)
    }

    // =========================================================================
    // Site settings
    // =========================================================================

    /// Replace the hero banner.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[instrument(skip(self, hero), fields(title = %hero.title))]
    pub async fn update_hero_product(&self, hero: &HeroProduct) -> Result<(), CatalogError> {
        let record = setting_record(HERO_PRODUCT_KEY, hero)?;
        let result = self.store.remote().upsert(Table::SiteSettings, record).await;
        self.finish(
            Table::SiteSettings,
            ChangeKind::Upsert,
            Some(HERO_PRODUCT_KEY.to_string()),
            result,
        )
    }

    /// Merge brand name and tagline over the current values.
    ///
    /// A patch with neither field is accepted without writing.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[instrument(skip(self, patch))]
    pub async fn update_site_settings(&self, patch: &BrandPatch) -> Result<(), CatalogError> {
        if patch.is_empty() {
            debug!("Empty brand patch, nothing to write");
            return Ok(());
        }

        let current = self.store.snapshot().site_settings.brand();
        let brand = BrandSettings {
            brand_name: patch.brand_name.clone().unwrap_or(current.brand_name),
            tagline: patch.tagline.clone().unwrap_or(current.tagline),
        };

        let record = setting_record(BRAND_SETTINGS_KEY, &brand)?;
        let result = self.store.remote().upsert(Table::SiteSettings, record).await;
        self.finish(
            Table::SiteSettings,
            ChangeKind::Upsert,
            Some(BRAND_SETTINGS_KEY.to_string()),
            result,
        )
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Resolve a collection name (exact match) to its ID in the current snapshot.
    fn resolve_collection(&self, name: &str) -> Result<CollectionId, CatalogError> {
        self.store
            .snapshot()
            .collection_by_name(name)
            .map(|collection| collection.id.clone())
            .ok_or_else(|| {
                warn!(collection = %name, "Collection not found in snapshot");
                CatalogError::CollectionNotFound(name.to_string())
            })
    }

    /// Log the outcome and announce accepted writes.
    fn finish(
        &self,
        table: Table,
        kind: ChangeKind,
        record_id: Option<String>,
        result: Result<(), StoreError>,
    ) -> Result<(), CatalogError> {
        if let Err(e) = result {
            error!(%table, %kind, error = %e, "Catalog mutation failed");
            return Err(e.into());
        }

        info!(%table, %kind, record_id = ?record_id, "Catalog mutation accepted");
        let event = MutationEvent {
            table,
            kind,
            record_id,
        };
        if self.events.send(event).is_err() {
            debug!("No mutation listeners");
        }
        Ok(())
    }
}

fn price_value(price: Price) -> Value {
    Value::String(price.amount().to_string())
}

fn setting_record<T: Serialize>(key: &str, value: &T) -> Result<SettingRecord, CatalogError> {
    let value = serde_json::to_value(value).map_err(|e| CatalogError::Decode {
        table: Table::SiteSettings,
        message: e.to_string(),
    })?;
    Ok(SettingRecord {
        key: key.to_string(),
        value,
    })
}
