//! The catalog handle: store, reconciler and mutation proxy with an explicit
//! lifecycle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::config::SyncOptions;
use crate::error::CatalogError;
use crate::mutation::{MutationEvent, MutationProxy};
use crate::reconciler::{ChangeReconciler, ReconcilerStats};
use crate::remote::RemoteStore;
use crate::snapshot::Snapshot;
use crate::store::CatalogStore;

/// A running catalog mirror.
///
/// Created with [`Catalog::create`] and torn down with [`Catalog::dispose`].
#[derive(Debug)]
pub struct Catalog {
    store: CatalogStore,
    mutations: MutationProxy,
    reconciler: ChangeReconciler,
}

impl Catalog {
    /// Subscribe to remote changes and load the initial snapshot.
    ///
    /// A failed initial load does not fail creation: the catalog starts with
    /// an empty snapshot in `Error` status and recovers on the next change or
    /// explicit reload.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] if change subscriptions cannot be set up.
    #[instrument(skip_all, fields(remote = remote.name()))]
    pub async fn create(
        remote: Arc<dyn RemoteStore>,
        options: SyncOptions,
    ) -> Result<Self, CatalogError> {
        let store = CatalogStore::new(remote, &options);
        let reconciler = ChangeReconciler::start(store.clone(), options.coalesce_window).await?;

        if let Err(e) = store.reload().await {
            warn!(error = %e, "Initial catalog load failed");
        }

        let mutations = MutationProxy::new(store.clone());
        info!(status = %store.status(), "Catalog created");
        Ok(Self {
            store,
            mutations,
            reconciler,
        })
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    /// The write proxy.
    #[must_use]
    pub const fn mutations(&self) -> &MutationProxy {
        &self.mutations
    }

    /// Receive an event for every accepted write.
    #[must_use]
    pub fn subscribe_mutations(&self) -> broadcast::Receiver<MutationEvent> {
        self.mutations.subscribe()
    }

    /// Reconciliation counters.
    #[must_use]
    pub fn reconciler_stats(&self) -> Arc<ReconcilerStats> {
        self.reconciler.stats()
    }

    /// Unsubscribe from remote changes and stop background work.
    pub async fn dispose(self) {
        self.reconciler.dispose().await;
        info!("Catalog disposed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use coconut_catalog_core::{StoreStatus, Table};

    use super::*;
    use crate::remote::MemoryStore;

    #[tokio::test]
    async fn test_create_loads_seeded_catalog() {
        let remote = MemoryStore::seeded();
        let catalog = Catalog::create(Arc::new(remote.clone()), SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(catalog.store().status(), StoreStatus::Ready);
        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.collections.len(), 5);
        assert!(!snapshot.products.is_empty());
        assert!(
            snapshot
                .products
                .iter()
                .all(|p| p.collection != coconut_catalog_core::UNKNOWN_COLLECTION)
        );

        catalog.dispose().await;
        assert_eq!(remote.subscriber_count(Table::Products), 0);
    }

    #[tokio::test]
    async fn test_create_survives_failed_initial_load() {
        let remote = MemoryStore::seeded();
        remote.fail_lists(Some("offline"));

        let catalog = Catalog::create(Arc::new(remote.clone()), SyncOptions::default())
            .await
            .unwrap();

        assert!(catalog.store().status().error().is_some());
        assert!(catalog.snapshot().products.is_empty());

        remote.fail_lists(None);
        catalog.store().reload().await.unwrap();
        assert!(!catalog.snapshot().products.is_empty());
        catalog.dispose().await;
    }
}
