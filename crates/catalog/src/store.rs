//! The in-memory catalog mirror.
//!
//! The store starts with an empty snapshot. Each [`CatalogStore::reload`]
//! fetches collections, then products, then settings, builds a new
//! [`Snapshot`] and swaps it in atomically. Readers holding the previous
//! `Arc<Snapshot>` keep a consistent view.
//!
//! Reloads are serialized: a reload requested while another is in flight
//! waits for it and then runs its own fetch sequence, so the snapshot always
//! comes from the reload that completed last and is never a mix of two.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument};

use coconut_catalog_core::{StoreStatus, Table};

use crate::config::SyncOptions;
use crate::error::CatalogError;
use crate::remote::{OrderBy, RemoteStore};
use crate::snapshot::Snapshot;

/// Handle to the catalog mirror.
///
/// Cheaply cloneable via `Arc`; clones share the same snapshot.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    remote: Arc<dyn RemoteStore>,
    snapshot: RwLock<Arc<Snapshot>>,
    status: watch::Sender<StoreStatus>,
    reload_lock: Mutex<()>,
    reload_timeout: Duration,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CatalogStore")
            .field("remote", &self.inner.remote.name())
            .field("status", &*self.inner.status.borrow())
            .field("generation", &snapshot.generation)
            .field("products", &snapshot.products.len())
            .finish_non_exhaustive()
    }
}

impl CatalogStore {
    /// Create a store with an empty snapshot. Call [`reload`](Self::reload)
    /// to populate it.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, options: &SyncOptions) -> Self {
        let (status, _) = watch::channel(StoreStatus::Uninitialized);
        Self {
            inner: Arc::new(StoreInner {
                remote,
                snapshot: RwLock::new(Arc::new(Snapshot::empty())),
                status,
                reload_lock: Mutex::new(()),
                reload_timeout: options.reload_timeout,
            }),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.inner.status.borrow().clone()
    }

    /// Receive every status change.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<StoreStatus> {
        self.inner.status.subscribe()
    }

    /// Wait until the status is `Ready` or `Error` and return it.
    ///
    /// Returns immediately if the last reload has already finished.
    pub async fn wait_until_settled(&self) -> StoreStatus {
        let mut status = self.watch_status();
        // The sender lives as long as `self`, so this only fails on shutdown.
        let settled = status.wait_for(StoreStatus::is_settled).await;
        settled.map_or_else(|_| self.status(), |status| status.clone())
    }

    /// The remote store this mirror reads from.
    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.inner.remote
    }

    /// Rebuild the snapshot from the remote store.
    ///
    /// On failure the previous snapshot is kept and the status becomes
    /// `Error` with the failure message.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decode error, or [`CatalogError::Timeout`] if the
    /// fetch sequence exceeds the configured reload timeout.
    #[instrument(skip(self), fields(remote = self.inner.remote.name()))]
    pub async fn reload(&self) -> Result<Arc<Snapshot>, CatalogError> {
        let _guard = self.inner.reload_lock.lock().await;
        self.inner.status.send_replace(StoreStatus::Loading);

        let generation = self.snapshot().generation + 1;
        let timeout = self.inner.reload_timeout;
        let result = tokio::time::timeout(timeout, self.fetch(generation))
            .await
            .unwrap_or(Err(CatalogError::Timeout(timeout)));

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self
                    .inner
                    .snapshot
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
                self.inner.status.send_replace(StoreStatus::Ready);
                info!(
                    generation,
                    collections = snapshot.collections.len(),
                    products = snapshot.products.len(),
                    "Catalog reloaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(generation, error = %e, "Catalog reload failed");
                self.inner
                    .status
                    .send_replace(StoreStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Fetch all three tables in dependency order and build a snapshot.
    async fn fetch(&self, generation: u64) -> Result<Snapshot, CatalogError> {
        let remote = &self.inner.remote;

        let collections = remote
            .list(Table::Collections, Some(OrderBy::asc("name")))
            .await?;
        let products = remote
            .list(Table::Products, Some(OrderBy::desc("created_at")))
            .await?;
        let settings = remote.list(Table::SiteSettings, None).await?;
        debug!(
            collections = collections.len(),
            products = products.len(),
            settings = settings.len(),
            "Fetched remote rows"
        );

        Ok(Snapshot::build(collections, products, settings, generation))
    }
}
