//! Change reconciliation.
//!
//! Subscribes to change notifications for every mirrored table and reloads
//! the [`CatalogStore`] whenever one arrives. Notification payloads are
//! ignored; every change leads to a full reload.
//!
//! Notifications arriving within the coalescing window of the first one are
//! folded into a single reload. A zero window reloads once per notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use coconut_catalog_core::Table;

use crate::error::CatalogError;
use crate::remote::{ChangeEvent, Subscription};
use crate::store::CatalogStore;

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Default)]
pub struct ReconcilerStats {
    notifications: AtomicU64,
    reloads: AtomicU64,
}

impl ReconcilerStats {
    /// Change notifications received.
    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::SeqCst)
    }

    /// Reloads triggered (successful or not).
    #[must_use]
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::SeqCst)
    }
}

/// Keeps a [`CatalogStore`] in sync with remote change notifications.
///
/// Dropping the reconciler stops it; [`dispose`](Self::dispose) also waits
/// for every subscription to be torn down.
#[derive(Debug)]
pub struct ChangeReconciler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<ReconcilerStats>,
}

impl ChangeReconciler {
    /// Subscribe to all mirrored tables and start reconciling.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] if any subscription fails; subscriptions
    /// already made are released.
    pub async fn start(store: CatalogStore, window: Duration) -> Result<Self, CatalogError> {
        let mut subscriptions = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            subscriptions.push(store.remote().subscribe(table).await?);
        }

        let (shutdown, _) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(ReconcilerStats::default());

        let mut tasks: Vec<JoinHandle<()>> = subscriptions
            .into_iter()
            .map(|subscription| {
                tokio::spawn(forward(
                    subscription,
                    events_tx.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();
        drop(events_tx);

        tasks.push(tokio::spawn(drive(
            store,
            events_rx,
            window,
            shutdown.subscribe(),
            Arc::clone(&stats),
        )));

        info!(window = ?window, "Change reconciler started");
        Ok(Self {
            shutdown,
            tasks,
            stats,
        })
    }

    /// Notification and reload counters.
    #[must_use]
    pub fn stats(&self) -> Arc<ReconcilerStats> {
        Arc::clone(&self.stats)
    }

    /// Unsubscribe from every table and wait for the background tasks to stop.
    ///
    /// A reload already in flight is allowed to finish.
    pub async fn dispose(mut self) {
        self.shutdown.send_replace(true);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "Reconciler task ended abnormally");
            }
        }
        info!("Change reconciler stopped");
    }
}

impl Drop for ChangeReconciler {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

/// Relay one table's notifications into the shared channel until shutdown.
async fn forward(
    mut subscription: Subscription,
    events: mpsc::UnboundedSender<ChangeEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let table = subscription.table();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = subscription.next() => match event {
                Some(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                None => {
                    warn!(%table, "Change subscription closed by remote store");
                    break;
                }
            },
        }
    }
    subscription.unsubscribe();
    debug!(%table, "Unsubscribed from changes");
}

/// Reload the store for each burst of notifications.
async fn drive(
    store: CatalogStore,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    window: Duration,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<ReconcilerStats>,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        stats.notifications.fetch_add(1, Ordering::SeqCst);
        debug!(table = %event.table, kind = %event.kind, "Change notification received");

        if !window.is_zero() {
            tokio::select! {
                _ = shutdown.changed() => break,
                () = tokio::time::sleep(window) => {}
            }
            while let Ok(event) = events.try_recv() {
                stats.notifications.fetch_add(1, Ordering::SeqCst);
                debug!(table = %event.table, kind = %event.kind, "Change notification coalesced");
            }
        }

        stats.reloads.fetch_add(1, Ordering::SeqCst);
        // The store logs and records the failure in its status.
        if let Err(e) = store.reload().await {
            debug!(error = %e, "Reconciliation reload failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::SyncOptions;
    use crate::remote::{MemoryStore, RemoteStore, Row};

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    async fn setup(window: Duration) -> (MemoryStore, CatalogStore, ChangeReconciler) {
        let remote = MemoryStore::new();
        let store = CatalogStore::new(Arc::new(remote.clone()), &SyncOptions::default());
        store.reload().await.unwrap();
        let reconciler = ChangeReconciler::start(store.clone(), window).await.unwrap();
        (remote, store, reconciler)
    }

    async fn wait_for_generation(store: &CatalogStore, generation: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.snapshot().generation < generation {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_remote_change_triggers_reload() {
        let (remote, store, reconciler) = setup(Duration::ZERO).await;
        let stats = reconciler.stats();

        remote
            .insert(Table::Collections, row(json!({ "name": "Bowls" })))
            .await
            .unwrap();
        wait_for_generation(&store, 2).await;

        assert_eq!(store.snapshot().collections.len(), 1);
        assert_eq!(stats.notifications(), 1);
        assert_eq!(stats.reloads(), 1);
        reconciler.dispose().await;
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_into_one_reload() {
        let (remote, store, reconciler) = setup(Duration::from_millis(100)).await;
        let stats = reconciler.stats();

        for name in ["Bowls", "Cups", "Spoons"] {
            remote
                .insert(Table::Collections, row(json!({ "name": name })))
                .await
                .unwrap();
        }
        wait_for_generation(&store, 2).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(stats.notifications(), 3);
        assert_eq!(stats.reloads(), 1);
        assert_eq!(store.snapshot().generation, 2);
        assert_eq!(store.snapshot().collections.len(), 3);
        reconciler.dispose().await;
    }

    #[tokio::test]
    async fn test_dispose_unsubscribes_every_table() {
        let (remote, _store, reconciler) = setup(Duration::ZERO).await;
        for table in Table::ALL {
            assert_eq!(remote.subscriber_count(table), 1);
        }

        reconciler.dispose().await;

        for table in Table::ALL {
            assert_eq!(remote.subscriber_count(table), 0);
        }
    }

    #[tokio::test]
    async fn test_failed_reload_is_recorded_in_status() {
        let (remote, store, reconciler) = setup(Duration::ZERO).await;
        let mut status = store.watch_status();

        remote.fail_lists(Some("offline"));
        remote
            .insert(Table::Products, row(json!({ "name": "Loose Bowl", "price": 4 })))
            .await
            .unwrap();

        let failed = tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|status| status.error().is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(failed.error(), Some("Store error: Remote store unavailable: offline"));
        assert_eq!(store.snapshot().generation, 1);
        reconciler.dispose().await;
    }
}
