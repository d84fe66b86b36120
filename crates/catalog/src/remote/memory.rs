//! In-process remote store.
//!
//! Behaves like the hosted tables the catalog mirrors: assigns UUID ids and
//! timestamps, enforces unique collection names and the product -> collection
//! foreign key, cascades collection deletes to their products and pushes a
//! change event to every subscriber of each affected table.
//!
//! Used by tests (with fault and latency injection) and by demo mode.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use uuid::Uuid;

use coconut_catalog_core::{ChangeKind, Table};

use super::{ChangeEvent, OrderBy, RemoteStore, Row, SettingRecord, StoreError, Subscription};

/// In-memory [`RemoteStore`].
///
/// Cheaply cloneable; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    subscribers: Mutex<HashMap<Table, Vec<mpsc::UnboundedSender<ChangeEvent>>>>,
    faults: Mutex<Faults>,
    lists: AtomicUsize,
    writes: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    list_error: Option<String>,
    write_error: Option<String>,
    list_delay: Duration,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = lock(&self.inner.tables);
        let mut debug = f.debug_struct("MemoryStore");
        for table in Table::ALL {
            debug.field(table.as_str(), &tables.get(&table).map_or(0, Vec::len));
        }
        debug.finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the demo catalog.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::new();
        store.load_rows(Table::Collections, crate::seed::collection_rows());
        store.load_rows(Table::Products, crate::seed::product_rows());
        store.load_rows(Table::SiteSettings, crate::seed::setting_rows());
        store
    }

    /// Append rows directly, without constraint checks or notifications.
    ///
    /// Missing `id` and `created_at` columns are filled in.
    pub fn load_rows(&self, table: Table, rows: Vec<Row>) {
        let now = timestamp();
        let mut tables = lock(&self.inner.tables);
        let target = tables.entry(table).or_default();
        for mut row in rows {
            row.entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            row.entry("created_at")
                .or_insert_with(|| Value::String(now.clone()));
            target.push(row);
        }
    }

    /// Current rows of `table`, in insertion order.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        lock(&self.inner.tables)
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every subsequent `list` fail with `message` (or succeed again with `None`).
    pub fn fail_lists(&self, message: Option<&str>) {
        lock(&self.inner.faults).list_error = message.map(str::to_owned);
    }

    /// Make every subsequent write fail with `message` (or succeed again with `None`).
    pub fn fail_writes(&self, message: Option<&str>) {
        lock(&self.inner.faults).write_error = message.map(str::to_owned);
    }

    /// Delay every subsequent `list` call.
    pub fn set_list_delay(&self, delay: Duration) {
        lock(&self.inner.faults).list_delay = delay;
    }

    /// Number of `list` calls made so far.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.inner.lists.load(Ordering::SeqCst)
    }

    /// Number of write calls (insert, update, delete, upsert) made so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Number of open subscriptions on `table`.
    #[must_use]
    pub fn subscriber_count(&self, table: Table) -> usize {
        lock(&self.inner.subscribers)
            .get(&table)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.faults)
            .write_error
            .clone()
            .map_or(Ok(()), |message| Err(StoreError::Unavailable(message)))
    }

    fn notify(&self, table: Table, kind: ChangeKind, record_id: Option<String>) {
        let event = ChangeEvent {
            table,
            kind,
            record_id,
        };
        let mut subscribers = lock(&self.inner.subscribers);
        if let Some(senders) = subscribers.get_mut(&table) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            debug!(%table, %kind, subscribers = senders.len(), "Change notification sent");
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    #[instrument(skip(self))]
    async fn list(&self, table: Table, order_by: Option<OrderBy>) -> Result<Vec<Row>, StoreError> {
        self.inner.lists.fetch_add(1, Ordering::SeqCst);
        let (delay, error) = {
            let faults = lock(&self.inner.faults);
            (faults.list_delay, faults.list_error.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = error {
            return Err(StoreError::Unavailable(message));
        }

        let mut rows = self.rows(table);
        if let Some(order) = order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(order.column), b.get(order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, mut row: Row) -> Result<(), StoreError> {
        self.begin_write()?;

        let now = timestamp();
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        row.insert("id".to_string(), Value::String(id.clone()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(now.clone()));
        row.insert("updated_at".to_string(), Value::String(now));

        {
            let mut tables = lock(&self.inner.tables);
            check_constraints(&tables, table, &row, None)?;
            tables.entry(table).or_default().push(row);
        }

        self.notify(table, ChangeKind::Insert, Some(id));
        Ok(())
    }

    #[instrument(skip(self, row))]
    async fn update(&self, table: Table, id: &str, row: Row) -> Result<(), StoreError> {
        self.begin_write()?;

        {
            let mut tables = lock(&self.inner.tables);
            let Some(mut merged) = tables
                .get(&table)
                .and_then(|rows| rows.iter().find(|r| row_id(r) == Some(id)))
                .cloned()
            else {
                // Matches no rows: accepted, nothing changes.
                return Ok(());
            };

            for (column, value) in row {
                if column != "id" {
                    merged.insert(column, value);
                }
            }
            merged.insert("updated_at".to_string(), Value::String(timestamp()));
            check_constraints(&tables, table, &merged, Some(id))?;

            if let Some(slot) = tables
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            {
                *slot = merged;
            }
        }

        self.notify(table, ChangeKind::Update, Some(id.to_string()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.begin_write()?;

        let mut cascaded = Vec::new();
        let removed = {
            let mut tables = lock(&self.inner.tables);
            let removed = tables.get_mut(&table).is_some_and(|rows| {
                let before = rows.len();
                rows.retain(|r| row_id(r) != Some(id));
                rows.len() != before
            });

            if removed
                && table == Table::Collections
                && let Some(products) = tables.get_mut(&Table::Products)
            {
                products.retain(|r| {
                    let belongs = r.get("collection_id").and_then(Value::as_str) == Some(id);
                    if belongs && let Some(product_id) = row_id(r) {
                        cascaded.push(product_id.to_owned());
                    }
                    !belongs
                });
            }
            removed
        };

        if removed {
            self.notify(table, ChangeKind::Delete, Some(id.to_string()));
            for product_id in cascaded {
                self.notify(Table::Products, ChangeKind::Delete, Some(product_id));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, record), fields(key = %record.key))]
    async fn upsert(&self, table: Table, record: SettingRecord) -> Result<(), StoreError> {
        self.begin_write()?;

        let now = timestamp();
        let (kind, id) = {
            let mut tables = lock(&self.inner.tables);
            let rows = tables.entry(table).or_default();
            let existing = rows
                .iter_mut()
                .find(|r| r.get("key").and_then(Value::as_str) == Some(record.key.as_str()));

            if let Some(existing) = existing {
                existing.insert("value".to_string(), record.value);
                existing.insert("updated_at".to_string(), Value::String(now));
                (ChangeKind::Update, row_id(existing).map(str::to_owned))
            } else {
                let id = Uuid::new_v4().to_string();
                let mut row = Row::new();
                row.insert("id".to_string(), Value::String(id.clone()));
                row.insert("key".to_string(), Value::String(record.key));
                row.insert("value".to_string(), record.value);
                row.insert("created_at".to_string(), Value::String(now.clone()));
                row.insert("updated_at".to_string(), Value::String(now));
                rows.push(row);
                (ChangeKind::Insert, Some(id))
            }
        };

        self.notify(table, kind, id);
        Ok(())
    }

    async fn subscribe(&self, table: Table) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.subscribers)
            .entry(table)
            .or_default()
            .push(tx);
        debug!(%table, "Subscribed to memory store changes");
        Ok(Subscription::new(table, rx))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Order JSON column values: missing/null first, then numbers, strings or
/// booleans compared within their own kind.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => CmpOrdering::Equal,
        (None | Some(Value::Null), _) => CmpOrdering::Less,
        (_, None | Some(Value::Null)) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

/// Enforce the remote schema's unique and foreign-key constraints.
fn check_constraints(
    tables: &HashMap<Table, Vec<Row>>,
    table: Table,
    row: &Row,
    existing_id: Option<&str>,
) -> Result<(), StoreError> {
    let others = |t: Table| {
        tables
            .get(&t)
            .into_iter()
            .flatten()
            .filter(move |r| existing_id.is_none() || row_id(r) != existing_id)
    };

    match table {
        Table::Collections => {
            let name = row.get("name").and_then(Value::as_str);
            if name.is_some()
                && others(Table::Collections).any(|r| r.get("name").and_then(Value::as_str) == name)
            {
                return Err(StoreError::Status {
                    status: 409,
                    message: "duplicate key value violates unique constraint \"collections_name_key\""
                        .to_string(),
                });
            }
        }
        Table::Products => {
            if let Some(collection_id) = row.get("collection_id").and_then(Value::as_str) {
                let exists = tables
                    .get(&Table::Collections)
                    .is_some_and(|rows| rows.iter().any(|r| row_id(r) == Some(collection_id)));
                if !exists {
                    return Err(StoreError::Status {
                        status: 409,
                        message: "insert or update on table \"products\" violates foreign key \
                                  constraint \"products_collection_id_fkey\""
                            .to_string(),
                    });
                }
            }
        }
        Table::SiteSettings => {}
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_notifies() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe(Table::Collections).await.unwrap();

        store
            .insert(Table::Collections, row(json!({ "name": "Bowls" })))
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.table, Table::Collections);
        assert_eq!(event.kind, ChangeKind::Insert);

        let rows = store.rows(Table::Collections);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id").and_then(Value::as_str), event.record_id.as_deref());
        assert!(rows[0].contains_key("created_at"));
    }

    #[tokio::test]
    async fn test_list_orders_rows() {
        let store = MemoryStore::new();
        store.load_rows(
            Table::Collections,
            vec![
                row(json!({ "id": "c2", "name": "Planters" })),
                row(json!({ "id": "c1", "name": "Bowls" })),
            ],
        );

        let asc = store
            .list(Table::Collections, Some(OrderBy::asc("name")))
            .await
            .unwrap();
        assert_eq!(asc[0]["name"], "Bowls");

        let desc = store
            .list(Table::Collections, Some(OrderBy::desc("name")))
            .await
            .unwrap();
        assert_eq!(desc[0]["name"], "Planters");
    }

    #[tokio::test]
    async fn test_duplicate_collection_name_rejected() {
        let store = MemoryStore::new();
        store.load_rows(Table::Collections, vec![row(json!({ "id": "c1", "name": "Bowls" }))]);

        let err = store
            .insert(Table::Collections, row(json!({ "name": "Bowls" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_delete_collection_cascades_to_products() {
        let store = MemoryStore::new();
        store.load_rows(Table::Collections, vec![row(json!({ "id": "c1", "name": "Bowls" }))]);
        store.load_rows(
            Table::Products,
            vec![
                row(json!({ "id": "p1", "name": "Bowl", "price": 10, "collection_id": "c1" })),
                row(json!({ "id": "p2", "name": "Cup", "price": 5, "collection_id": "c1" })),
            ],
        );
        let mut products = store.subscribe(Table::Products).await.unwrap();

        store.delete(Table::Collections, "c1").await.unwrap();

        assert!(store.rows(Table::Collections).is_empty());
        assert!(store.rows(Table::Products).is_empty());
        assert_eq!(products.next().await.unwrap().kind, ChangeKind::Delete);
        assert_eq!(products.next().await.unwrap().kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_key() {
        let store = MemoryStore::new();
        for tagline in ["first", "second"] {
            store
                .upsert(
                    Table::SiteSettings,
                    SettingRecord {
                        key: "brand_settings".to_string(),
                        value: json!({ "tagline": tagline }),
                    },
                )
                .await
                .unwrap();
        }

        let rows = store.rows(Table::SiteSettings);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["value"]["tagline"], "second");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_accepted() {
        let store = MemoryStore::new();
        store
            .update(Table::Products, "missing", row(json!({ "name": "x" })))
            .await
            .unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.fail_lists(Some("offline"));
        let err = store.list(Table::Products, None).await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable("offline".to_string()));

        store.fail_lists(None);
        assert!(store.list(Table::Products, None).await.is_ok());
        assert_eq!(store.list_count(), 2);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let store = MemoryStore::new();
        let subscription = store.subscribe(Table::Products).await.unwrap();
        assert_eq!(store.subscriber_count(Table::Products), 1);
        subscription.unsubscribe();
        assert_eq!(store.subscriber_count(Table::Products), 0);
    }
}
