//! Remote store access.
//!
//! # Architecture
//!
//! - The remote store is the single source of truth; the catalog only mirrors it
//! - Rows travel as JSON objects, decoded into typed rows by the catalog
//! - Change notifications are delivered at least once and carry no payload the
//!   catalog relies on; duplicates and reordering are harmless
//!
//! # Implementations
//!
//! - [`MemoryStore`] - in-process tables with push notifications (tests, demo mode)
//! - [`RestStore`] - `PostgREST`-compatible HTTP API with polled change detection

mod memory;
mod rest;
pub mod rows;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use coconut_catalog_core::{ChangeKind, Table};

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use rows::SettingRecord;

/// A raw remote row.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors reported by a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transport-level failure.
    #[error("Remote store request failed: {0}")]
    Request(String),

    /// The remote store rejected the request.
    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response could not be decoded.
    #[error("Invalid remote store response: {0}")]
    Decode(String),

    /// The remote store is unavailable.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

/// Column ordering for [`RemoteStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    /// Ascending order on `column`.
    #[must_use]
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    /// Descending order on `column`.
    #[must_use]
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// A change notification for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// Affected row ID, when the store knows it.
    pub record_id: Option<String>,
}

/// A live change-notification subscription for one table.
///
/// Dropping the subscription or calling [`Subscription::unsubscribe`] stops
/// delivery and any background task feeding it.
#[derive(Debug)]
pub struct Subscription {
    table: Table,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription fed by a channel the store pushes into.
    #[must_use]
    pub const fn new(table: Table, events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self {
            table,
            events,
            task: None,
        }
    }

    /// Subscription fed by a background task owned by the subscription.
    #[must_use]
    pub const fn with_task(
        table: Table,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            table,
            events,
            task: Some(task),
        }
    }

    /// The watched table.
    #[must_use]
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next change. Returns `None` once the store stops delivering.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Row-level access to the remote catalog tables.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every row of `table`, optionally ordered.
    async fn list(&self, table: Table, order_by: Option<OrderBy>) -> Result<Vec<Row>, StoreError>;

    /// Insert a row. The store assigns `id` and timestamps.
    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError>;

    /// Update the listed columns of the row with this `id`.
    async fn update(&self, table: Table, id: &str, row: Row) -> Result<(), StoreError>;

    /// Delete the row with this `id`.
    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;

    /// Insert or replace a keyed settings record.
    async fn upsert(&self, table: Table, record: SettingRecord) -> Result<(), StoreError>;

    /// Subscribe to inserts, updates and deletes on `table`.
    async fn subscribe(&self, table: Table) -> Result<Subscription, StoreError>;

    /// Backend identifier for logging.
    fn name(&self) -> &'static str;
}
