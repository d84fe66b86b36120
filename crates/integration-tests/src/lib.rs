//! Integration tests for Coconut Catalog.
//!
//! Tests run the full catalog (store, reconciler, mutation proxy and build
//! hook notifier) against [`MemoryStore`], so no external services are
//! needed.
//!
//! ```bash
//! cargo test -p coconut-catalog-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog_queries` - Denormalization and query results on loaded snapshots
//! - `catalog_mutations` - Write validation and build hook notifications
//! - `catalog_sync` - Reload serialization and change reconciliation

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use coconut_catalog::remote::Row;
use coconut_catalog::{MemoryStore, SyncOptions};
use coconut_catalog_core::Table;

/// How long helpers wait for background work before giving up.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Sync options with short windows so tests settle quickly.
#[must_use]
pub fn fast_options() -> SyncOptions {
    SyncOptions {
        reload_timeout: Duration::from_secs(2),
        coalesce_window: Duration::from_millis(20),
        poll_interval: Duration::from_millis(50),
        build_delay: Duration::from_millis(50),
    }
}

/// A raw `collections` row.
#[must_use]
pub fn collection_row(id: &str, name: &str) -> Row {
    row(json!({
        "id": id,
        "name": name,
        "description": format!("{name} collection"),
        "image": "",
        "created_at": "2024-01-01T00:00:00Z",
    }))
}

/// A raw `products` row.
#[must_use]
pub fn product_row(
    id: &str,
    name: &str,
    price: &str,
    collection_id: &str,
    featured: bool,
    created_at: &str,
) -> Row {
    row(json!({
        "id": id,
        "name": name,
        "price": price,
        "description": "",
        "image": "",
        "collection_id": collection_id,
        "featured": featured,
        "created_at": created_at,
    }))
}

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// A store with one `Bowls` collection (`c1`) holding `Coconut Bowl` (10.00)
/// and `Coconut Cup` (5.00).
#[must_use]
pub fn bowls_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.load_rows(Table::Collections, vec![collection_row("c1", "Bowls")]);
    store.load_rows(
        Table::Products,
        vec![
            product_row("p1", "Coconut Bowl", "10.00", "c1", true, "2024-01-02T00:00:00Z"),
            product_row("p2", "Coconut Cup", "5.00", "c1", false, "2024-01-03T00:00:00Z"),
        ],
    );
    store
}

/// Poll `condition` until it holds or [`WAIT_LIMIT`] passes.
///
/// Returns whether the condition was met.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// A local build hook endpoint answering every request with `200 OK`.
///
/// Returns the hook URL and a counter of requests received.
///
/// # Errors
///
/// Returns error if the listener cannot be bound.
pub async fn hook_server() -> std::io::Result<(Url, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = Url::parse(&format!("http://{}/hook", listener.local_addr()?))
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let mut buf = vec![0_u8; 4096];
                let mut request = Vec::new();
                while let Ok(read) = socket.read(&mut buf).await {
                    if read == 0 {
                        return;
                    }
                    request.extend_from_slice(buf.get(..read).unwrap_or_default());
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        counter.fetch_add(1, Ordering::SeqCst);
                        request.clear();
                        let response = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";
                        if socket.write_all(response).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    Ok((url, hits))
}
