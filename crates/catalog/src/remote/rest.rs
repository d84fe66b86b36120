//! `PostgREST`-compatible remote store client.
//!
//! Talks to `{base_url}/rest/v1/{table}` with `reqwest`. The hosted API pushes
//! change notifications over a websocket protocol of its own; this client
//! instead polls each subscribed table and reports a change whenever the
//! SHA-256 digest of its rows differs from the previous poll.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument, warn};
use url::Url;

use coconut_catalog_core::{ChangeKind, Table};

use super::{ChangeEvent, OrderBy, RemoteStore, Row, SettingRecord, StoreError, Subscription};
use crate::config::RemoteConfig;

/// Maximum number of response body characters kept in error messages.
const MAX_ERROR_BODY: usize = 200;

/// Lower bound on the change poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// HTTP [`RemoteStore`] for a `PostgREST` endpoint.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    poll_interval: Duration,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("poll_interval", &self.inner.poll_interval)
            .finish_non_exhaustive()
    }
}

impl RestStore {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &RemoteConfig, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(RestStoreInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                api_key: config.api_key.clone(),
                poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            }),
        }
    }

    /// URL of a table endpoint.
    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        self.inner
            .base_url
            .join(&format!("rest/v1/{}", table.as_str()))
            .map_err(|e| StoreError::Request(format!("invalid table URL: {e}")))
    }

    /// URL of a single row, filtered by `id`.
    fn row_url(&self, table: Table, id: &str) -> Result<Url, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }

    /// Start an authenticated request.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.inner.api_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Send a request and map transport errors and non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Remote store returned non-success status"
        );
        Err(StoreError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    /// Send a write that returns no representation.
    async fn write(&self, request: RequestBuilder) -> Result<(), StoreError> {
        self.send(request.header("Prefer", "return=minimal")).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    #[instrument(skip(self))]
    async fn list(&self, table: Table, order_by: Option<OrderBy>) -> Result<Vec<Row>, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            if let Some(order) = order_by {
                let direction = if order.ascending { "asc" } else { "desc" };
                query.append_pair("order", &format!("{}.{direction}", order.column));
            }
        }

        let response = self.send(self.request(Method::GET, url)).await?;
        let rows: Vec<Row> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        debug!(rows = rows.len(), "Listed remote rows");
        Ok(rows)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        let url = self.table_url(table)?;
        self.write(self.request(Method::POST, url).json(&row)).await
    }

    #[instrument(skip(self, row))]
    async fn update(&self, table: Table, id: &str, row: Row) -> Result<(), StoreError> {
        let url = self.row_url(table, id)?;
        self.write(self.request(Method::PATCH, url).json(&row)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let url = self.row_url(table, id)?;
        self.write(self.request(Method::DELETE, url)).await
    }

    #[instrument(skip(self, record), fields(key = %record.key))]
    async fn upsert(&self, table: Table, record: SettingRecord) -> Result<(), StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", "key");
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&record);
        self.write(request).await
    }

    async fn subscribe(&self, table: Table) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.inner.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_digest: Option<Vec<u8>> = None;

            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }

                let rows = match store.list(table, Some(OrderBy::asc("id"))).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!(%table, error = %e, "Change poll failed");
                        continue;
                    }
                };

                let digest = digest_rows(&rows);
                let changed = last_digest.as_ref().is_some_and(|last| *last != digest);
                last_digest = Some(digest);

                if changed {
                    debug!(%table, "Remote table changed");
                    let event = ChangeEvent {
                        table,
                        kind: ChangeKind::Update,
                        record_id: None,
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        debug!(%table, interval = ?self.inner.poll_interval, "Polling remote table for changes");
        Ok(Subscription::with_task(table, rx, task))
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// SHA-256 over the canonical JSON encoding of `rows`.
fn digest_rows(rows: &[Row]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for row in rows {
        // Map keys are sorted, so the encoding is stable across polls.
        if let Ok(bytes) = serde_json::to_vec(row) {
            hasher.update(&bytes);
        }
        hasher.update(b"\n");
    }
    hasher.finalize().to_vec()
}

/// Extract a readable message from an error body (`{"message": ...}` or raw text).
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            let text: String = body.chars().take(MAX_ERROR_BODY).collect();
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            }
        })
}
