//! Deploy build hook notifications.
//!
//! Listens for [`MutationEvent`]s and POSTs to a deploy hook so the static
//! site is rebuilt from the new catalog. Bursts of writes share one POST:
//! after the first event the notifier waits for a settle delay and swallows
//! everything that arrived meanwhile. Hook failures are logged and never
//! reach the code that made the write.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::SyncOptions;
use crate::mutation::MutationEvent;

/// Errors triggering the build hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Build hook request failed: {0}")]
    Request(String),

    #[error("Build hook returned {0}")]
    Status(u16),
}

/// Sends build hook notifications.
#[derive(Debug, Clone)]
pub struct BuildHookNotifier {
    client: Client,
    hook_url: Url,
    delay: Duration,
}

impl BuildHookNotifier {
    /// Create a notifier for `hook_url`.
    #[must_use]
    pub fn new(hook_url: Url, delay: Duration) -> Self {
        Self {
            client: Client::new(),
            hook_url,
            delay,
        }
    }

    /// Create a notifier if a hook URL is configured; otherwise log a warning.
    #[must_use]
    pub fn configured(hook_url: Option<Url>, options: &SyncOptions) -> Option<Self> {
        let Some(hook_url) = hook_url else {
            warn!("Build hook URL not configured, deploys will not be triggered");
            return None;
        };
        Some(Self::new(hook_url, options.build_delay))
    }

    /// POST to the build hook once.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the hook answers with a
    /// non-success status.
    #[instrument(skip(self), fields(host = self.hook_url.host_str().unwrap_or_default()))]
    pub async fn trigger(&self) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.hook_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Build hook rejected the request");
            return Err(NotifyError::Status(status.as_u16()));
        }

        info!("Build triggered");
        Ok(())
    }

    /// Trigger the hook for each burst of mutation events until the channel
    /// closes.
    pub fn spawn(self, mut events: broadcast::Receiver<MutationEvent>) -> JoinHandle<()> {
        info!(delay = ?self.delay, "Build hook notifier started");
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(table = %event.table, kind = %event.kind, "Mutation received");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Mutation events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }

                tokio::time::sleep(self.delay).await;
                let coalesced = drain(&mut events);
                if coalesced > 0 {
                    debug!(coalesced, "Mutations folded into one build");
                }

                if let Err(e) = self.trigger().await {
                    error!(error = %e, "Failed to trigger build");
                }
            }
            info!("Build hook notifier stopped");
        })
    }
}

/// Discard queued events, returning how many there were.
fn drain(events: &mut broadcast::Receiver<MutationEvent>) -> u64 {
    let mut count = 0;
    loop {
        match events.try_recv() {
            Ok(_) => count += 1,
            Err(TryRecvError::Lagged(skipped)) => count += skipped,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use coconut_catalog_core::{ChangeKind, Table};

    use super::*;

    /// Minimal hook endpoint answering every request with `status`.
    async fn hook_server(status: u16) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/hook", listener.local_addr().unwrap())).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = vec![0_u8; 4096];
                    let mut request = Vec::new();
                    loop {
                        let Ok(read) = socket.read(&mut buf).await else {
                            return;
                        };
                        if read == 0 {
                            return;
                        }
                        request.extend_from_slice(&buf[..read]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            counter.fetch_add(1, Ordering::SeqCst);
                            request.clear();
                            let response = format!(
                                "HTTP/1.1 {status} Hook\r\ncontent-length: 0\r\n\r\n"
                            );
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        (url, hits)
    }

    fn event() -> MutationEvent {
        MutationEvent {
            table: Table::Products,
            kind: ChangeKind::Insert,
            record_id: None,
        }
    }

    #[test]
    fn test_not_configured_without_url() {
        assert!(BuildHookNotifier::configured(None, &SyncOptions::default()).is_none());
    }

    #[tokio::test]
    async fn test_trigger_success_and_failure() {
        let (url, hits) = hook_server(200).await;
        let notifier = BuildHookNotifier::new(url, Duration::ZERO);
        notifier.trigger().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let (url, _) = hook_server(500).await;
        let notifier = BuildHookNotifier::new(url, Duration::ZERO);
        assert_eq!(notifier.trigger().await, Err(NotifyError::Status(500)));
    }

    #[tokio::test]
    async fn test_unreachable_hook_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/hook", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let notifier = BuildHookNotifier::new(url, Duration::ZERO);
        assert!(matches!(
            notifier.trigger().await,
            Err(NotifyError::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_burst_triggers_one_build() {
        let (url, hits) = hook_server(200).await;
        let (tx, rx) = broadcast::channel(16);
        let handle = BuildHookNotifier::new(url, Duration::from_millis(50)).spawn(rx);

        for _ in 0..3 {
            tx.send(event()).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(tx);
        handle.await.unwrap();
    }
}
