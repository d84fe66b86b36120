//! CLI command implementations.

pub mod manage;
pub mod query;
pub mod watch;

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use coconut_catalog::config::build_hook_url_from_env;
use coconut_catalog::{
    BuildHookNotifier, Catalog, CatalogConfig, CatalogError, ConfigError, MemoryStore,
    NotifyError, RemoteStore, RestStore, Snapshot, SyncOptions,
};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The catalog rejected or failed an operation.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// The build hook could not be triggered.
    #[error("{0}")]
    Notify(#[from] NotifyError),

    /// The catalog could not be loaded.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// No record with the given ID.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required setting is absent.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An open catalog plus the optional build hook task fed by its mutations.
pub struct Session {
    catalog: Catalog,
    notifier: Option<JoinHandle<()>>,
}

impl Session {
    /// Open the demo or remote catalog.
    ///
    /// With `notify` set, a build hook notifier is attached to the mutation
    /// stream when `CATALOG_BUILD_HOOK_URL` is configured.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is missing or invalid, or the change
    /// subscriptions cannot be set up.
    pub async fn open(demo: bool, notify: bool) -> Result<Self, CommandError> {
        dotenvy::dotenv().ok();

        let (remote, sync): (Arc<dyn RemoteStore>, SyncOptions) = if demo {
            info!("Using the built-in demo catalog");
            (Arc::new(MemoryStore::seeded()), SyncOptions::from_env()?)
        } else {
            let config = CatalogConfig::from_env()?;
            let remote = RestStore::new(&config.remote, config.sync.poll_interval);
            (Arc::new(remote), config.sync)
        };

        let catalog = Catalog::create(remote, sync).await?;

        let notifier = if notify {
            BuildHookNotifier::configured(build_hook_url_from_env()?, &sync)
                .map(|notifier| notifier.spawn(catalog.subscribe_mutations()))
        } else {
            None
        };

        Ok(Self { catalog, notifier })
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The current snapshot, or an error if the initial load failed.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, CommandError> {
        if let Some(message) = self.catalog.store().status().error() {
            return Err(CommandError::Unavailable(message.to_string()));
        }
        Ok(self.catalog.snapshot())
    }

    /// Dispose the catalog and wait for any pending build hook.
    pub async fn close(self) {
        self.catalog.dispose().await;
        if let Some(handle) = self.notifier
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Build hook notifier task failed");
        }
    }
}
