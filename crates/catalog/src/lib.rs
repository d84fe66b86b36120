//! Coconut Catalog synchronization core.
//!
//! Keeps an in-memory mirror of a remote catalog (collections, products and
//! site settings), answers queries against it and proxies writes back.
//!
//! # Architecture
//!
//! - [`RemoteStore`] - row-level access and change subscriptions ([`MemoryStore`], [`RestStore`])
//! - [`CatalogStore`] - snapshot ownership, denormalization and serialized reloads
//! - [`ChangeReconciler`] - reloads the store when the remote reports changes
//! - [`Snapshot`] queries - lookups, collection filters, search and sorting
//! - [`MutationProxy`] - validated writes, announced as [`MutationEvent`]s
//! - [`BuildHookNotifier`] - deploy hook triggered by mutation events
//!
//! [`Catalog`] ties the pieces together with an explicit create/dispose
//! lifecycle.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod catalog;
pub mod config;
pub mod error;
pub mod mutation;
pub mod notifier;
pub mod query;
pub mod reconciler;
pub mod remote;
pub mod seed;
pub mod snapshot;
pub mod store;

pub use catalog::Catalog;
pub use config::{CatalogConfig, ConfigError, RemoteConfig, SyncOptions};
pub use error::CatalogError;
pub use mutation::{MutationEvent, MutationProxy};
pub use notifier::{BuildHookNotifier, NotifyError};
pub use query::{CatalogStats, CollectionSummary, RELATED_PRODUCTS_LIMIT};
pub use reconciler::{ChangeReconciler, ReconcilerStats};
pub use remote::{MemoryStore, RemoteStore, RestStore, StoreError};
pub use snapshot::Snapshot;
pub use store::CatalogStore;

pub use coconut_catalog_core as types;
