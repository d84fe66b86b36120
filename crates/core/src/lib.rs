//! Coconut Catalog Core - Shared types library.
//!
//! This crate provides the domain types used across all Coconut Catalog components:
//! - `coconut-catalog` - In-memory catalog mirror, queries and mutations
//! - `cli` - Command-line browsing and administration
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no remote store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, catalog entities, patches and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
