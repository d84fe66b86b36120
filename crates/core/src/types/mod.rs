//! Core types for Coconut Catalog.
//!
//! This module provides type-safe wrappers and entities for the catalog domain.

pub mod catalog;
pub mod id;
pub mod patch;
pub mod price;
pub mod query;
pub mod status;

pub use catalog::{
    BrandSettings, Collection, HeroProduct, Product, SiteSettings, UNKNOWN_COLLECTION,
};
pub use id::*;
pub use patch::{BrandPatch, CollectionPatch, NewCollection, NewProduct, ProductPatch};
pub use price::{Price, PriceError};
pub use query::{ALL_COLLECTIONS, ProductFilter, SortKey};
pub use status::{ChangeKind, StoreStatus, Table};
