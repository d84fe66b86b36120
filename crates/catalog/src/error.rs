//! Catalog error type.

use std::time::Duration;

use thiserror::Error;

use coconut_catalog_core::Table;

use crate::remote::StoreError;

/// Errors from catalog loads and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The remote store failed or rejected the request.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A product references a collection name absent from the snapshot.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A remote row could not be decoded.
    #[error("Invalid {table} row: {message}")]
    Decode { table: Table, message: String },

    /// A reload did not finish in time.
    #[error("Reload timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            CatalogError::CollectionNotFound("Cups".to_string()).to_string(),
            "Collection not found: Cups"
        );
        assert_eq!(
            CatalogError::Timeout(Duration::from_secs(15)).to_string(),
            "Reload timed out after 15s"
        );
        let err = CatalogError::from(StoreError::Unavailable("offline".to_string()));
        assert_eq!(err.to_string(), "Store error: Remote store unavailable: offline");
    }
}
