//! Status enums for the catalog mirror and the remote tables it watches.

use serde::{Deserialize, Serialize};

/// Lifecycle status of the in-memory catalog mirror.
///
/// `Uninitialized -> Loading -> Ready`, `Ready -> Loading` on every reload and
/// `Loading -> Error` on failure. `Error` keeps the last good snapshot and is
/// left by the next successful reload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum StoreStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    /// The last reload failed with this message.
    Error(String),
}

impl StoreStatus {
    /// Whether a reload is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the last reload finished, successfully or not.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Error(_))
    }

    /// The error message, if the last reload failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// The remote tables mirrored by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Collections,
    Products,
    SiteSettings,
}

impl Table {
    /// Every mirrored table, in load order.
    pub const ALL: [Self; 3] = [Self::Collections, Self::Products, Self::SiteSettings];

    /// Remote table name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Products => "products",
            Self::SiteSettings => "site_settings",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collections" => Ok(Self::Collections),
            "products" => Ok(Self::Products),
            "site_settings" => Ok(Self::SiteSettings),
            _ => Err(format!("unknown table: {s}")),
        }
    }
}

/// Kind of row change reported by the remote store or performed by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Upsert,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Upsert => write!(f, "upsert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trips_through_str() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>(), Ok(table));
        }
        assert!("orders".parse::<Table>().is_err());
    }

    #[test]
    fn test_status_helpers() {
        assert!(StoreStatus::Loading.is_loading());
        assert!(!StoreStatus::Uninitialized.is_settled());
        assert!(StoreStatus::Ready.is_settled());
        let failed = StoreStatus::Error("boom".to_string());
        assert!(failed.is_settled());
        assert_eq!(failed.error(), Some("boom"));
        assert_eq!(failed.to_string(), "error: boom");
    }
}
