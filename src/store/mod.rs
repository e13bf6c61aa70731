//! Storage adapter layer.
//!
//! The service depends on exactly two operations, expressed by
//! [`PreferencesStore`]. Two reference shapes implement it per backend:
//!
//! - *Embedded* pattern: the raw preference mapping lives under a sub-key of
//!   a larger per-user settings document. Saving re-embeds the sub-key
//!   without disturbing sibling keys.
//! - *Table* pattern: the raw preference mapping is the entire value of a
//!   single-column record keyed by `user_id`.
//!
//! Both patterns are observably interchangeable from the service's
//! perspective. Database-backed implementations exist behind feature flags:
//!
//! - `postgres`: `deadpool-postgres` + `tokio-postgres`, JSONB columns
//! - `libsql`: libSQL (Turso's SQLite fork), TEXT columns holding JSON
//!
//! The in-memory adapters are always compiled and back the test suites.
//!
//! Consistency note: `save_raw` is last-write-wins. An adapter may add
//! compare-and-swap on the raw document as its own documented extension;
//! the core neither requires nor assumes it.

#[cfg(feature = "libsql")]
pub mod libsql;

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{StorageBackend, StorageConfig, StoragePattern};
use crate::error::StorageError;

pub use memory::{MemoryEmbeddedStore, MemoryTableStore};

/// Raw preference document as stored: an untyped nested JSON mapping.
pub type RawDocument = Map<String, Value>;

/// The two-operation contract the preferences service depends on.
///
/// Implementations must not interpret `user_id` beyond using it as an
/// opaque key, and must treat an absent document as `Ok(None)` rather than
/// an error.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Load the raw preference document for a user. `Ok(None)` means
    /// nothing is stored yet; callers treat that as an empty document.
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError>;

    /// Persist the raw preference document for a user, replacing whatever
    /// was stored before (insert if absent).
    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError>;
}

/// Create a storage adapter from configuration.
///
/// Shared helper for call sites that need an `Arc<dyn PreferencesStore>`
/// without retaining backend-specific handles. Dispatches on backend and
/// pattern; backends compiled out return a `Pool` error naming the missing
/// feature.
pub async fn connect_from_config(
    config: &StorageConfig,
) -> Result<Arc<dyn PreferencesStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => Ok(match config.pattern {
            StoragePattern::Table => Arc::new(MemoryTableStore::new()),
            StoragePattern::Embedded => {
                Arc::new(MemoryEmbeddedStore::new(config.embedded.prefs_key.clone()))
            }
        }),
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres => {
            let pool = postgres::pool_from_config(config)?;
            Ok(match config.pattern {
                StoragePattern::Table => {
                    let store = postgres::PgTableStore::new(pool, &config.table)?;
                    store.ensure_schema().await?;
                    Arc::new(store)
                }
                StoragePattern::Embedded => {
                    Arc::new(postgres::PgEmbeddedStore::new(pool, &config.embedded)?)
                }
            })
        }
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres => Err(StorageError::Pool(
            "postgres backend requested but the 'postgres' feature is not enabled".to_string(),
        )),
        #[cfg(feature = "libsql")]
        StorageBackend::LibSql => {
            let conn = libsql::connect_from_config(config).await?;
            Ok(match config.pattern {
                StoragePattern::Table => {
                    let store = libsql::LibSqlTableStore::new(conn, &config.table)?;
                    store.ensure_schema().await?;
                    Arc::new(store)
                }
                StoragePattern::Embedded => {
                    Arc::new(libsql::LibSqlEmbeddedStore::new(conn, &config.embedded)?)
                }
            })
        }
        #[cfg(not(feature = "libsql"))]
        StorageBackend::LibSql => Err(StorageError::Pool(
            "libsql backend requested but the 'libsql' feature is not enabled".to_string(),
        )),
    }
}

/// Reject table/column/key names that cannot be safely interpolated into
/// SQL. Identifiers come from configuration, not user input, but they still
/// cannot be bound as statement parameters.
pub(crate) fn validate_identifier(name: &str, what: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(StorageError::Pool(format!(
            "invalid {what} identifier '{name}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(validate_identifier("user_preferences", "table").is_ok());
        assert!(validate_identifier("settings2", "column").is_ok());
        assert!(validate_identifier("", "table").is_err());
        assert!(validate_identifier("users; DROP TABLE", "table").is_err());
        assert!(validate_identifier("2fast", "table").is_err());
        assert!(validate_identifier("na-me", "column").is_err());
    }

    #[tokio::test]
    async fn factory_builds_memory_adapters() {
        let mut config = StorageConfig::default();
        config.backend = StorageBackend::Memory;

        config.pattern = StoragePattern::Table;
        let store = connect_from_config(&config).await.expect("table store");
        assert!(store.load_raw("u1").await.expect("load").is_none());

        config.pattern = StoragePattern::Embedded;
        let store = connect_from_config(&config).await.expect("embedded store");
        assert!(store.load_raw("u1").await.expect("load").is_none());
    }
}
