//! Environment-driven storage configuration.
//!
//! All keys are prefixed `PREFHUB_`. The core never reads configuration on
//! its own; hosts either build a [`StorageConfig`] directly or call
//! [`StorageConfig::from_env`] and hand the result to
//! [`connect_from_config`](crate::store::connect_from_config).

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory, non-durable. The default; useful for tests and demos.
    Memory,
    /// PostgreSQL via `deadpool-postgres` (requires the `postgres` feature).
    Postgres,
    /// libSQL local file or remote replica (requires the `libsql` feature).
    LibSql,
}

impl StorageBackend {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "libsql" => Ok(Self::LibSql),
            other => Err(ConfigError::InvalidValue {
                key: "PREFHUB_STORAGE_BACKEND".to_string(),
                message: format!("unsupported backend '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
            Self::LibSql => "libsql",
        }
    }
}

/// Which storage shape holds the raw preference document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePattern {
    /// Dedicated per-user record whose single column is the document.
    Table,
    /// Document embedded under a sub-key of a host-owned settings document.
    Embedded,
}

impl StoragePattern {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "embedded" => Ok(Self::Embedded),
            other => Err(ConfigError::InvalidValue {
                key: "PREFHUB_STORAGE_PATTERN".to_string(),
                message: format!("unsupported pattern '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Embedded => "embedded",
        }
    }
}

/// Table-pattern layout: the crate owns this table and bootstraps it.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub table: String,
    pub column: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table: "user_preferences".to_string(),
            column: "preferences".to_string(),
        }
    }
}

/// Embedded-pattern layout: the host application owns this table; the
/// adapter only reads and rewrites the preferences sub-key of its settings
/// column.
#[derive(Debug, Clone)]
pub struct EmbeddedLayout {
    pub table: String,
    pub id_column: String,
    pub settings_column: String,
    /// Sub-key of the settings document that holds the raw preferences.
    pub prefs_key: String,
}

impl Default for EmbeddedLayout {
    fn default() -> Self {
        Self {
            table: "users".to_string(),
            id_column: "user_id".to_string(),
            settings_column: "settings".to_string(),
            prefs_key: "preferences".to_string(),
        }
    }
}

/// Storage adapter configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub pattern: StoragePattern,
    /// PostgreSQL connection string (`postgres` backend).
    pub database_url: Option<String>,
    /// Local database file (`libsql` backend).
    pub libsql_path: Option<PathBuf>,
    /// Remote replica URL (`libsql` backend). When set, an auth token is
    /// required.
    pub libsql_url: Option<String>,
    pub libsql_auth_token: Option<SecretString>,
    pub table: TableLayout,
    pub embedded: EmbeddedLayout,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            pattern: StoragePattern::Table,
            database_url: None,
            libsql_path: None,
            libsql_url: None,
            libsql_auth_token: None,
            table: TableLayout::default(),
            embedded: EmbeddedLayout::default(),
        }
    }
}

impl StorageConfig {
    /// Resolve configuration from `PREFHUB_*` environment variables.
    /// Anything unset keeps its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match optional_env("PREFHUB_STORAGE_BACKEND") {
            Some(raw) => StorageBackend::from_str(&raw)?,
            None => defaults.backend,
        };
        let pattern = match optional_env("PREFHUB_STORAGE_PATTERN") {
            Some(raw) => StoragePattern::from_str(&raw)?,
            None => defaults.pattern,
        };

        Ok(Self {
            backend,
            pattern,
            database_url: optional_env("PREFHUB_DATABASE_URL"),
            libsql_path: optional_env("PREFHUB_LIBSQL_PATH").map(PathBuf::from),
            libsql_url: optional_env("PREFHUB_LIBSQL_URL"),
            libsql_auth_token: optional_env("PREFHUB_LIBSQL_AUTH_TOKEN").map(SecretString::from),
            table: TableLayout {
                table: env_or("PREFHUB_TABLE", defaults.table.table),
                column: env_or("PREFHUB_TABLE_COLUMN", defaults.table.column),
            },
            embedded: EmbeddedLayout {
                table: env_or("PREFHUB_EMBEDDED_TABLE", defaults.embedded.table),
                id_column: env_or("PREFHUB_EMBEDDED_ID_COLUMN", defaults.embedded.id_column),
                settings_column: env_or(
                    "PREFHUB_EMBEDDED_SETTINGS_COLUMN",
                    defaults.embedded.settings_column,
                ),
                prefs_key: env_or("PREFHUB_EMBEDDED_PREFS_KEY", defaults.embedded.prefs_key),
            },
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: String) -> String {
    optional_env(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parsing() {
        assert_eq!(
            StorageBackend::from_str("Postgres").unwrap(),
            StorageBackend::Postgres
        );
        assert_eq!(
            StorageBackend::from_str("postgresql").unwrap(),
            StorageBackend::Postgres
        );
        assert_eq!(
            StorageBackend::from_str("libsql").unwrap(),
            StorageBackend::LibSql
        );
        let err = StorageBackend::from_str("redis").expect_err("must reject");
        let ConfigError::InvalidValue { key, message } = err else {
            panic!("expected InvalidValue");
        };
        assert_eq!(key, "PREFHUB_STORAGE_BACKEND");
        assert!(message.contains("redis"), "unexpected message: {message}");
    }

    #[test]
    fn pattern_parsing() {
        assert_eq!(
            StoragePattern::from_str("TABLE").unwrap(),
            StoragePattern::Table
        );
        assert_eq!(
            StoragePattern::from_str("embedded").unwrap(),
            StoragePattern::Embedded
        );
        assert!(StoragePattern::from_str("jsonb").is_err());
    }

    #[test]
    fn defaults_are_memory_table() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.pattern, StoragePattern::Table);
        assert_eq!(config.table.table, "user_preferences");
        assert_eq!(config.embedded.prefs_key, "preferences");
        assert!(config.database_url.is_none());
    }
}
