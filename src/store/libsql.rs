//! libSQL adapters for the `PreferencesStore` trait.
//!
//! Same two shapes as the PostgreSQL module, over TEXT columns holding
//! serialized JSON. Works against a local database file (or `:memory:`)
//! and against a remote Turso replica when a URL and auth token are
//! configured.

use async_trait::async_trait;
use chrono::Utc;
use libsql::params;
use secrecy::ExposeSecret as _;
use serde_json::{Map, Value};

use crate::config::{EmbeddedLayout, StorageConfig, TableLayout};
use crate::error::StorageError;
use crate::store::{PreferencesStore, RawDocument, validate_identifier};

/// An open libSQL database plus its working connection.
pub struct LibSqlHandle {
    // Kept alive for the lifetime of the connection.
    _db: libsql::Database,
    conn: libsql::Connection,
}

impl LibSqlHandle {
    /// Open a local database file.
    pub async fn open_local(path: &std::path::Path) -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let conn = db.connect().map_err(|e| StorageError::Pool(e.to_string()))?;
        Ok(Self { _db: db, conn })
    }

    /// Open a remote replica synced from a Turso URL.
    pub async fn open_remote_replica(
        path: &std::path::Path,
        url: &str,
        auth_token: &str,
    ) -> Result<Self, StorageError> {
        let db = libsql::Builder::new_remote_replica(path, url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let conn = db.connect().map_err(|e| StorageError::Pool(e.to_string()))?;
        Ok(Self { _db: db, conn })
    }

    /// Raw connection access, for hosts that manage their own schema
    /// around the embedded pattern.
    pub fn connection(&self) -> &libsql::Connection {
        &self.conn
    }
}

/// Open a libSQL handle from configuration.
pub async fn connect_from_config(config: &StorageConfig) -> Result<LibSqlHandle, StorageError> {
    let default_path = std::path::PathBuf::from("prefhub.db");
    let path = config.libsql_path.as_deref().unwrap_or(&default_path);

    if let Some(ref url) = config.libsql_url {
        let token = config.libsql_auth_token.as_ref().ok_or_else(|| {
            StorageError::Pool(
                "PREFHUB_LIBSQL_AUTH_TOKEN required when PREFHUB_LIBSQL_URL is set".to_string(),
            )
        })?;
        LibSqlHandle::open_remote_replica(path, url, token.expose_secret()).await
    } else {
        LibSqlHandle::open_local(path).await
    }
}

fn query_err(e: libsql::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

fn parse_document(raw: &str) -> Result<RawDocument, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Serialization(format!(
            "stored preferences are not a JSON object: {other}"
        ))),
    }
}

fn encode_document(raw: &RawDocument) -> Result<String, StorageError> {
    serde_json::to_string(&Value::Object(raw.clone())).map_err(Into::into)
}

fn fmt_ts(ts: chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Pattern B: dedicated table, one JSON TEXT column per user.
pub struct LibSqlTableStore {
    handle: LibSqlHandle,
    table: String,
    column: String,
}

impl LibSqlTableStore {
    pub fn new(handle: LibSqlHandle, layout: &TableLayout) -> Result<Self, StorageError> {
        validate_identifier(&layout.table, "table")?;
        validate_identifier(&layout.column, "column")?;
        Ok(Self {
            handle,
            table: layout.table.clone(),
            column: layout.column.clone(),
        })
    }

    /// Bootstrap the table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.handle
            .conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} ( \
                         user_id TEXT PRIMARY KEY, \
                         {} TEXT NOT NULL, \
                         updated_at TEXT NOT NULL \
                     )",
                    self.table, self.column
                ),
                (),
            )
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

#[async_trait]
impl PreferencesStore for LibSqlTableStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let mut rows = self
            .handle
            .conn
            .query(
                &format!("SELECT {} FROM {} WHERE user_id = ?1", self.column, self.table),
                params![user_id],
            )
            .await
            .map_err(query_err)?;

        match rows.next().await.map_err(query_err)? {
            Some(row) => {
                let raw: String = row.get(0).map_err(query_err)?;
                Ok(Some(parse_document(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        let encoded = encode_document(raw)?;
        self.handle
            .conn
            .execute(
                &format!(
                    "INSERT INTO {table} (user_id, {col}, updated_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(user_id) DO UPDATE SET \
                         {col} = excluded.{col}, updated_at = excluded.updated_at",
                    table = self.table,
                    col = self.column,
                ),
                params![user_id, encoded, fmt_ts(Utc::now())],
            )
            .await
            .map_err(query_err)?;
        tracing::debug!(user_id, table = %self.table, "saved preferences row");
        Ok(())
    }
}

/// Pattern A: preferences embedded in a host-owned settings column.
pub struct LibSqlEmbeddedStore {
    handle: LibSqlHandle,
    layout: EmbeddedLayout,
}

impl LibSqlEmbeddedStore {
    pub fn new(handle: LibSqlHandle, layout: &EmbeddedLayout) -> Result<Self, StorageError> {
        validate_identifier(&layout.table, "table")?;
        validate_identifier(&layout.id_column, "column")?;
        validate_identifier(&layout.settings_column, "column")?;
        Ok(Self {
            handle,
            layout: layout.clone(),
        })
    }

    async fn load_settings(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let mut rows = self
            .handle
            .conn
            .query(
                &format!(
                    "SELECT {settings} FROM {table} WHERE {id} = ?1",
                    settings = self.layout.settings_column,
                    table = self.layout.table,
                    id = self.layout.id_column,
                ),
                params![user_id],
            )
            .await
            .map_err(query_err)?;

        match rows.next().await.map_err(query_err)? {
            Some(row) => {
                let raw: Option<String> = row.get(0).map_err(query_err)?;
                match raw {
                    Some(text) if !text.trim().is_empty() => Ok(Some(parse_document(&text)?)),
                    _ => Ok(Some(Map::new())),
                }
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PreferencesStore for LibSqlEmbeddedStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let Some(settings) = self.load_settings(user_id).await? else {
            return Ok(None);
        };
        match settings.get(&self.layout.prefs_key) {
            Some(Value::Object(prefs)) => Ok(Some(prefs.clone())),
            _ => Ok(None),
        }
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        let existing = self.load_settings(user_id).await?;
        let exists = existing.is_some();
        let mut settings = existing.unwrap_or_default();
        settings.insert(self.layout.prefs_key.clone(), Value::Object(raw.clone()));
        let encoded = encode_document(&settings)?;

        if exists {
            self.handle
                .conn
                .execute(
                    &format!(
                        "UPDATE {table} SET {settings} = ?2 WHERE {id} = ?1",
                        table = self.layout.table,
                        settings = self.layout.settings_column,
                        id = self.layout.id_column,
                    ),
                    params![user_id, encoded],
                )
                .await
                .map_err(query_err)?;
        } else {
            self.handle
                .conn
                .execute(
                    &format!(
                        "INSERT INTO {table} ({id}, {settings}) VALUES (?1, ?2)",
                        table = self.layout.table,
                        id = self.layout.id_column,
                        settings = self.layout.settings_column,
                    ),
                    params![user_id, encoded],
                )
                .await
                .map_err(query_err)?;
        }

        tracing::debug!(user_id, table = %self.layout.table, "saved embedded preferences");
        Ok(())
    }
}
