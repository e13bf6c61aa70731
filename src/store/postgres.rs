//! PostgreSQL adapters for the `PreferencesStore` trait.
//!
//! Documents are stored as JSONB. Two shapes:
//!
//! - [`PgTableStore`]: a dedicated `user_preferences`-style table owned and
//!   bootstrapped by this crate.
//! - [`PgEmbeddedStore`]: preferences under a sub-key of a host-owned
//!   settings column. The host owns that table's schema; no migration is
//!   attempted, and saves never disturb sibling keys.
//!
//! Table and column names come from configuration and are interpolated into
//! SQL after identifier validation (identifiers cannot be bound as
//! statement parameters).

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde_json::{Map, Value};
use tokio_postgres::NoTls;

use crate::config::{EmbeddedLayout, StorageConfig, TableLayout};
use crate::error::StorageError;
use crate::store::{PreferencesStore, RawDocument, validate_identifier};

/// Build a connection pool from configuration.
pub fn pool_from_config(config: &StorageConfig) -> Result<Pool, StorageError> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        StorageError::Pool("PREFHUB_DATABASE_URL required for the postgres backend".to_string())
    })?;
    let pg_config: tokio_postgres::Config = url
        .parse()
        .map_err(|e: tokio_postgres::Error| StorageError::Pool(e.to_string()))?;
    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(16)
        .build()
        .map_err(|e| StorageError::Pool(e.to_string()))
}

fn expect_document(value: Value) -> Result<RawDocument, StorageError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Serialization(format!(
            "stored preferences are not a JSON object: {other}"
        ))),
    }
}

/// Pattern B: dedicated table, one JSONB column per user.
pub struct PgTableStore {
    pool: Pool,
    table: String,
    column: String,
}

impl PgTableStore {
    pub fn new(pool: Pool, layout: &TableLayout) -> Result<Self, StorageError> {
        validate_identifier(&layout.table, "table")?;
        validate_identifier(&layout.column, "column")?;
        Ok(Self {
            pool,
            table: layout.table.clone(),
            column: layout.column.clone(),
        })
    }

    /// Bootstrap the table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        client
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} ( \
                         user_id TEXT PRIMARY KEY, \
                         {} JSONB NOT NULL, \
                         updated_at TIMESTAMPTZ NOT NULL DEFAULT now() \
                     )",
                    self.table, self.column
                ),
                &[],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PreferencesStore for PgTableStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM {} WHERE user_id = $1", self.column, self.table),
                &[&user_id],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: Value = row
                    .try_get(0)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(expect_document(value)?))
            }
            None => Ok(None),
        }
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let document = Value::Object(raw.clone());
        client
            .execute(
                &format!(
                    "INSERT INTO {table} (user_id, {col}, updated_at) \
                     VALUES ($1, $2, now()) \
                     ON CONFLICT (user_id) DO UPDATE SET \
                         {col} = EXCLUDED.{col}, updated_at = now()",
                    table = self.table,
                    col = self.column,
                ),
                &[&user_id, &document],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        tracing::debug!(user_id, table = %self.table, "saved preferences row");
        Ok(())
    }
}

/// Pattern A: preferences embedded in a host-owned settings JSONB column.
pub struct PgEmbeddedStore {
    pool: Pool,
    layout: EmbeddedLayout,
}

impl PgEmbeddedStore {
    pub fn new(pool: Pool, layout: &EmbeddedLayout) -> Result<Self, StorageError> {
        validate_identifier(&layout.table, "table")?;
        validate_identifier(&layout.id_column, "column")?;
        validate_identifier(&layout.settings_column, "column")?;
        Ok(Self {
            pool,
            layout: layout.clone(),
        })
    }
}

#[async_trait]
impl PreferencesStore for PgEmbeddedStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {settings} -> $2 FROM {table} WHERE {id} = $1",
                    settings = self.layout.settings_column,
                    table = self.layout.table,
                    id = self.layout.id_column,
                ),
                &[&user_id, &self.layout.prefs_key],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: Option<Value> = row
                    .try_get(0)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                match value {
                    Some(Value::Object(map)) => Ok(Some(map)),
                    // Parent row exists but holds no preferences (or a
                    // non-object), treat as empty.
                    _ => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let row = tx
            .query_opt(
                &format!(
                    "SELECT {settings} FROM {table} WHERE {id} = $1 FOR UPDATE",
                    settings = self.layout.settings_column,
                    table = self.layout.table,
                    id = self.layout.id_column,
                ),
                &[&user_id],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let current: Option<Value> = row
                    .try_get(0)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                let mut settings = match current {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                settings.insert(self.layout.prefs_key.clone(), Value::Object(raw.clone()));

                tx.execute(
                    &format!(
                        "UPDATE {table} SET {settings} = $2 WHERE {id} = $1",
                        table = self.layout.table,
                        settings = self.layout.settings_column,
                        id = self.layout.id_column,
                    ),
                    &[&user_id, &Value::Object(settings)],
                )
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
            }
            None => {
                // No settings row yet for this user; start a fresh document
                // holding only the preferences sub-key.
                let mut settings = Map::new();
                settings.insert(self.layout.prefs_key.clone(), Value::Object(raw.clone()));
                tx.execute(
                    &format!(
                        "INSERT INTO {table} ({id}, {settings}) VALUES ($1, $2)",
                        table = self.layout.table,
                        id = self.layout.id_column,
                        settings = self.layout.settings_column,
                    ),
                    &[&user_id, &Value::Object(settings)],
                )
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        tracing::debug!(user_id, table = %self.layout.table, "saved embedded preferences");
        Ok(())
    }
}
